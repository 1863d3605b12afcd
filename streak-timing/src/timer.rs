use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Time source driving the event loop. All engine timestamps are
/// milliseconds since the clock's origin.
pub trait Clock {
    fn now_ms(&self) -> u64;

    /// Moves the clock forward to `t_ms`, sleeping if the clock is real.
    /// Returns how late the clock arrived relative to `t_ms`.
    fn advance_to(&mut self, t_ms: u64) -> Duration;
}

/// Deterministic clock for tests and simulated sessions. Time only moves
/// when the event loop advances it.
#[derive(Debug, Clone, Default)]
pub struct VirtualClock {
    now_ms: u64,
}

impl VirtualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(now_ms: u64) -> Self {
        Self { now_ms }
    }
}

impl Clock for VirtualClock {
    fn now_ms(&self) -> u64 {
        self.now_ms
    }

    fn advance_to(&mut self, t_ms: u64) -> Duration {
        self.now_ms = self.now_ms.max(t_ms);
        Duration::ZERO
    }
}

/// Wall clock backed by the monotonic `Instant`, with a precise sleep.
#[derive(Debug, Clone)]
pub struct HighPrecisionTimer {
    pub start: Instant,
}

impl Clock for HighPrecisionTimer {
    fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    fn advance_to(&mut self, t_ms: u64) -> Duration {
        let target = self.start + Duration::from_millis(t_ms);
        let now = Instant::now();
        if target > now {
            self.high_precision_sleep(target - now);
        }
        Instant::now().saturating_duration_since(target)
    }
}

impl HighPrecisionTimer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn high_precision_sleep(&self, duration: Duration) {
        #[cfg(target_os = "linux")]
        self.linux_sleep(duration);
        #[cfg(not(target_os = "linux"))]
        std::thread::sleep(duration);
    }

    #[cfg(target_os = "linux")]
    fn linux_sleep(&self, duration: Duration) {
        use libc::{CLOCK_MONOTONIC, clock_nanosleep, timespec};

        let req = timespec {
            tv_sec: duration.as_secs() as libc::time_t,
            tv_nsec: duration.subsec_nanos() as libc::c_long,
        };

        // SAFETY: `req` is a valid timespec and the remainder pointer may be null.
        let rc = unsafe { clock_nanosleep(CLOCK_MONOTONIC, 0, &req, std::ptr::null_mut()) };
        if rc != 0 {
            tracing::debug!(rc, "clock_nanosleep interrupted, falling back to thread::sleep");
            std::thread::sleep(duration);
        }
    }
}

impl Default for HighPrecisionTimer {
    fn default() -> Self {
        Self::new()
    }
}

/// Summary of how late timer dispatches arrived.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LagSummary {
    pub samples: usize,
    pub mean_ms: f64,
    pub jitter_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
}

/// Rolling window of dispatch lateness samples.
#[derive(Debug, Clone)]
pub struct LagStats {
    samples: VecDeque<Duration>,
    max_samples: usize,
}

impl LagStats {
    pub fn new(max_samples: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(max_samples),
            max_samples: max_samples.max(1),
        }
    }

    pub fn record(&mut self, lag: Duration) {
        if self.samples.len() >= self.max_samples {
            self.samples.pop_front();
        }
        self.samples.push_back(lag);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn summary(&self) -> LagSummary {
        if self.samples.is_empty() {
            return LagSummary::default();
        }
        let times: Vec<f64> = self
            .samples
            .iter()
            .map(|d| d.as_secs_f64() * 1_000.0)
            .collect();
        let n = times.len() as f64;
        let mean = times.iter().sum::<f64>() / n;
        let var = times.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
        LagSummary {
            samples: times.len(),
            mean_ms: mean,
            jitter_ms: var.sqrt(),
            min_ms: times.iter().copied().fold(f64::INFINITY, f64::min),
            max_ms: times.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        }
    }
}

impl Default for LagStats {
    fn default() -> Self {
        Self::new(1000)
    }
}
