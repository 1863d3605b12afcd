use std::collections::VecDeque;

use streak_core::KeyEvent;
use streak_timing::{Clock, Fired, LagStats, Scheduler, TimerHandle};

use crate::input::{Cue, InputSource};

/// Timer payloads used by trials and block phases.
#[derive(Copy, Debug, Clone, PartialEq, Eq)]
pub enum TimerEvent {
    /// A fixed-duration block phase (delay, warning, feedback) is over.
    PhaseEnd,
    StimulusHide,
    ResponseDeadline,
    PartnerReveal,
    TrialFallback,
}

/// What woke the event loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Wake {
    Timer(Fired<TimerEvent>),
    Key(KeyEvent),
}

/// Single-threaded event loop: one clock, one scheduler, one input source.
///
/// `next_wake` suspends until the earlier of the next due timer and the next
/// key event. A key event at exactly a timer's due time is delivered first.
pub struct Driver<C: Clock, I: InputSource> {
    clock: C,
    scheduler: Scheduler<TimerEvent>,
    input: I,
    fired: VecDeque<Fired<TimerEvent>>,
    lag: LagStats,
}

impl<C: Clock, I: InputSource> Driver<C, I> {
    pub fn new(clock: C, input: I) -> Self {
        Self {
            clock,
            scheduler: Scheduler::new(),
            input,
            fired: VecDeque::new(),
            lag: LagStats::default(),
        }
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    pub fn schedule(&mut self, delay_ms: u64, event: TimerEvent) -> TimerHandle {
        let now_ms = self.clock.now_ms();
        self.scheduler.schedule(now_ms, delay_ms, event)
    }

    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        self.scheduler.cancel(handle)
    }

    pub fn cancel_all(&mut self) -> usize {
        self.fired.clear();
        self.scheduler.cancel_all()
    }

    pub fn scheduler_mut(&mut self) -> &mut Scheduler<TimerEvent> {
        &mut self.scheduler
    }

    pub fn pending_timers(&self) -> usize {
        self.scheduler.pending()
    }

    pub fn notify(&mut self, cue: Cue) {
        let now_ms = self.clock.now_ms();
        self.input.notify(cue, now_ms);
    }

    pub fn lag(&self) -> &LagStats {
        &self.lag
    }

    /// Blocks until something happens. `None` means nothing ever will: no
    /// timer is pending and the input source is exhausted.
    pub fn next_wake(&mut self) -> Option<Wake> {
        loop {
            while let Some(fired) = self.fired.pop_front() {
                if self.scheduler.claim(&fired) {
                    tracing::trace!(event = ?fired.event, due_ms = fired.due_ms, "timer dispatched");
                    return Some(Wake::Timer(fired));
                }
            }

            let horizon = self.scheduler.next_due();
            if let Some(key) = self.input.next_event(horizon.unwrap_or(u64::MAX)) {
                let at_ms = key.at_ms.max(self.clock.now_ms());
                self.clock.advance_to(at_ms);
                return Some(Wake::Key(KeyEvent::new(key.key, at_ms)));
            }

            let due_ms = horizon?;
            let late = self.clock.advance_to(due_ms);
            self.lag.record(late);
            let now_ms = self.clock.now_ms().max(due_ms);
            self.fired.extend(self.scheduler.take_due(now_ms));
        }
    }
}
