use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use streak_core::{Key, KeyEvent};

use crate::input::{Cue, InputSource, PressQueue};

/// Response model of a simulated participant.
#[derive(Copy, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticipantModel {
    /// Ex-Gaussian reaction time: normal part.
    pub mu_ms: f64,
    pub sigma_ms: f64,
    /// Ex-Gaussian reaction time: mean of the exponential tail.
    pub tau_ms: f64,
    /// Chance of pressing during an inter-trial delay.
    pub anticipation: f64,
    /// Anticipatory presses land uniformly in `0..anticipation_window_ms`
    /// after the delay starts.
    pub anticipation_window_ms: u64,
    /// Chance of not responding to a stimulus at all.
    pub lapse: f64,
}

impl Default for ParticipantModel {
    fn default() -> Self {
        Self {
            mu_ms: 500.0,
            sigma_ms: 50.0,
            tau_ms: 150.0,
            anticipation: 0.0,
            anticipation_window_ms: 200,
            lapse: 0.0,
        }
    }
}

impl ParticipantModel {
    /// Draws a strictly positive ex-Gaussian reaction time.
    pub fn sample_rt<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        loop {
            let u1 = 1.0 - rng.random::<f64>();
            let u2 = rng.random::<f64>();
            let normal = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
            let exponential = if self.tau_ms > 0.0 {
                -self.tau_ms * (1.0 - rng.random::<f64>()).ln()
            } else {
                0.0
            };
            let rt = self.mu_ms + self.sigma_ms * normal + exponential;
            if rt >= 1.0 {
                return rt.round() as u64;
            }
        }
    }
}

/// Input source that answers cues the way `ParticipantModel` says.
#[derive(Debug)]
pub struct SimulatedParticipant {
    model: ParticipantModel,
    rng: StdRng,
    queue: PressQueue,
    key: Key,
}

impl SimulatedParticipant {
    pub fn new(model: ParticipantModel, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            model,
            rng,
            queue: PressQueue::default(),
            key: Key::SPACE,
        }
    }
}

impl InputSource for SimulatedParticipant {
    fn next_event(&mut self, horizon_ms: u64) -> Option<KeyEvent> {
        self.queue.pop_until(horizon_ms)
    }

    fn notify(&mut self, cue: Cue, at_ms: u64) {
        match cue {
            Cue::Delay => {
                if self.rng.random_bool(self.model.anticipation.clamp(0.0, 1.0)) {
                    let offset = self
                        .rng
                        .random_range(0..self.model.anticipation_window_ms.max(1));
                    self.queue.push(at_ms + offset, self.key);
                }
            }
            Cue::Stimulus => {
                if !self.rng.random_bool(self.model.lapse.clamp(0.0, 1.0)) {
                    let rt = self.model.sample_rt(&mut self.rng);
                    self.queue.push(at_ms + rt, self.key);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reaction_times_are_positive_and_centred() {
        let model = ParticipantModel::default();
        let mut rng = StdRng::seed_from_u64(21);
        let samples: Vec<u64> = (0..2_000).map(|_| model.sample_rt(&mut rng)).collect();
        assert!(samples.iter().all(|&rt| rt >= 1));
        let mean = samples.iter().sum::<u64>() as f64 / samples.len() as f64;
        // mu + tau
        assert!((600.0..700.0).contains(&mean), "mean = {mean}");
    }

    #[test]
    fn always_anticipating_presses_during_delay() {
        let model = ParticipantModel {
            anticipation: 1.0,
            ..ParticipantModel::default()
        };
        let mut p = SimulatedParticipant::new(model, Some(4));
        p.notify(Cue::Delay, 1_000);
        let press = p.next_event(u64::MAX).unwrap();
        assert!((1_000..1_200).contains(&press.at_ms));
    }

    #[test]
    fn lapsing_participant_stays_silent() {
        let model = ParticipantModel {
            lapse: 1.0,
            ..ParticipantModel::default()
        };
        let mut p = SimulatedParticipant::new(model, Some(4));
        p.notify(Cue::Stimulus, 0);
        assert_eq!(p.next_event(u64::MAX), None);
    }
}
