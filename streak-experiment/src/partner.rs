use rand::Rng;
use streak_core::{ColorToken, ElementId, PartnerEvent, PartnerLatency, TrialConfig};
use streak_timing::{Scheduler, TimerHandle};

use crate::driver::TimerEvent;
use crate::render::{self, Renderer};

/// Simulated partner. Its reaction time is drawn once per trial; the reveal
/// timer and the classifier both read that one recorded value.
#[derive(Debug, Clone, Copy, Default)]
pub struct PartnerSimulator;

impl PartnerSimulator {
    pub fn sample<R: Rng + ?Sized>(config: &TrialConfig, rng: &mut R) -> PartnerEvent {
        let reaction_time_ms = match config.partner_latency() {
            PartnerLatency::Uniform { min_ms, max_ms } => rng.random_range(min_ms..=max_ms),
            PartnerLatency::Fixed { ms } => ms,
        };
        PartnerEvent { reaction_time_ms }
    }

    /// Schedules the reveal `reaction_time_ms` after `onset_ms`.
    pub fn schedule_reveal(
        scheduler: &mut Scheduler<TimerEvent>,
        onset_ms: u64,
        event: &PartnerEvent,
    ) -> TimerHandle {
        scheduler.schedule(onset_ms, event.reaction_time_ms, TimerEvent::PartnerReveal)
    }

    /// Cosmetic only: recolours the partner's shape.
    pub fn reveal(renderer: &mut dyn Renderer) {
        render::paint(renderer, ElementId::Partner, ColorToken::PartnerHit);
    }
}
