use rand::Rng;
use streak_core::{
    ColorToken, ConfigError, ElementId, EndReason, KeyEvent, PartnerEvent, ResponseEvent,
    TrialConfig, TrialOutcome, TrialSpec, TrialState, TrialTimestamps, classify,
};
use streak_timing::{Clock, Fired};

use crate::capture::InputCapture;
use crate::driver::{Driver, TimerEvent, Wake};
use crate::error::EngineError;
use crate::input::{Cue, InputSource};
use crate::partner::PartnerSimulator;
use crate::render::{self, Renderer};

/// Everything a finished trial produced, before scoring.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialRun {
    pub config: TrialConfig,
    pub response: ResponseEvent,
    pub partner: PartnerEvent,
    pub outcome: TrialOutcome,
    pub end_reason: EndReason,
    pub timestamps: TrialTimestamps,
}

/// Runs a single trial: `Armed → Running → Responded|TimedOut → Finalizing → Done`.
///
/// Every exit path goes through `finalize`, which cancels all pending timers
/// and stops the input capture before the result is assembled.
#[derive(Debug)]
pub struct TrialController {
    config: TrialConfig,
    state: TrialState,
    capture: InputCapture,
    partner: Option<PartnerEvent>,
    end_reason: Option<EndReason>,
    timestamps: TrialTimestamps,
}

impl TrialController {
    pub fn new(config: TrialConfig) -> Self {
        Self {
            config,
            state: TrialState::Armed,
            capture: InputCapture::new(),
            partner: None,
            end_reason: None,
            timestamps: TrialTimestamps::default(),
        }
    }

    pub fn from_spec(spec: &TrialSpec) -> Result<Self, ConfigError> {
        Ok(Self::new(spec.build()?))
    }

    pub fn state(&self) -> TrialState {
        self.state
    }

    pub fn capture(&self) -> &InputCapture {
        &self.capture
    }

    pub fn config(&self) -> &TrialConfig {
        &self.config
    }

    /// Drives the trial to completion on `driver`.
    pub fn run<C, I, R>(
        mut self,
        driver: &mut Driver<C, I>,
        renderer: &mut dyn Renderer,
        rng: &mut R,
    ) -> Result<TrialRun, EngineError>
    where
        C: Clock,
        I: InputSource,
        R: Rng + ?Sized,
    {
        self.start(driver, renderer, rng);
        self.drive(driver, renderer)?;
        Ok(self.into_run())
    }

    /// Feeds wake-ups to a started trial until it is `Done`. If the driver
    /// runs dry first, the trial is aborted and `Stalled` returned.
    pub fn drive<C, I>(
        &mut self,
        driver: &mut Driver<C, I>,
        renderer: &mut dyn Renderer,
    ) -> Result<(), EngineError>
    where
        C: Clock,
        I: InputSource,
    {
        while !self.state.is_done() {
            let Some(wake) = driver.next_wake() else {
                self.abort(driver);
                return Err(EngineError::Stalled);
            };
            self.handle(wake, driver, renderer);
        }
        Ok(())
    }

    /// `Armed → Running`: samples the partner, shows the stimulus, arms the
    /// timers and starts listening.
    pub fn start<C, I, R>(
        &mut self,
        driver: &mut Driver<C, I>,
        renderer: &mut dyn Renderer,
        rng: &mut R,
    ) where
        C: Clock,
        I: InputSource,
        R: Rng + ?Sized,
    {
        if self.state != TrialState::Armed {
            return;
        }
        let onset_ms = driver.now_ms();
        let partner = PartnerSimulator::sample(&self.config, rng);
        self.partner = Some(partner);
        self.timestamps.started_ms = onset_ms;

        render::show(
            renderer,
            ElementId::Stimulus,
            &render::stimulus_html(self.config.shape(), self.config.mode()),
        );

        let deadline_ms = self.config.response_deadline_ms();
        driver.schedule(deadline_ms, TimerEvent::ResponseDeadline);
        driver.schedule(self.config.trial_fallback_ms(), TimerEvent::TrialFallback);
        if let Some(ms) = self.config.stimulus_duration_ms() {
            driver.schedule(ms, TimerEvent::StimulusHide);
        }
        if self.config.is_group() {
            PartnerSimulator::schedule_reveal(driver.scheduler_mut(), onset_ms, &partner);
        }

        self.capture.start(self.config.keys().clone(), onset_ms, deadline_ms);
        self.state = TrialState::Running;
        driver.notify(Cue::Stimulus);

        tracing::debug!(
            kind = ?self.config.kind(),
            deadline_ms,
            partner_rt_ms = partner.reaction_time_ms,
            onset_ms,
            "trial running"
        );
    }

    /// Reacts to one wake-up. Events arriving after the trial settled are
    /// ignored, except the fallback timer while holding.
    pub fn handle<C, I>(
        &mut self,
        wake: Wake,
        driver: &mut Driver<C, I>,
        renderer: &mut dyn Renderer,
    ) where
        C: Clock,
        I: InputSource,
    {
        match wake {
            Wake::Key(event) => self.on_key(&event, driver, renderer),
            Wake::Timer(fired) => self.on_timer(&fired, driver, renderer),
        }
    }

    fn on_key<C, I>(
        &mut self,
        event: &KeyEvent,
        driver: &mut Driver<C, I>,
        renderer: &mut dyn Renderer,
    ) where
        C: Clock,
        I: InputSource,
    {
        if self.state != TrialState::Running {
            return;
        }
        let Some(response) = self.capture.offer(event) else {
            return;
        };
        self.state = TrialState::Responded;
        self.end_reason = Some(EndReason::Responded);

        let color = if response.within(self.config.response_deadline_ms()) {
            ColorToken::ParticipantHit
        } else {
            ColorToken::Miss
        };
        render::paint(renderer, ElementId::Participant, color);
        tracing::debug!(rt_ms = ?response.reaction_time_ms, "response captured");

        if !self.config.holds_until_fallback() {
            self.finalize(driver);
        }
    }

    fn on_timer<C, I>(
        &mut self,
        fired: &Fired<TimerEvent>,
        driver: &mut Driver<C, I>,
        renderer: &mut dyn Renderer,
    ) where
        C: Clock,
        I: InputSource,
    {
        if self.state.is_done() {
            return;
        }
        match fired.event {
            TimerEvent::StimulusHide => render::show(renderer, ElementId::Stimulus, ""),
            TimerEvent::PartnerReveal => PartnerSimulator::reveal(renderer),
            TimerEvent::ResponseDeadline => {
                if self.state != TrialState::Running {
                    return;
                }
                self.time_out(EndReason::DeadlineElapsed, renderer);
                if !self.config.holds_until_fallback() {
                    self.finalize(driver);
                }
            }
            TimerEvent::TrialFallback => {
                if self.state == TrialState::Running {
                    self.time_out(EndReason::Fallback, renderer);
                }
                self.finalize(driver);
            }
            TimerEvent::PhaseEnd => {
                tracing::debug!("stray phase timer during trial ignored");
            }
        }
    }

    fn time_out(&mut self, reason: EndReason, renderer: &mut dyn Renderer) {
        self.capture.expire();
        self.state = TrialState::TimedOut;
        self.end_reason = Some(reason);
        render::paint(renderer, ElementId::Participant, ColorToken::Miss);
    }

    /// `Finalizing → Done`. Nothing scheduled for this trial survives it.
    fn finalize<C, I>(&mut self, driver: &mut Driver<C, I>)
    where
        C: Clock,
        I: InputSource,
    {
        self.state = TrialState::Finalizing;
        let dropped = driver.cancel_all();
        self.capture.stop();
        self.timestamps.ended_ms = driver.now_ms();
        self.state = TrialState::Done;
        tracing::trace!(dropped, "trial finalized");
    }

    /// Forced end from outside the trial's own timers.
    pub fn abort<C, I>(&mut self, driver: &mut Driver<C, I>)
    where
        C: Clock,
        I: InputSource,
    {
        if self.state == TrialState::Running {
            self.capture.expire();
            self.end_reason = Some(EndReason::Fallback);
        }
        self.finalize(driver);
    }

    /// Classifies from the recorded numbers. Only meaningful once `Done`.
    pub fn outcome(&self) -> TrialOutcome {
        let response = self.capture.response();
        let partner_rt = self.partner.map_or(u64::MAX, |p| p.reaction_time_ms);
        classify(
            response.occurred,
            response.reaction_time_ms,
            partner_rt,
            self.config.response_deadline_ms(),
        )
    }

    pub fn into_run(self) -> TrialRun {
        let outcome = self.outcome();
        TrialRun {
            response: self.capture.response(),
            partner: self.partner.unwrap_or(PartnerEvent {
                reaction_time_ms: u64::MAX,
            }),
            outcome,
            end_reason: self.end_reason.unwrap_or(EndReason::Fallback),
            timestamps: self.timestamps,
            config: self.config,
        }
    }
}
