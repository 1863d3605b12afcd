use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use streak_core::{
    BlockPhase, ColorToken, ConfigError, ElementId, KeySet, ScoreBoard, TrialConfig,
    TrialOutcome, TrialRecord,
};
use streak_timing::{Clock, Fired};

use crate::config::{BlockSpec, TemplateOrder};
use crate::credit::CreditDecks;
use crate::driver::{Driver, TimerEvent, Wake};
use crate::error::EngineError;
use crate::feedback::Feedback;
use crate::input::{Cue, InputSource};
use crate::interval::IntervalDeck;
use crate::record::{AbandonedTrial, Recorder};
use crate::render::{self, Renderer};
use crate::session::SessionContext;
use crate::trial::{TrialController, TrialRun};

const TOO_FAST_HTML: &str =
    "<p>Too Fast!</p><p>Please wait for the tile to appear before pressing your SPACEBAR</p>";

#[derive(Copy, Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeCounts {
    pub ww: usize,
    pub wl: usize,
    pub lw: usize,
    pub ll: usize,
}

impl OutcomeCounts {
    pub fn add(&mut self, outcome: TrialOutcome) {
        match outcome {
            TrialOutcome::WW => self.ww += 1,
            TrialOutcome::WL => self.wl += 1,
            TrialOutcome::LW => self.lw += 1,
            TrialOutcome::LL => self.ll += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.ww + self.wl + self.lw + self.ll
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSummary {
    pub name: String,
    pub completed: usize,
    pub abandoned: usize,
    pub early_responses: u32,
    pub outcomes: OutcomeCounts,
    pub totals: ScoreBoard,
}

/// Runs one block: `Intro? → (Delay ⇄ EarlyWarning) → ActiveTrial →
/// Feedback`, once per scheduled trial, then `Complete`.
///
/// The score counters live in the `SessionContext`; they are reset when the
/// block starts and touched only in the feedback phase.
#[derive(Debug)]
pub struct BlockSequencer {
    spec: BlockSpec,
    templates: Vec<TrialConfig>,
    deck: IntervalDeck,
    credit: CreditDecks,
    phase: BlockPhase,
    history: Vec<BlockPhase>,
}

impl BlockSequencer {
    pub fn new(spec: BlockSpec) -> Result<Self, ConfigError> {
        let templates = spec.validate()?;
        let deck = IntervalDeck::new(&spec.delay.intervals_ms)?;
        let credit = CreditDecks::new(spec.earned_per_ten)?;
        Ok(Self {
            spec,
            templates,
            deck,
            credit,
            phase: BlockPhase::default(),
            history: Vec::new(),
        })
    }

    pub fn phase(&self) -> BlockPhase {
        self.phase
    }

    /// Every phase entered so far, in order.
    pub fn history(&self) -> &[BlockPhase] {
        &self.history
    }

    /// Template indices for the whole block. Each pass holds every template
    /// exactly once.
    pub fn trial_order<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.spec.trial_count());
        for _ in 0..self.spec.repetitions {
            let mut pass: Vec<usize> = (0..self.templates.len()).collect();
            if self.spec.order == TemplateOrder::Shuffled {
                pass.shuffle(rng);
            }
            order.extend(pass);
        }
        order
    }

    pub fn run<C, I>(
        &mut self,
        ctx: &mut SessionContext,
        driver: &mut Driver<C, I>,
        renderer: &mut dyn Renderer,
        recorder: &mut dyn Recorder,
    ) -> Result<BlockSummary, EngineError>
    where
        C: Clock,
        I: InputSource,
    {
        ctx.reset_block(&self.spec.feedback);
        self.history.clear();
        self.credit.reset();
        let order = self.trial_order(&mut ctx.rng);
        let mut summary = BlockSummary {
            name: self.spec.name.clone(),
            completed: 0,
            abandoned: 0,
            early_responses: 0,
            outcomes: OutcomeCounts::default(),
            totals: ScoreBoard::default(),
        };
        tracing::info!(block = %self.spec.name, trials = order.len(), "block started");

        let Some(&first) = order.first() else {
            self.enter(BlockPhase::Complete);
            return Ok(summary);
        };
        match self.spec.intro_ms {
            Some(ms) => {
                self.enter(BlockPhase::Intro);
                render::show(renderer, ElementId::Feedback, "<p>Get ready!</p>");
                let keys = self.templates[first].keys().clone();
                self.hold(driver, &keys, ms)?;
                self.advance(false, true);
            }
            None => self.enter(BlockPhase::Delay),
        }

        for (block_trial, &template) in order.iter().enumerate() {
            let more_after = block_trial + 1 < order.len();
            let config = self.templates[template].clone();
            let (early, abandoned) =
                self.delay_loop(ctx, driver, renderer, config.keys(), more_after)?;
            summary.early_responses += early;

            if abandoned {
                summary.abandoned += 1;
                recorder.abandoned(AbandonedTrial {
                    block: self.spec.name.clone(),
                    trial_index: ctx.trial_index,
                    block_trial,
                    early_responses: early,
                    at_ms: driver.now_ms(),
                })?;
                ctx.trial_index += 1;
                continue;
            }

            let run = TrialController::new(config).run(driver, renderer, &mut ctx.rng)?;

            self.advance(false, true);
            let hit = run.outcome.participant_won();
            let credited = self.credit.draw(hit, &mut ctx.rng);
            let feedback = self.spec.feedback.apply(
                run.outcome,
                credited,
                run.config.mode(),
                &mut ctx.scores,
                &mut ctx.rounds,
            );
            self.show_feedback(&run, &feedback, driver, renderer)?;

            summary.completed += 1;
            summary.outcomes.add(run.outcome);
            tracing::info!(
                block = %self.spec.name,
                trial = ctx.trial_index,
                outcome = %run.outcome,
                credited,
                rt_ms = ?run.response.reaction_time_ms,
                partner_rt_ms = run.partner.reaction_time_ms,
                early,
                "trial finished"
            );
            recorder.append(build_record(
                &self.spec.name,
                ctx.trial_index,
                block_trial,
                run,
                &feedback,
                early,
            ))?;
            ctx.trial_index += 1;
            self.advance(false, more_after);
        }

        if !self.phase.is_complete() {
            self.enter(BlockPhase::Complete);
        }
        driver.cancel_all();
        summary.totals = ctx.scores;
        tracing::info!(
            block = %summary.name,
            completed = summary.completed,
            abandoned = summary.abandoned,
            participant = summary.totals.participant,
            partner = summary.totals.partner,
            "block complete"
        );
        Ok(summary)
    }

    /// Runs `Delay`, looping through `EarlyWarning` on every early press.
    /// Returns the number of early presses and whether the slot was given
    /// up. On return the phase is `ActiveTrial`, or the phase after an
    /// abandoned slot.
    fn delay_loop<C, I>(
        &mut self,
        ctx: &mut SessionContext,
        driver: &mut Driver<C, I>,
        renderer: &mut dyn Renderer,
        keys: &KeySet,
        more_after: bool,
    ) -> Result<(u32, bool), EngineError>
    where
        C: Clock,
        I: InputSource,
    {
        let mut early = 0u32;
        loop {
            let interval_ms = self.deck.draw(&mut ctx.rng);
            render::show(renderer, ElementId::Stimulus, "");
            driver.notify(Cue::Delay);
            let pressed = self.hold(driver, keys, interval_ms)?;
            self.advance(pressed, true);
            if !pressed {
                return Ok((early, false));
            }

            early += 1;
            tracing::warn!(block = %self.spec.name, trial = ctx.trial_index, early, "response before stimulus");
            render::show(renderer, ElementId::Feedback, TOO_FAST_HTML);
            self.hold(driver, keys, self.spec.delay.early_warning_ms)?;
            render::show(renderer, ElementId::Feedback, "");
            self.hold(driver, keys, self.spec.delay.early_warning_gap_ms)?;

            let give_up = self.spec.delay.max_early_retries.is_some_and(|max| early > max);
            self.advance(false, more_after || !give_up);
            if give_up {
                return Ok((early, true));
            }
        }
    }

    /// Stays in the current phase for `ms`. Phases that take input end early
    /// on a qualifying press and report it; the others drop every key.
    fn hold<C, I>(
        &self,
        driver: &mut Driver<C, I>,
        keys: &KeySet,
        ms: u64,
    ) -> Result<bool, EngineError>
    where
        C: Clock,
        I: InputSource,
    {
        if self.phase.allows_input() {
            wait_for_press(driver, keys, ms)
        } else {
            wait(driver, ms).map(|()| false)
        }
    }

    fn show_feedback<C, I>(
        &self,
        run: &TrialRun,
        feedback: &Feedback,
        driver: &mut Driver<C, I>,
        renderer: &mut dyn Renderer,
    ) -> Result<(), EngineError>
    where
        C: Clock,
        I: InputSource,
    {
        if self.spec.outcome_display_ms > 0 {
            let config = &run.config;
            render::show(
                renderer,
                ElementId::Stimulus,
                &render::stimulus_html(config.shape(), config.mode()),
            );
            let own = if run.outcome.participant_won() {
                ColorToken::ParticipantHit
            } else {
                ColorToken::Miss
            };
            render::paint(renderer, ElementId::Participant, own);
            if config.is_group() {
                let partner = if run.outcome.partner_won() {
                    ColorToken::PartnerHit
                } else {
                    ColorToken::Miss
                };
                render::paint(renderer, ElementId::Partner, partner);
            }
            wait(driver, self.spec.outcome_display_ms)?;
        }

        render::show(renderer, ElementId::Stimulus, "");
        render::show(renderer, ElementId::Feedback, &feedback.message());
        wait(driver, self.spec.feedback_ms)?;
        render::show(renderer, ElementId::Feedback, "");
        Ok(())
    }

    fn advance(&mut self, early_press: bool, trials_left: bool) {
        let next = self.phase.next(early_press, trials_left).unwrap_or(BlockPhase::Complete);
        self.enter(next);
    }

    fn enter(&mut self, phase: BlockPhase) {
        tracing::debug!(block = %self.spec.name, from = ?self.phase, to = ?phase, "phase");
        self.phase = phase;
        self.history.push(phase);
    }
}

fn build_record(
    block: &str,
    trial_index: usize,
    block_trial: usize,
    run: TrialRun,
    feedback: &Feedback,
    early_responses: u32,
) -> TrialRecord {
    TrialRecord {
        block: block.to_string(),
        trial_index,
        block_trial,
        config: run.config,
        response: run.response,
        partner: run.partner,
        outcome: run.outcome,
        credited: feedback.participant.hit,
        score_delta: feedback.delta,
        totals: feedback.totals,
        early_responses,
        end_reason: run.end_reason,
        timestamps: run.timestamps,
    }
}

/// Non-interactive pause. Keys arriving meanwhile are dropped.
fn wait<C, I>(driver: &mut Driver<C, I>, ms: u64) -> Result<(), EngineError>
where
    C: Clock,
    I: InputSource,
{
    if ms == 0 {
        return Ok(());
    }
    let handle = driver.schedule(ms, TimerEvent::PhaseEnd);
    loop {
        match driver.next_wake().ok_or(EngineError::Stalled)? {
            Wake::Timer(Fired { handle: h, .. }) if h == handle => return Ok(()),
            Wake::Timer(fired) => tracing::trace!(event = ?fired.event, "stray timer ignored"),
            Wake::Key(_) => {}
        }
    }
}

/// Waits `ms` for a qualifying press. Returns true if one arrived first.
fn wait_for_press<C, I>(driver: &mut Driver<C, I>, keys: &KeySet, ms: u64) -> Result<bool, EngineError>
where
    C: Clock,
    I: InputSource,
{
    let handle = driver.schedule(ms, TimerEvent::PhaseEnd);
    loop {
        match driver.next_wake().ok_or(EngineError::Stalled)? {
            Wake::Timer(Fired { handle: h, .. }) if h == handle => return Ok(false),
            Wake::Timer(_) => {}
            Wake::Key(event) if keys.contains(event.key) => {
                driver.cancel(handle);
                return Ok(true);
            }
            Wake::Key(_) => {}
        }
    }
}
