use rand::SeedableRng;
use rand::rngs::StdRng;
use streak_core::ScoreBoard;
use streak_timing::Clock;

use crate::config::ExperimentConfig;
use crate::driver::Driver;
use crate::error::EngineError;
use crate::feedback::{FeedbackPolicy, RoundCounters};
use crate::input::InputSource;
use crate::record::Recorder;
use crate::render::Renderer;
use crate::state::{BlockSequencer, BlockSummary};

/// Mutable state that lives across trials: the running trial index, the
/// score counters and the random source. Only the block sequencer writes
/// to it, and only between trials.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub trial_index: usize,
    pub scores: ScoreBoard,
    pub rounds: RoundCounters,
    pub rng: StdRng,
}

impl SessionContext {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self::with_rng(rng)
    }

    pub fn with_rng(rng: StdRng) -> Self {
        Self {
            trial_index: 0,
            scores: ScoreBoard::default(),
            rounds: RoundCounters::default(),
            rng,
        }
    }

    /// Block boundary: counters start over, the trial index keeps running.
    pub fn reset_block(&mut self, policy: &FeedbackPolicy) {
        self.scores.reset();
        self.rounds.reset(policy);
    }
}

/// Runs every block of `config` in order.
pub fn run_experiment<C, I>(
    config: &ExperimentConfig,
    driver: &mut Driver<C, I>,
    renderer: &mut dyn Renderer,
    recorder: &mut dyn Recorder,
) -> Result<Vec<BlockSummary>, EngineError>
where
    C: Clock,
    I: InputSource,
{
    let mut ctx = SessionContext::new(config.seed);
    let mut summaries = Vec::with_capacity(config.blocks.len());
    for spec in &config.blocks {
        let mut block = BlockSequencer::new(spec.clone()).map_err(|source| EngineError::Config {
            block: spec.name.clone(),
            source,
        })?;
        summaries.push(block.run(&mut ctx, driver, renderer, recorder)?);
    }
    Ok(summaries)
}
