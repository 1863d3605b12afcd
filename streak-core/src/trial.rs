use serde::{Deserialize, Serialize};

use crate::config::TrialConfig;
use crate::outcome::TrialOutcome;

/// Trial lifecycle states.
#[derive(Copy, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrialState {
    Armed,
    Running,
    Responded,
    TimedOut,
    Finalizing,
    Done,
}

impl TrialState {
    pub fn is_done(&self) -> bool {
        matches!(self, TrialState::Done)
    }
}

/// Keyboard key code.
#[derive(Copy, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Key(pub u32);

impl Key {
    pub const SPACE: Key = Key(32);
}

/// A key press as delivered by an input source, stamped on the engine clock.
#[derive(Copy, Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub at_ms: u64,
}

impl KeyEvent {
    pub fn new(key: Key, at_ms: u64) -> Self {
        Self { key, at_ms }
    }
}

/// The participant's response for one trial. At most one per trial.
#[derive(Copy, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseEvent {
    pub key: Option<Key>,
    pub reaction_time_ms: Option<u64>,
    pub occurred: bool,
}

impl ResponseEvent {
    pub fn pressed(key: Key, reaction_time_ms: u64) -> Self {
        Self {
            key: Some(key),
            reaction_time_ms: Some(reaction_time_ms),
            occurred: true,
        }
    }

    pub fn none() -> Self {
        Self {
            key: None,
            reaction_time_ms: None,
            occurred: false,
        }
    }

    pub fn within(&self, deadline_ms: u64) -> bool {
        self.occurred && self.reaction_time_ms.is_some_and(|rt| rt <= deadline_ms)
    }
}

/// The partner's sampled reaction time. Sampled once at trial start; the
/// reveal timer and the classifier both read this value.
#[derive(Copy, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartnerEvent {
    pub reaction_time_ms: u64,
}

impl PartnerEvent {
    pub fn within(&self, deadline_ms: u64) -> bool {
        self.reaction_time_ms <= deadline_ms
    }
}

/// Why the trial stopped running.
#[derive(Copy, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    Responded,
    DeadlineElapsed,
    Fallback,
}

#[derive(Copy, Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialTimestamps {
    pub started_ms: u64,
    pub ended_ms: u64,
}

impl TrialTimestamps {
    pub fn duration_ms(&self) -> u64 {
        self.ended_ms.saturating_sub(self.started_ms)
    }
}

/// Points awarded for a single trial.
#[derive(Copy, Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreDelta {
    pub participant: u32,
    pub partner: u32,
}

/// Cumulative points per side within a block.
#[derive(Copy, Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBoard {
    pub participant: u32,
    pub partner: u32,
}

impl ScoreBoard {
    pub fn apply(&mut self, delta: ScoreDelta) {
        self.participant += delta.participant;
        self.partner += delta.partner;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Finished trial, handed to the recorder. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    pub block: String,
    pub trial_index: usize,
    pub block_trial: usize,
    pub config: TrialConfig,
    pub response: ResponseEvent,
    pub partner: PartnerEvent,
    pub outcome: TrialOutcome,
    /// Whether the feedback screen credited the participant.
    pub credited: bool,
    pub score_delta: ScoreDelta,
    pub totals: ScoreBoard,
    pub early_responses: u32,
    pub end_reason: EndReason,
    pub timestamps: TrialTimestamps,
}
