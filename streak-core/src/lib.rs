pub mod config;
pub mod error;
pub mod outcome;
pub mod phase;
pub mod trial;

pub use config::{KeySet, Mode, PartnerLatency, Shape, TrialConfig, TrialKind, TrialSpec};
pub use error::ConfigError;
pub use outcome::{TrialOutcome, classify};
pub use phase::{BlockPhase, ColorToken, ElementId};
pub use trial::{
    EndReason, Key, KeyEvent, PartnerEvent, ResponseEvent, ScoreBoard, ScoreDelta, TrialRecord,
    TrialState, TrialTimestamps,
};
