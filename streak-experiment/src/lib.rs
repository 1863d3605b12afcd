pub mod capture;
pub mod config;
pub mod credit;
pub mod driver;
pub mod error;
pub mod feedback;
pub mod input;
pub mod interval;
pub mod participant;
pub mod partner;
pub mod record;
pub mod render;
pub mod session;
pub mod state;
pub mod trial;

pub use capture::InputCapture;
pub use config::{BlockSpec, ConfigLoadError, DelayPolicy, ExperimentConfig, TemplateOrder};
pub use credit::CreditDecks;
pub use driver::{Driver, TimerEvent, Wake};
pub use error::{EngineError, RecordError};
pub use feedback::{Feedback, FeedbackPolicy, RoundCounters, RoundStatus, SideFeedback};
pub use input::{Cue, InputSource, ScriptedInput};
pub use interval::IntervalDeck;
pub use participant::{ParticipantModel, SimulatedParticipant};
pub use partner::PartnerSimulator;
pub use record::{AbandonedTrial, JsonLinesRecorder, MemoryRecorder, Recorder};
pub use render::{MemoryRenderer, NullRenderer, RenderCall, RenderError, Renderer};
pub use session::{SessionContext, run_experiment};
pub use state::{BlockSequencer, BlockSummary, OutcomeCounts};
pub use trial::{TrialController, TrialRun};
