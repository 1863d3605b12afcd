pub mod scheduler;
pub mod timer;

pub use scheduler::{Fired, Scheduler, TimerHandle};
pub use timer::{Clock, HighPrecisionTimer, LagStats, LagSummary, VirtualClock};
