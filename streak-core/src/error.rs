use thiserror::Error;

/// Rejected trial or block configuration. Always raised while building a
/// config, never while a trial is running.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("response deadline must be positive")]
    NonPositiveDeadline,

    #[error("response deadline {deadline_ms} ms leaves no room for a default fallback")]
    DeadlineTooLong { deadline_ms: u64 },

    #[error("trial fallback must be positive")]
    NonPositiveFallback,

    #[error("trial fallback ({fallback_ms} ms) ends before the response deadline ({deadline_ms} ms)")]
    FallbackBeforeDeadline { deadline_ms: u64, fallback_ms: u64 },

    #[error("key set is empty")]
    EmptyKeySet,

    #[error("partner latency range {min_ms}..={max_ms} is empty")]
    EmptyPartnerRange { min_ms: u64, max_ms: u64 },

    #[error("inter-trial interval set is empty")]
    EmptyIntervals,

    #[error("block has no trial templates")]
    NoTemplates,

    #[error("block repetitions must be at least 1")]
    ZeroRepetitions,

    #[error("earned feedback must be between 0 and 10 per 10 trials, got {earned}")]
    EarnRatioOutOfRange { earned: u32 },
}
