use streak_core::ConfigError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecordError {
    #[error("failed to write record: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode record: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("block `{block}` rejected: {source}")]
    Config {
        block: String,
        #[source]
        source: ConfigError,
    },

    #[error("event loop stalled: no timer pending and no input left")]
    Stalled,

    #[error(transparent)]
    Record(#[from] RecordError),
}
