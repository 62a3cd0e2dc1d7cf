use std::io;

/// Error returned when a record cannot be delivered to its sink.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("sink write failed: {0}")]
    Io(#[from] io::Error),

    #[error("failed to encode record: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("logger is not initialized")]
    NotInitialized,

    #[error("failed to install tracing subscriber: {0}")]
    Subscriber(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// Error returned when configuration values cannot be parsed.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown output mode: {0}")]
    UnknownMode(String),

    #[error("invalid destination: {0}")]
    InvalidDestination(String),

    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}
