// Central Error Type for the Pipeline

use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Broker unreachable or connection dropped. Always fatal.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Channel or protocol level failure reported by the broker
    #[error("Broker error: {0}")]
    Broker(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Source error: {0}")]
    Source(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// True when the error means the broker connection is gone and the
    /// process has to stop.
    pub fn is_connection_fatal(&self) -> bool {
        matches!(self, AppError::Connection(_))
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
