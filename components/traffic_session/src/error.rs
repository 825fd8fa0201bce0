//! Error types for traffic sessions

use thiserror::Error;
use traffic_types::TrafficError;

/// Errors that can occur while running a traffic session
#[derive(Error, Debug)]
pub enum SessionError {
    /// The session is already observing a page
    #[error("Session is already attached to a page")]
    AlreadyAttached,

    /// The session is not observing a page
    #[error("Session is not attached to a page")]
    NotAttached,

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A report sink rejected the report
    #[error("Report sink failed: {0}")]
    Sink(String),

    /// Error from the rule engine, collector or analyzer
    #[error(transparent)]
    Traffic(#[from] TrafficError),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Other errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type for session operations
pub type Result<T> = std::result::Result<T, SessionError>;
