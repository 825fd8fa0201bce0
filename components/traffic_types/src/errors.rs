// Traffic error taxonomy

use thiserror::Error;

/// Errors raised by the traffic components
///
/// The interceptor and the collector never let these escape across the host
/// page boundary; they log and degrade instead. The analyzer returns them to
/// its caller.
#[derive(Error, Debug)]
pub enum TrafficError {
    /// Domain extraction failed for a URL
    #[error("Unparseable URL: {0}")]
    UnparseableUrl(String),

    /// A second terminal signal arrived for an already finalized request
    #[error("Request already finalized: {0}")]
    DuplicateFinalize(String),

    /// A request never reached a terminal signal
    #[error("Partial record: {0}")]
    PartialRecord(String),

    /// The host page cannot provide the requested event channel
    #[error("Subscription unavailable: {0}")]
    SubscriptionUnavailable(String),

    /// The collector is already attached to a page
    #[error("Collector already started")]
    AlreadyStarted,

    /// A rule pattern could not be compiled
    #[error("Invalid domain pattern: {0}")]
    InvalidPattern(String),

    /// A snapshot violates one of its aggregate invariants
    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for traffic operations
pub type Result<T> = std::result::Result<T, TrafficError>;
