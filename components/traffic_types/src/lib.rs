// Traffic data model, error taxonomy and domain helpers
//
// Shared by the rule engine, the collector and the analyzer so that every
// component agrees on how a request, a cache outcome and a domain look.

pub mod domain;
pub mod errors;
pub mod interception;
pub mod model;

// Re-export commonly used types
pub use domain::{domain_or_unknown, extract_domain, host_matches_suffix, UNKNOWN_DOMAIN};
pub use errors::{Result, TrafficError};
pub use interception::{DecisionOutcome, DecisionReport, InterceptionObserver, InterceptionStats};
pub use model::{
    AggregateBucket, CacheState, CacheStats, HttpHeaders, Protocol, RequestRecord, ResourceType,
    TrafficSnapshot, TypeCacheTally, TypeTally,
};

use std::time::{SystemTime, UNIX_EPOCH};

/// Bytes in one megabyte as used for every size threshold and report
pub const BYTES_PER_MB: u64 = 1024 * 1024;

/// Current wall-clock time in milliseconds since the Unix epoch
pub fn now_millis() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64() * 1000.0)
        .unwrap_or(0.0)
}

/// Convert a byte count to megabytes
pub fn bytes_to_mb(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_MB as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_millis_is_positive() {
        assert!(now_millis() > 0.0);
    }

    #[test]
    fn test_bytes_to_mb() {
        assert_eq!(bytes_to_mb(BYTES_PER_MB), 1.0);
        assert_eq!(bytes_to_mb(BYTES_PER_MB / 4), 0.25);
        assert_eq!(bytes_to_mb(0), 0.0);
    }
}
