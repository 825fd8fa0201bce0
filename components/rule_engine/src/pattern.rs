//! Compiled domain patterns
//!
//! A pattern is an exact hostname, a `*.suffix` wildcard or a
//! `prefix*suffix` wildcard. Only a single `*` is accepted.

use serde::{Deserialize, Serialize};
use std::fmt;
use traffic_types::{Result, TrafficError};

/// A domain pattern compiled once at rule build time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum DomainPattern {
    /// Matches one hostname exactly
    Exact { host: String },
    /// `*.suffix`: matches any strict subdomain of `suffix`
    Subdomain { suffix: String },
    /// `prefix*suffix`: matches hosts that start with `prefix` and end with `suffix`
    Affix { prefix: String, suffix: String },
}

impl DomainPattern {
    /// Compile a textual pattern
    ///
    /// # Errors
    /// `TrafficError::InvalidPattern` for empty patterns or patterns with more
    /// than one `*`.
    pub fn compile(pattern: &str) -> Result<Self> {
        let pattern = pattern.trim().to_ascii_lowercase();
        if pattern.is_empty() {
            return Err(TrafficError::InvalidPattern("empty pattern".to_string()));
        }

        match pattern.matches('*').count() {
            0 => Ok(DomainPattern::Exact { host: pattern }),
            1 => {
                if let Some(suffix) = pattern.strip_prefix("*.") {
                    if suffix.is_empty() {
                        return Err(TrafficError::InvalidPattern(pattern));
                    }
                    return Ok(DomainPattern::Subdomain {
                        suffix: suffix.to_string(),
                    });
                }

                let (prefix, suffix) = pattern
                    .split_once('*')
                    .ok_or_else(|| TrafficError::InvalidPattern(pattern.clone()))?;
                Ok(DomainPattern::Affix {
                    prefix: prefix.to_string(),
                    suffix: suffix.to_string(),
                })
            }
            _ => Err(TrafficError::InvalidPattern(format!(
                "{} (only one '*' allowed)",
                pattern
            ))),
        }
    }

    pub fn is_wildcard(&self) -> bool {
        !matches!(self, DomainPattern::Exact { .. })
    }

    /// Test a lowercase hostname against the pattern
    pub fn matches(&self, domain: &str) -> bool {
        match self {
            DomainPattern::Exact { host } => domain == host,
            DomainPattern::Subdomain { suffix } => {
                domain.len() > suffix.len() + 1
                    && domain.ends_with(suffix.as_str())
                    && domain.as_bytes()[domain.len() - suffix.len() - 1] == b'.'
            }
            DomainPattern::Affix { prefix, suffix } => {
                domain.len() >= prefix.len() + suffix.len()
                    && domain.starts_with(prefix.as_str())
                    && domain.ends_with(suffix.as_str())
            }
        }
    }
}

impl fmt::Display for DomainPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DomainPattern::Exact { host } => write!(f, "{}", host),
            DomainPattern::Subdomain { suffix } => write!(f, "*.{}", suffix),
            DomainPattern::Affix { prefix, suffix } => write!(f, "{}*{}", prefix, suffix),
        }
    }
}
