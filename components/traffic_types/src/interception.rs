// Interception decision reports

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::ResourceType;

/// What the interceptor did with a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionOutcome {
    /// Request proceeded unmodified
    Continued,
    /// Request was answered with a synthetic body
    Fulfilled,
    /// Request was aborted
    Aborted,
}

/// A single interception decision, reported to the collector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionReport {
    pub request_id: String,
    pub url: String,
    pub domain: String,
    pub resource_type: ResourceType,
    pub allowed: bool,
    pub outcome: DecisionOutcome,
}

/// Receiver of interception decisions
///
/// Implementations must not block: they are called from the interception
/// path, which gates whether the request proceeds at all.
pub trait InterceptionObserver: Send + Sync {
    fn on_decision(&self, report: &DecisionReport);
}

/// Allow/block counters for a window
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterceptionStats {
    pub allowed: u64,
    pub blocked: u64,
    pub fulfilled: u64,
    pub aborted: u64,
    #[serde(default)]
    pub blocked_by_domain: BTreeMap<String, u64>,
}

impl InterceptionStats {
    /// Account one decision
    pub fn record(&mut self, report: &DecisionReport) {
        if report.allowed {
            self.allowed += 1;
        } else {
            self.blocked += 1;
            *self
                .blocked_by_domain
                .entry(report.domain.clone())
                .or_insert(0) += 1;
        }

        match report.outcome {
            DecisionOutcome::Fulfilled => self.fulfilled += 1,
            DecisionOutcome::Aborted => self.aborted += 1,
            DecisionOutcome::Continued => {}
        }
    }

    /// Share of decisions that blocked, in percent
    pub fn block_rate(&self) -> f64 {
        let total = self.allowed + self.blocked;
        if total == 0 {
            0.0
        } else {
            self.blocked as f64 / total as f64 * 100.0
        }
    }
}
