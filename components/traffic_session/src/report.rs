//! Session report

use serde::{Deserialize, Serialize};
use traffic_analyzer::{render_budgeted_report, AnalysisSummary};
use uuid::Uuid;

/// Outcome of one traffic session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionReport {
    pub session_id: Uuid,
    /// Session creation (ms since epoch)
    pub started_at: f64,
    /// Window close (ms since epoch)
    pub finished_at: f64,
    pub summary: AnalysisSummary,
    /// Bounded `[0, 100]` efficiency score of the window
    pub efficiency_score: u8,
    /// Page-weight budget the window is measured against
    #[serde(default)]
    pub page_weight_budget_bytes: u64,
}

impl SessionReport {
    /// Wall-clock duration of the session in milliseconds
    pub fn duration_ms(&self) -> f64 {
        (self.finished_at - self.started_at).max(0.0)
    }

    /// Whether the window transferred more than the page-weight budget
    pub fn is_over_budget(&self) -> bool {
        self.page_weight_budget_bytes > 0
            && self.summary.total_size_bytes > self.page_weight_budget_bytes
    }

    /// Human-readable rendering
    pub fn render(&self) -> String {
        render_budgeted_report(
            &self.summary,
            self.efficiency_score,
            self.page_weight_budget_bytes,
        )
    }
}
