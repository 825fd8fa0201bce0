//! Traffic analysis and efficiency scoring
//!
//! Reduces a [`TrafficSnapshot`](traffic_types::TrafficSnapshot) to a ranked
//! [`AnalysisSummary`] with optimization recommendations, and scores the
//! window on a bounded `[0, 100]` scale.
//!
//! # Example
//!
//! ```
//! use traffic_analyzer::{analyze, efficiency_score, render_report, score};
//! use traffic_types::TrafficSnapshot;
//!
//! let summary = analyze(&TrafficSnapshot::default()).unwrap();
//! assert!(summary.recommendations.is_empty());
//!
//! assert_eq!(efficiency_score(0.25, 50.0), 95);
//! let text = render_report(&summary, score(&summary));
//! assert!(text.contains("Efficiency score: 90/100"));
//! ```

mod analyzer;
mod recommendations;
mod report;
mod scorer;
pub mod types;

pub use analyzer::{analyze, TrafficAnalyzer};
pub use report::{render_budgeted_report, render_report};
pub use scorer::{efficiency_score, score, ScoreBreakdown};
pub use types::{
    default_ad_domain_markers, AnalysisSummary, AnalyzerConfig, DomainUsage, LargeResource,
    Priority, ProtocolUsage, Recommendation, RecommendationCategory, ResourceTypeUsage,
};
