//! Browser traffic interception and analysis
//!
//! Blocks requests outside a first-party allow-set, measures what the page
//! actually transfers, and condenses each window into a ranked summary, a
//! list of optimization recommendations and a `[0, 100]` efficiency score.
//!
//! The crates behind this facade:
//! - [`rule_engine`]: rule table and request interceptor
//! - [`traffic_collector`]: per-request correlation and running aggregates
//! - [`traffic_analyzer`]: summary, recommendations, score and text report
//! - [`traffic_session`]: configuration, wiring and report sinks
//!
//! # Example
//!
//! ```
//! use traffic_inspector::{efficiency_score, SessionConfig, TrafficSession};
//!
//! let session = TrafficSession::new(SessionConfig::default()).unwrap();
//! assert!(!session.is_attached());
//! assert_eq!(efficiency_score(0.25, 50.0), 95);
//! ```

pub use rule_engine::{
    build_rules, DomainFlag, DomainPattern, InterceptDecision, InterceptedRequest, Interceptor,
    RuleDecision, RuleFlags, RuleTable, SyntheticResponse,
};
pub use traffic_analyzer::{
    analyze, efficiency_score, render_report, score, AnalysisSummary, AnalyzerConfig, Priority,
    Recommendation, RecommendationCategory, TrafficAnalyzer,
};
pub use traffic_collector::{CoarseResponse, NetworkEvent, RecordStage, TrafficCollector, TrafficPage};
pub use traffic_session::{
    JsonFileSink, LogSink, ReportSink, SessionConfig, SessionError, SessionReport, TrafficSession,
};
pub use traffic_types::{
    CacheState, CacheStats, Protocol, RequestRecord, ResourceType, TrafficError, TrafficSnapshot,
};

pub use rule_engine;
pub use traffic_analyzer;
pub use traffic_collector;
pub use traffic_session;
pub use traffic_types;
