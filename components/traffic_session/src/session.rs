//! Traffic session orchestration

use rule_engine::{build_rules, Interceptor};
use std::sync::Arc;
use tracing::{debug, info};
use traffic_analyzer::{score, AnalysisSummary, TrafficAnalyzer};
use traffic_collector::{TrafficCollector, TrafficPage};
use traffic_types::{now_millis, InterceptionObserver, TrafficError, TrafficSnapshot};
use uuid::Uuid;

use crate::report::SessionReport;
use crate::sink::ReportSink;
use crate::{Result, SessionConfig, SessionError};

/// One observation window over a page
///
/// Wires the compiled rule table, the interceptor, the collector and the
/// analyzer together:
/// - the host routes every outgoing request through [`interceptor()`](Self::interceptor)
/// - the collector subscribes to the page on [`attach`](Self::attach) and
///   receives the interceptor's decisions
/// - [`finish`](Self::finish) closes the window and produces a
///   [`SessionReport`]
///
/// # Example
///
/// ```
/// use traffic_session::{SessionConfig, TrafficSession};
/// use traffic_types::ResourceType;
/// use rule_engine::{InterceptDecision, InterceptedRequest};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let session = TrafficSession::new(SessionConfig::default())?;
///
/// let request = InterceptedRequest::new("1", "https://ad.doubleclick.net/x.js", "GET", ResourceType::Script);
/// assert_ne!(session.interceptor().on_request(&request), InterceptDecision::Continue);
///
/// let report = session.finish().await?;
/// assert_eq!(report.summary.interception.blocked, 1);
/// # Ok(())
/// # }
/// ```
pub struct TrafficSession {
    id: Uuid,
    config: SessionConfig,
    interceptor: Arc<Interceptor>,
    collector: TrafficCollector,
    analyzer: TrafficAnalyzer,
    started_at: f64,
}

impl TrafficSession {
    /// Create a session and compile its rules
    ///
    /// # Errors
    /// `InvalidConfiguration` when the configuration does not validate, or a
    /// rule engine error when a pattern does not compile.
    pub fn new(config: SessionConfig) -> Result<Self> {
        config.validate()?;

        let rules = Arc::new(build_rules(&config.rule_flags())?);
        let collector = TrafficCollector::new();
        let observer: Arc<dyn InterceptionObserver> = Arc::new(collector.clone());
        let interceptor = Arc::new(Interceptor::with_observer(rules, observer));
        let analyzer = TrafficAnalyzer::with_config(config.analyzer_config());

        let id = Uuid::new_v4();
        debug!(
            "Created traffic session {} with {} rules",
            id,
            interceptor.rules().len()
        );

        Ok(Self {
            id,
            config,
            interceptor,
            collector,
            analyzer,
            started_at: now_millis(),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Interception hook to install on the page
    pub fn interceptor(&self) -> Arc<Interceptor> {
        Arc::clone(&self.interceptor)
    }

    pub fn collector(&self) -> &TrafficCollector {
        &self.collector
    }

    pub fn started_at(&self) -> f64 {
        self.started_at
    }

    /// Start observing a page's network traffic
    ///
    /// # Errors
    /// `AlreadyAttached` if the session already observes a page, or the
    /// collector's error when the page offers no usable event channel.
    pub async fn attach(&self, page: &dyn TrafficPage) -> Result<()> {
        if self.collector.is_running() {
            return Err(SessionError::AlreadyAttached);
        }

        match self.collector.start(page).await {
            Ok(()) => {
                info!("Session {} attached to page", self.id);
                Ok(())
            }
            Err(TrafficError::AlreadyStarted) => Err(SessionError::AlreadyAttached),
            Err(e) => Err(e.into()),
        }
    }

    /// Stop observing without closing the window
    pub fn detach(&self) -> Result<()> {
        if self.collector.stop() {
            Ok(())
        } else {
            Err(SessionError::NotAttached)
        }
    }

    /// Wait until the attached page closes its event channel
    pub async fn wait_for_page_close(&self) {
        self.collector.wait_for_close().await;
    }

    pub fn is_attached(&self) -> bool {
        self.collector.is_running()
    }

    /// Current state of the window, partial records included
    pub fn snapshot(&self) -> TrafficSnapshot {
        self.collector.get_snapshot()
    }

    /// Analyze the window so far without closing it
    pub fn analyze(&self) -> Result<AnalysisSummary> {
        Ok(self.analyzer.analyze(&self.collector.get_snapshot())?)
    }

    /// Close the window and produce the session report
    ///
    /// Detaches from the page if needed and finalizes every pending record
    /// with its last-known size.
    pub async fn finish(&self) -> Result<SessionReport> {
        if self.collector.stop() {
            debug!("Session {} detached on finish", self.id);
        }

        let snapshot = self.collector.close_window();
        let summary = self.analyzer.analyze(&snapshot)?;
        let efficiency_score = score(&summary);

        info!(
            "Session {} finished: {} requests, {} bytes, score {}",
            self.id, summary.total_requests, summary.total_size_bytes, efficiency_score
        );

        Ok(SessionReport {
            session_id: self.id,
            started_at: self.started_at,
            finished_at: now_millis(),
            summary,
            efficiency_score,
            page_weight_budget_bytes: self.config.target_page_weight_bytes(),
        })
    }

    /// Close the window and hand the report to a sink
    pub async fn finish_and_submit(&self, sink: &dyn ReportSink) -> Result<SessionReport> {
        let report = self.finish().await?;
        sink.submit(&report).await?;
        Ok(report)
    }
}

impl std::fmt::Debug for TrafficSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrafficSession")
            .field("id", &self.id)
            .field("attached", &self.is_attached())
            .field("records", &self.collector.record_count())
            .finish()
    }
}
