//! Per-request interception callback
//!
//! The [`Interceptor`] is attached to every outgoing request. It is a pure
//! lookup against the [`RuleTable`]: no I/O, no awaiting, so it can gate the
//! request synchronously.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{info, warn};
use traffic_types::{
    extract_domain, DecisionOutcome, DecisionReport, InterceptionObserver, ResourceType,
    UNKNOWN_DOMAIN,
};

use crate::rules::RuleTable;

/// 1x1 transparent PNG served in place of blocked images
pub const TRANSPARENT_PNG: &[u8] = &[
    0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x48, 0x44, 0x52,
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x04, 0x00, 0x00, 0x00, 0xb5, 0x1c, 0x0c,
    0x02, 0x00, 0x00, 0x00, 0x0b, 0x49, 0x44, 0x41, 0x54, 0x78, 0xda, 0x63, 0x64, 0x60, 0x00, 0x00,
    0x00, 0x06, 0x00, 0x02, 0x30, 0x81, 0xd0, 0x2f, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4e, 0x44,
    0xae, 0x42, 0x60, 0x82,
];

const ALLOW_GLYPH: &str = "✓";
const BLOCK_GLYPH: &str = "✗";

/// An outgoing request as seen by the interception hook
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterceptedRequest {
    pub id: String,
    pub url: String,
    pub method: String,
    pub resource_type: ResourceType,
}

impl InterceptedRequest {
    pub fn new(
        id: impl Into<String>,
        url: impl Into<String>,
        method: impl Into<String>,
        resource_type: ResourceType,
    ) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            method: method.into(),
            resource_type,
        }
    }
}

/// Body the host answers a blocked request with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyntheticResponse {
    pub status: u16,
    pub content_type: String,
    pub body: Vec<u8>,
}

impl SyntheticResponse {
    fn transparent_png() -> Self {
        Self {
            status: 200,
            content_type: "image/png".to_string(),
            body: TRANSPARENT_PNG.to_vec(),
        }
    }

    fn empty(content_type: &str) -> Self {
        Self {
            status: 200,
            content_type: content_type.to_string(),
            body: Vec::new(),
        }
    }
}

/// What the host must do with the request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterceptDecision {
    /// Let the request proceed unmodified
    Continue,
    /// Fail the request
    Abort,
    /// Answer locally with a synthetic response
    Fulfill(SyntheticResponse),
}

impl InterceptDecision {
    pub fn outcome(&self) -> DecisionOutcome {
        match self {
            InterceptDecision::Continue => DecisionOutcome::Continued,
            InterceptDecision::Abort => DecisionOutcome::Aborted,
            InterceptDecision::Fulfill(_) => DecisionOutcome::Fulfilled,
        }
    }

    /// Substitute chosen for a denied request of the given type
    fn substitute_for(resource_type: ResourceType) -> Self {
        match resource_type {
            ResourceType::Image => InterceptDecision::Fulfill(SyntheticResponse::transparent_png()),
            ResourceType::Script => {
                InterceptDecision::Fulfill(SyntheticResponse::empty("application/javascript"))
            }
            ResourceType::Stylesheet => {
                InterceptDecision::Fulfill(SyntheticResponse::empty("text/css"))
            }
            _ => InterceptDecision::Abort,
        }
    }
}

/// Request interception hook
pub struct Interceptor {
    rules: Arc<RuleTable>,
    observer: RwLock<Option<Arc<dyn InterceptionObserver>>>,
    allowed: AtomicU64,
    blocked: AtomicU64,
}

impl std::fmt::Debug for Interceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interceptor")
            .field("rules", &self.rules)
            .field("allowed", &self.allowed_count())
            .field("blocked", &self.blocked_count())
            .finish()
    }
}

impl Interceptor {
    /// Create an interceptor over a compiled rule table
    pub fn new(rules: Arc<RuleTable>) -> Self {
        Self {
            rules,
            observer: RwLock::new(None),
            allowed: AtomicU64::new(0),
            blocked: AtomicU64::new(0),
        }
    }

    /// Create an interceptor that reports every decision to `observer`
    pub fn with_observer(rules: Arc<RuleTable>, observer: Arc<dyn InterceptionObserver>) -> Self {
        let interceptor = Self::new(rules);
        *interceptor.observer.write() = Some(observer);
        interceptor
    }

    /// Replace the decision observer
    pub fn set_observer(&self, observer: Arc<dyn InterceptionObserver>) {
        *self.observer.write() = Some(observer);
    }

    /// Decide the fate of one request
    ///
    /// Never fails: a URL whose domain cannot be extracted is aborted.
    pub fn on_request(&self, request: &InterceptedRequest) -> InterceptDecision {
        let (domain, decision) = match extract_domain(&request.url) {
            Ok(domain) => {
                let rule = self.rules.decide(&domain);
                let decision = if rule.allowed {
                    InterceptDecision::Continue
                } else {
                    InterceptDecision::substitute_for(request.resource_type)
                };

                if !rule.matched_silently {
                    let glyph = if rule.allowed { ALLOW_GLYPH } else { BLOCK_GLYPH };
                    info!("{} {} | {}", glyph, domain, request.resource_type);
                }

                (domain, decision)
            }
            Err(e) => {
                warn!("{} {} | {} ({})", BLOCK_GLYPH, UNKNOWN_DOMAIN, request.resource_type, e);
                (UNKNOWN_DOMAIN.to_string(), InterceptDecision::Abort)
            }
        };

        let allowed = matches!(decision, InterceptDecision::Continue);
        if allowed {
            self.allowed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.blocked.fetch_add(1, Ordering::Relaxed);
        }

        if let Some(observer) = self.observer.read().as_ref() {
            observer.on_decision(&DecisionReport {
                request_id: request.id.clone(),
                url: request.url.clone(),
                domain,
                resource_type: request.resource_type,
                allowed,
                outcome: decision.outcome(),
            });
        }

        decision
    }

    pub fn allowed_count(&self) -> u64 {
        self.allowed.load(Ordering::Relaxed)
    }

    pub fn blocked_count(&self) -> u64 {
        self.blocked.load(Ordering::Relaxed)
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{build_rules, DomainFlag, RuleFlags};
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingObserver {
        reports: Mutex<Vec<DecisionReport>>,
    }

    impl InterceptionObserver for RecordingObserver {
        fn on_decision(&self, report: &DecisionReport) {
            self.reports.lock().push(report.clone());
        }
    }

    fn interceptor() -> (Interceptor, Arc<RecordingObserver>) {
        let flags = RuleFlags::new(vec!["shop.com".to_string()])
            .with_flag(DomainFlag::new("*.ads.shop.com", false));
        let rules = Arc::new(build_rules(&flags).unwrap());
        let observer = Arc::new(RecordingObserver::default());
        (
            Interceptor::with_observer(rules, observer.clone()),
            observer,
        )
    }

    #[test]
    fn test_allowed_request_continues() {
        let (interceptor, observer) = interceptor();
        let request = InterceptedRequest::new(
            "1",
            "https://www.shop.com/search?q=tv",
            "GET",
            ResourceType::Document,
        );

        assert_eq!(interceptor.on_request(&request), InterceptDecision::Continue);
        assert_eq!(interceptor.allowed_count(), 1);
        assert_eq!(interceptor.blocked_count(), 0);

        let reports = observer.reports.lock();
        assert_eq!(reports.len(), 1);
        assert!(reports[0].allowed);
        assert_eq!(reports[0].domain, "www.shop.com");
        assert_eq!(reports[0].outcome, DecisionOutcome::Continued);
    }

    #[test]
    fn test_blocked_image_gets_png() {
        let (interceptor, _) = interceptor();
        let request = InterceptedRequest::new(
            "2",
            "https://cdn.tracker.io/banner.jpg",
            "GET",
            ResourceType::Image,
        );

        match interceptor.on_request(&request) {
            InterceptDecision::Fulfill(response) => {
                assert_eq!(response.status, 200);
                assert_eq!(response.content_type, "image/png");
                assert_eq!(response.body, TRANSPARENT_PNG);
                assert_eq!(&response.body[1..4], b"PNG");
            }
            other => panic!("expected fulfill, got {:?}", other),
        }
        assert_eq!(interceptor.blocked_count(), 1);
    }

    #[test]
    fn test_blocked_script_and_stylesheet_get_empty_bodies() {
        let (interceptor, _) = interceptor();

        let script = InterceptedRequest::new(
            "3",
            "https://px.ads.shop.com/tag.js",
            "GET",
            ResourceType::Script,
        );
        assert_eq!(
            interceptor.on_request(&script),
            InterceptDecision::Fulfill(SyntheticResponse {
                status: 200,
                content_type: "application/javascript".to_string(),
                body: Vec::new(),
            })
        );

        let style = InterceptedRequest::new(
            "4",
            "https://px.ads.shop.com/ads.css",
            "GET",
            ResourceType::Stylesheet,
        );
        match interceptor.on_request(&style) {
            InterceptDecision::Fulfill(response) => {
                assert_eq!(response.content_type, "text/css");
                assert!(response.body.is_empty());
            }
            other => panic!("expected fulfill, got {:?}", other),
        }
    }

    #[test]
    fn test_blocked_other_types_abort() {
        let (interceptor, observer) = interceptor();
        for (i, resource_type) in [
            ResourceType::Xhr,
            ResourceType::Fetch,
            ResourceType::Font,
            ResourceType::Media,
            ResourceType::Document,
            ResourceType::Other,
        ]
        .into_iter()
        .enumerate()
        {
            let request = InterceptedRequest::new(
                i.to_string(),
                "https://doubleclick.net/collect",
                "POST",
                resource_type,
            );
            assert_eq!(interceptor.on_request(&request), InterceptDecision::Abort);
        }

        assert_eq!(interceptor.blocked_count(), 6);
        assert!(observer
            .reports
            .lock()
            .iter()
            .all(|r| !r.allowed && r.outcome == DecisionOutcome::Aborted));
    }

    #[test]
    fn test_unparseable_url_aborts() {
        let (interceptor, observer) = interceptor();
        // Even an image is aborted, not fulfilled, when the domain is unknown
        let request = InterceptedRequest::new("5", "not a url", "GET", ResourceType::Image);

        assert_eq!(interceptor.on_request(&request), InterceptDecision::Abort);
        let reports = observer.reports.lock();
        assert_eq!(reports[0].domain, UNKNOWN_DOMAIN);
        assert!(!reports[0].allowed);
    }

    #[test]
    fn test_without_observer() {
        let rules = Arc::new(build_rules(&RuleFlags::new(vec!["shop.com".to_string()])).unwrap());
        let interceptor = Interceptor::new(rules);
        let request = InterceptedRequest::new("6", "https://shop.com/", "GET", ResourceType::Document);
        assert_eq!(interceptor.on_request(&request), InterceptDecision::Continue);
        assert_eq!(interceptor.allowed_count(), 1);
    }
}
