//! Integration tests for TrafficSession

use async_trait::async_trait;
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use rule_engine::{InterceptDecision, InterceptedRequest};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use traffic_collector::{CoarseResponse, NetworkEvent, TrafficPage};
use traffic_session::*;
use traffic_types::{CacheState, ResourceType, TrafficError};

struct MockPage {
    events: Mutex<Option<UnboundedReceiver<NetworkEvent>>>,
}

impl MockPage {
    fn new() -> (Self, UnboundedSender<NetworkEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                events: Mutex::new(Some(rx)),
            },
            tx,
        )
    }
}

#[async_trait]
impl TrafficPage for MockPage {
    async fn network_events(
        &self,
    ) -> traffic_types::Result<UnboundedReceiver<NetworkEvent>> {
        self.events
            .lock()
            .take()
            .ok_or_else(|| TrafficError::SubscriptionUnavailable("consumed".to_string()))
    }

    async fn coarse_responses(
        &self,
    ) -> traffic_types::Result<UnboundedReceiver<CoarseResponse>> {
        Err(TrafficError::SubscriptionUnavailable(
            "no response channel".to_string(),
        ))
    }
}

#[derive(Default)]
struct RecordingSink {
    reports: Mutex<Vec<SessionReport>>,
}

#[async_trait]
impl ReportSink for RecordingSink {
    async fn submit(&self, report: &SessionReport) -> Result<()> {
        self.reports.lock().push(report.clone());
        Ok(())
    }
}

struct FailingSink;

#[async_trait]
impl ReportSink for FailingSink {
    async fn submit(&self, _report: &SessionReport) -> Result<()> {
        Err(SessionError::Sink("collector endpoint down".to_string()))
    }
}

fn load(tx: &UnboundedSender<NetworkEvent>, id: &str, url: &str, rt: ResourceType, size: u64) {
    tx.send(NetworkEvent::RequestObserved {
        id: id.to_string(),
        url: url.to_string(),
        method: "GET".to_string(),
        resource_type: rt,
    })
    .unwrap();
    tx.send(NetworkEvent::LoadingFinished {
        id: id.to_string(),
        encoded_data_length: size,
    })
    .unwrap();
}

#[tokio::test]
async fn test_attach_collect_finish() {
    let session = TrafficSession::new(SessionConfig::default()).unwrap();
    let (page, tx) = MockPage::new();

    session.attach(&page).await.unwrap();
    assert!(session.is_attached());

    load(&tx, "1", "https://shop.example.com/", ResourceType::Document, 30_000);
    load(
        &tx,
        "2",
        "https://images.shopcdn.example.net/hero.webp",
        ResourceType::Image,
        90_000,
    );
    // arrives after the terminal event and is ignored
    tx.send(NetworkEvent::ServedFromCache {
        id: "2".to_string(),
        tier: CacheState::Memory,
    })
    .unwrap();
    drop(tx);

    session.wait_for_page_close().await;
    assert!(!session.is_attached());

    let sink = RecordingSink::default();
    let report = session.finish_and_submit(&sink).await.unwrap();

    assert_eq!(report.summary.total_requests, 2);
    assert_eq!(report.summary.total_size_bytes, 120_000);
    assert_eq!(report.summary.cache_stats.from_cache, 0);
    assert_eq!(sink.reports.lock().len(), 1);
    assert_eq!(sink.reports.lock()[0].session_id, session.id());
}

#[tokio::test]
async fn test_attach_twice_fails() {
    let session = TrafficSession::new(SessionConfig::default()).unwrap();
    let (page, _tx) = MockPage::new();
    session.attach(&page).await.unwrap();

    let (second, _tx2) = MockPage::new();
    assert!(matches!(
        session.attach(&second).await,
        Err(SessionError::AlreadyAttached)
    ));

    session.detach().unwrap();
    assert!(matches!(session.detach(), Err(SessionError::NotAttached)));
}

#[tokio::test]
async fn test_attach_without_channels() {
    let session = TrafficSession::new(SessionConfig::default()).unwrap();
    let (page, _tx) = MockPage::new();
    page.events.lock().take();

    let result = session.attach(&page).await;
    assert!(matches!(
        result,
        Err(SessionError::Traffic(TrafficError::SubscriptionUnavailable(_)))
    ));
}

#[tokio::test]
async fn test_blocked_requests_in_report() {
    let session = TrafficSession::new(SessionConfig::default()).unwrap();
    let interceptor = session.interceptor();

    let requests = [
        ("1", "https://shop.example.com/", ResourceType::Document),
        ("2", "https://ad.doubleclick.net/ad.js", ResourceType::Script),
        ("3", "https://recs.shop.example.com/widget", ResourceType::Xhr),
    ];
    let decisions: Vec<InterceptDecision> = requests
        .iter()
        .map(|(id, url, rt)| interceptor.on_request(&InterceptedRequest::new(*id, *url, "GET", *rt)))
        .collect();

    assert_eq!(decisions[0], InterceptDecision::Continue);
    assert!(matches!(decisions[1], InterceptDecision::Fulfill(_)));
    assert_eq!(decisions[2], InterceptDecision::Abort);

    let report = session.finish().await.unwrap();
    let interception = &report.summary.interception;
    assert_eq!(interception.allowed, 1);
    assert_eq!(interception.blocked, 2);
    assert_eq!(interception.fulfilled, 1);
    assert_eq!(interception.aborted, 1);

    let text = report.render();
    assert!(text.contains("Blocked:          2 of 3"));
}

#[tokio::test]
async fn test_blocked_requests_leave_cache_stats_alone() {
    let session = TrafficSession::new(SessionConfig::default()).unwrap();
    let interceptor = session.interceptor();

    let page = InterceptedRequest::new("1", "https://shop.example.com/", "GET", ResourceType::Document);
    assert_eq!(interceptor.on_request(&page), InterceptDecision::Continue);
    let collector = session.collector();
    collector.handle_event(NetworkEvent::RequestObserved {
        id: "1".to_string(),
        url: "https://shop.example.com/".to_string(),
        method: "GET".to_string(),
        resource_type: ResourceType::Document,
    });
    collector.handle_event(NetworkEvent::ServedFromCache {
        id: "1".to_string(),
        tier: CacheState::Memory,
    });
    collector.handle_event(NetworkEvent::LoadingFinished {
        id: "1".to_string(),
        encoded_data_length: 2048,
    });

    for (id, host) in [("2", "ad"), ("3", "securepubads.g"), ("4", "stats.g")] {
        let url = format!("https://{}.doubleclick.net/tag.js", host);
        let request = InterceptedRequest::new(id, url.as_str(), "GET", ResourceType::Script);
        assert_ne!(interceptor.on_request(&request), InterceptDecision::Continue);
    }

    let report = session.finish().await.unwrap();
    let summary = &report.summary;

    assert_eq!(summary.total_requests, 1);
    assert_eq!(summary.cache_stats.total, 1);
    assert_eq!(summary.cache_stats.from_cache, 1);
    assert_eq!(summary.cache_stats.from_network, 0);
    assert_eq!(summary.cache_hit_rate, 100.0);
    assert_eq!(summary.interception.blocked, 3);
    assert!(summary.recommendations.is_empty());
    assert_eq!(report.efficiency_score, 100);
}

#[tokio::test]
async fn test_json_file_sink() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reports").join("session.json");
    let sink = JsonFileSink::new(&path);

    let session = TrafficSession::new(SessionConfig::default()).unwrap();
    let collector = session.collector();
    collector.handle_event(NetworkEvent::RequestObserved {
        id: "1".to_string(),
        url: "https://shop.example.com/".to_string(),
        method: "GET".to_string(),
        resource_type: ResourceType::Document,
    });
    collector.handle_event(NetworkEvent::LoadingFinished {
        id: "1".to_string(),
        encoded_data_length: 4096,
    });

    let report = session.finish_and_submit(&sink).await.unwrap();

    let written = tokio::fs::read_to_string(&path).await.unwrap();
    let value: serde_json::Value = serde_json::from_str(&written).unwrap();
    assert_eq!(value["sessionId"], report.session_id.to_string());
    assert_eq!(value["summary"]["totalSizeBytes"], 4096);
    assert_eq!(value["efficiencyScore"], report.efficiency_score);

    let parsed: SessionReport = serde_json::from_str(&written).unwrap();
    assert_eq!(parsed.session_id, report.session_id);
    assert_eq!(parsed.summary.cache_stats, report.summary.cache_stats);
}

#[test]
fn test_sink_failure_propagates() {
    let session = TrafficSession::new(SessionConfig::default()).unwrap();
    let result = tokio_test::block_on(session.finish_and_submit(&FailingSink));
    assert!(matches!(result, Err(SessionError::Sink(_))));
}

#[tokio::test]
async fn test_log_sink() {
    let session = TrafficSession::new(SessionConfig::default()).unwrap();
    let report = session.finish_and_submit(&LogSink).await.unwrap();
    assert_eq!(report.summary.total_requests, 0);
    assert_eq!(report.efficiency_score, 90);
}
