// Request records and streaming aggregates

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::interception::InterceptionStats;

/// HTTP Headers map type
pub type HttpHeaders = HashMap<String, String>;

/// Resource type declared by the page for a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Document,
    Xhr,
    Fetch,
    Image,
    Script,
    Stylesheet,
    Font,
    Media,
    Other,
}

impl ResourceType {
    /// Every resource type, in declaration order
    pub const ALL: [ResourceType; 9] = [
        ResourceType::Document,
        ResourceType::Xhr,
        ResourceType::Fetch,
        ResourceType::Image,
        ResourceType::Script,
        ResourceType::Stylesheet,
        ResourceType::Font,
        ResourceType::Media,
        ResourceType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Document => "document",
            ResourceType::Xhr => "xhr",
            ResourceType::Fetch => "fetch",
            ResourceType::Image => "image",
            ResourceType::Script => "script",
            ResourceType::Stylesheet => "stylesheet",
            ResourceType::Font => "font",
            ResourceType::Media => "media",
            ResourceType::Other => "other",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a response was served from
///
/// Mutually exclusive per request. When several signals arrive for the same
/// request the one with the highest precedence wins:
/// memory > disk > service-worker > prefetch > network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum CacheState {
    #[default]
    Network,
    Memory,
    Disk,
    ServiceWorker,
    Prefetch,
}

impl CacheState {
    /// Tie-break rank, higher wins
    pub fn precedence(&self) -> u8 {
        match self {
            CacheState::Memory => 4,
            CacheState::Disk => 3,
            CacheState::ServiceWorker => 2,
            CacheState::Prefetch => 1,
            CacheState::Network => 0,
        }
    }

    /// Combine two observed signals, keeping the highest-precedence tier
    ///
    /// Commutative and idempotent, so signals can be folded in any arrival order.
    pub fn merge(self, other: CacheState) -> CacheState {
        if other.precedence() > self.precedence() {
            other
        } else {
            self
        }
    }

    /// Whether the response avoided the network
    pub fn is_cached(&self) -> bool {
        !matches!(self, CacheState::Network)
    }
}

/// HTTP protocol version, inferred from response metadata
///
/// This is a best-effort heuristic and is not authoritative.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub enum Protocol {
    #[serde(rename = "HTTP/1.1")]
    Http1,
    #[serde(rename = "HTTP/2")]
    Http2,
    #[serde(rename = "HTTP/3")]
    Http3,
    #[default]
    #[serde(rename = "unknown")]
    Unknown,
}

impl Protocol {
    /// Map a protocol hint such as "h2", "http/1.1" or "h3-29"
    pub fn from_hint(hint: &str) -> Option<Self> {
        let hint = hint.trim().to_ascii_lowercase();
        if hint.starts_with("h3") || hint.starts_with("http/3") || hint == "quic" {
            Some(Protocol::Http3)
        } else if hint == "h2" || hint == "h2c" || hint.starts_with("http/2") {
            Some(Protocol::Http2)
        } else if hint.starts_with("http/1") {
            Some(Protocol::Http1)
        } else {
            None
        }
    }

    /// Infer the protocol of a response
    ///
    /// An explicit hint from the host wins. Otherwise a pseudo-header such as
    /// `:status` marks HTTP/2, an `Alt-Svc` header advertising h3 marks HTTP/3
    /// and anything else is reported as HTTP/1.1.
    pub fn infer(hint: Option<&str>, headers: &HttpHeaders) -> Self {
        if let Some(protocol) = hint.and_then(Protocol::from_hint) {
            return protocol;
        }

        if headers.keys().any(|name| name.starts_with(':')) {
            return Protocol::Http2;
        }

        let advertises_h3 = headers.iter().any(|(name, value)| {
            name.eq_ignore_ascii_case("alt-svc") && value.to_ascii_lowercase().contains("h3")
        });
        if advertises_h3 {
            return Protocol::Http3;
        }

        Protocol::Http1
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Http1 => "HTTP/1.1",
            Protocol::Http2 => "HTTP/2",
            Protocol::Http3 => "HTTP/3",
            Protocol::Unknown => "unknown",
        }
    }
}

/// One network request observed during a window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestRecord {
    /// Correlation key, stable across all lifecycle notifications
    pub id: String,
    pub url: String,
    /// Hostname derived from the URL, "unknown" when unparseable
    pub domain: String,
    pub method: String,
    pub resource_type: ResourceType,
    pub protocol: Protocol,
    pub status: Option<u16>,
    /// Encoded transfer size, authoritative once loading finished
    pub size_bytes: u64,
    pub cache_state: CacheState,
    /// Set only by the interceptor's own decision
    pub was_blocked: bool,
    /// First sighting (ms since epoch)
    pub observed_at: f64,
    /// When the record entered the aggregates; `None` for partial records
    #[serde(default)]
    pub finalized_at: Option<f64>,
}

impl RequestRecord {
    /// Create a record on first sighting
    pub fn new(
        id: impl Into<String>,
        url: impl Into<String>,
        method: impl Into<String>,
        resource_type: ResourceType,
    ) -> Self {
        let url = url.into();
        let domain = crate::domain::domain_or_unknown(&url);

        Self {
            id: id.into(),
            url,
            domain,
            method: method.into(),
            resource_type,
            protocol: Protocol::Unknown,
            status: None,
            size_bytes: 0,
            cache_state: CacheState::Network,
            was_blocked: false,
            observed_at: crate::now_millis(),
            finalized_at: None,
        }
    }

    /// Replace the URL and re-derive the domain
    pub fn set_url(&mut self, url: impl Into<String>) {
        self.url = url.into();
        self.domain = crate::domain::domain_or_unknown(&self.url);
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized_at.is_some()
    }
}

/// Per-resource-type tally inside a bucket
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeTally {
    pub count: u64,
    pub size: u64,
}

/// Running totals keyed by domain, resource type or protocol
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateBucket {
    pub count: u64,
    pub total_size_bytes: u64,
    #[serde(default)]
    pub per_resource_type: BTreeMap<ResourceType, TypeTally>,
}

impl AggregateBucket {
    /// Account one finalized request
    pub fn add(&mut self, resource_type: ResourceType, size: u64) {
        self.count += 1;
        self.total_size_bytes += size;
        let tally = self.per_resource_type.entry(resource_type).or_default();
        tally.count += 1;
        tally.size += size;
    }

    /// Sum of the per-type sizes; equals `total_size_bytes` for a consistent bucket
    pub fn per_type_size(&self) -> u64 {
        self.per_resource_type.values().map(|t| t.size).sum()
    }
}

/// Cache outcome per resource type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeCacheTally {
    pub total: u64,
    pub cached: u64,
}

impl TypeCacheTally {
    /// Hit rate in percent, 0 when nothing was seen
    pub fn hit_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.cached as f64 / self.total as f64 * 100.0
        }
    }
}

/// Cache statistics for a window
///
/// `from_cache` includes prefetch hits, which are not broken out further, so
/// `from_cache >= from_memory + from_disk + from_service_worker` and
/// `total == from_cache + from_network`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub total: u64,
    pub from_cache: u64,
    pub from_memory: u64,
    pub from_disk: u64,
    pub from_service_worker: u64,
    pub from_network: u64,
    #[serde(default)]
    pub by_type: BTreeMap<ResourceType, TypeCacheTally>,
}

impl CacheStats {
    /// Account one finalized request
    pub fn record(&mut self, resource_type: ResourceType, state: CacheState) {
        self.total += 1;
        let per_type = self.by_type.entry(resource_type).or_default();
        per_type.total += 1;

        if state.is_cached() {
            self.from_cache += 1;
            per_type.cached += 1;
        } else {
            self.from_network += 1;
        }

        match state {
            CacheState::Memory => self.from_memory += 1,
            CacheState::Disk => self.from_disk += 1,
            CacheState::ServiceWorker => self.from_service_worker += 1,
            CacheState::Prefetch | CacheState::Network => {}
        }
    }

    /// Overall cache hit rate in percent
    pub fn hit_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.from_cache as f64 / self.total as f64 * 100.0
        }
    }

    /// Check the counter invariants
    ///
    /// Counters that overflow when summed are inconsistent.
    pub fn is_consistent(&self) -> bool {
        let tiers = self
            .from_memory
            .checked_add(self.from_disk)
            .and_then(|sum| sum.checked_add(self.from_service_worker));

        self.from_cache.checked_add(self.from_network) == Some(self.total)
            && tiers.is_some_and(|sum| self.from_cache >= sum)
    }
}

/// Point-in-time view of a collection window
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficSnapshot {
    /// Every record seen in the window, finalized or partial, in observation order
    pub records: Vec<RequestRecord>,
    pub domains: BTreeMap<String, AggregateBucket>,
    pub resource_types: BTreeMap<ResourceType, AggregateBucket>,
    pub protocols: BTreeMap<Protocol, AggregateBucket>,
    pub cache_stats: CacheStats,
    #[serde(default)]
    pub interception: InterceptionStats,
    /// Number of finalized requests the interceptor let through
    pub total_requests: u64,
    /// Sum of their sizes
    pub total_size_bytes: u64,
    pub captured_at: f64,
}

impl TrafficSnapshot {
    /// Records still waiting for a terminal signal
    pub fn partial_records(&self) -> impl Iterator<Item = &RequestRecord> {
        self.records.iter().filter(|r| !r.is_finalized())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_type_serialization() {
        let json = serde_json::to_string(&ResourceType::Stylesheet).unwrap();
        assert_eq!(json, "\"stylesheet\"");
    }

    #[test]
    fn test_cache_state_merge_all_orders() {
        let tiers = [
            CacheState::Network,
            CacheState::Prefetch,
            CacheState::ServiceWorker,
            CacheState::Disk,
            CacheState::Memory,
        ];

        for a in tiers {
            for b in tiers {
                assert_eq!(a.merge(b), b.merge(a));
                let expected = if a.precedence() >= b.precedence() { a } else { b };
                assert_eq!(a.merge(b), expected);
            }
        }

        assert_eq!(
            CacheState::Disk.merge(CacheState::Memory),
            CacheState::Memory
        );
        assert_eq!(
            CacheState::Prefetch.merge(CacheState::ServiceWorker),
            CacheState::ServiceWorker
        );
    }

    #[test]
    fn test_cache_state_serialization() {
        let json = serde_json::to_string(&CacheState::ServiceWorker).unwrap();
        assert_eq!(json, "\"service-worker\"");
    }

    #[test]
    fn test_protocol_infer_from_hint() {
        let headers = HttpHeaders::new();
        assert_eq!(Protocol::infer(Some("h2"), &headers), Protocol::Http2);
        assert_eq!(Protocol::infer(Some("h3-29"), &headers), Protocol::Http3);
        assert_eq!(Protocol::infer(Some("http/1.1"), &headers), Protocol::Http1);
        assert_eq!(Protocol::infer(None, &headers), Protocol::Http1);
    }

    #[test]
    fn test_protocol_infer_from_headers() {
        let mut headers = HttpHeaders::new();
        headers.insert(":status".to_string(), "200".to_string());
        assert_eq!(Protocol::infer(None, &headers), Protocol::Http2);

        let mut headers = HttpHeaders::new();
        headers.insert("Alt-Svc".to_string(), "h3=\":443\"; ma=86400".to_string());
        assert_eq!(Protocol::infer(None, &headers), Protocol::Http3);

        // Unknown hint falls through to headers
        assert_eq!(Protocol::infer(Some("spdy"), &headers), Protocol::Http3);
    }

    #[test]
    fn test_protocol_serialization() {
        assert_eq!(serde_json::to_string(&Protocol::Http2).unwrap(), "\"HTTP/2\"");
    }

    #[test]
    fn test_record_new_derives_domain() {
        let record = RequestRecord::new("1", "https://img.shop.com/a.png", "GET", ResourceType::Image);
        assert_eq!(record.domain, "img.shop.com");
        assert_eq!(record.size_bytes, 0);
        assert_eq!(record.cache_state, CacheState::Network);
        assert!(!record.is_finalized());

        let record = RequestRecord::new("2", "garbage", "GET", ResourceType::Other);
        assert_eq!(record.domain, "unknown");
    }

    #[test]
    fn test_bucket_add() {
        let mut bucket = AggregateBucket::default();
        bucket.add(ResourceType::Image, 100);
        bucket.add(ResourceType::Image, 50);
        bucket.add(ResourceType::Script, 25);

        assert_eq!(bucket.count, 3);
        assert_eq!(bucket.total_size_bytes, 175);
        assert_eq!(bucket.per_type_size(), bucket.total_size_bytes);
        assert_eq!(
            bucket.per_resource_type[&ResourceType::Image],
            TypeTally { count: 2, size: 150 }
        );
    }

    #[test]
    fn test_cache_stats_record() {
        let mut stats = CacheStats::default();
        stats.record(ResourceType::Image, CacheState::Memory);
        stats.record(ResourceType::Image, CacheState::Network);
        stats.record(ResourceType::Script, CacheState::Disk);
        stats.record(ResourceType::Script, CacheState::Prefetch);
        stats.record(ResourceType::Font, CacheState::ServiceWorker);

        assert_eq!(stats.total, 5);
        assert_eq!(stats.from_cache, 4);
        assert_eq!(stats.from_network, 1);
        assert_eq!(stats.from_memory, 1);
        assert_eq!(stats.from_disk, 1);
        assert_eq!(stats.from_service_worker, 1);
        assert!(stats.is_consistent());
        assert_eq!(stats.hit_rate(), 80.0);
        assert_eq!(stats.by_type[&ResourceType::Image].hit_rate(), 50.0);
    }

    #[test]
    fn test_cache_stats_json_field_names() {
        let stats = CacheStats::default();
        let value = serde_json::to_value(&stats).unwrap();
        assert!(value.get("fromCache").is_some());
        assert!(value.get("fromServiceWorker").is_some());
        assert!(value.get("byType").is_some());
    }
}
