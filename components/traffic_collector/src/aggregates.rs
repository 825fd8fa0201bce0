//! Window aggregates, mutated only by the finalize step

use std::collections::BTreeMap;
use traffic_types::{AggregateBucket, CacheStats, Protocol, RequestRecord, ResourceType};

/// Running totals over finalized records
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregates {
    pub domains: BTreeMap<String, AggregateBucket>,
    pub resource_types: BTreeMap<ResourceType, AggregateBucket>,
    pub protocols: BTreeMap<Protocol, AggregateBucket>,
    pub cache_stats: CacheStats,
    pub total_requests: u64,
    pub total_size_bytes: u64,
}

impl Aggregates {
    /// Fold one finalized record into every aggregate
    pub fn apply(&mut self, record: &RequestRecord) {
        let size = record.size_bytes;
        let resource_type = record.resource_type;

        self.domains
            .entry(record.domain.clone())
            .or_default()
            .add(resource_type, size);
        self.resource_types
            .entry(resource_type)
            .or_default()
            .add(resource_type, size);
        self.protocols
            .entry(record.protocol)
            .or_default()
            .add(resource_type, size);
        self.cache_stats.record(resource_type, record.cache_state);

        self.total_requests += 1;
        self.total_size_bytes += size;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use traffic_types::CacheState;

    fn record(url: &str, resource_type: ResourceType, size: u64, cache: CacheState) -> RequestRecord {
        let mut record = RequestRecord::new("id", url, "GET", resource_type);
        record.size_bytes = size;
        record.cache_state = cache;
        record.protocol = Protocol::Http2;
        record
    }

    #[test]
    fn test_apply_keeps_invariants() {
        let mut aggregates = Aggregates::default();
        aggregates.apply(&record("https://a.com/1.png", ResourceType::Image, 100, CacheState::Network));
        aggregates.apply(&record("https://a.com/2.js", ResourceType::Script, 40, CacheState::Memory));
        aggregates.apply(&record("https://b.com/3.css", ResourceType::Stylesheet, 10, CacheState::Disk));
        aggregates.apply(&record("bad url", ResourceType::Other, 5, CacheState::Network));

        assert_eq!(aggregates.total_requests, 4);
        assert_eq!(aggregates.total_size_bytes, 155);

        let domain_sum: u64 = aggregates.domains.values().map(|b| b.total_size_bytes).sum();
        assert_eq!(domain_sum, aggregates.total_size_bytes);
        for bucket in aggregates.domains.values() {
            assert_eq!(bucket.per_type_size(), bucket.total_size_bytes);
        }

        assert_eq!(aggregates.domains["unknown"].total_size_bytes, 5);
        assert_eq!(aggregates.domains["a.com"].count, 2);
        assert_eq!(aggregates.resource_types[&ResourceType::Image].total_size_bytes, 100);
        assert_eq!(aggregates.protocols[&Protocol::Http2].count, 4);
        assert_eq!(aggregates.cache_stats.from_cache, 2);
        assert!(aggregates.cache_stats.is_consistent());
    }
}
