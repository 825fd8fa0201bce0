//! Snapshot analysis

use std::cmp::Reverse;
use tracing::debug;
use traffic_types::{bytes_to_mb, now_millis, Result, TrafficError, TrafficSnapshot};

use crate::recommendations::{recommend, AnalysisContext};
use crate::types::{
    AnalysisSummary, AnalyzerConfig, DomainUsage, LargeResource, ProtocolUsage, ResourceTypeUsage,
};

/// Turns a collection window into an [`AnalysisSummary`]
///
/// The analyzer holds no state besides its thresholds: the same snapshot
/// always produces the same summary, apart from the `timestamp` field.
#[derive(Debug, Clone, Default)]
pub struct TrafficAnalyzer {
    config: AnalyzerConfig,
}

impl TrafficAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Analyze a snapshot
    ///
    /// Fails with [`TrafficError::InvalidSnapshot`] when the snapshot's
    /// aggregates contradict each other.
    pub fn analyze(&self, snapshot: &TrafficSnapshot) -> Result<AnalysisSummary> {
        validate(snapshot)?;

        let top_domains = self.top_domains(snapshot);
        let resource_types = resource_types(snapshot);
        let protocols = protocols(snapshot);
        let large_resources = self.large_resources(snapshot);

        let recommendations = recommend(&AnalysisContext {
            snapshot,
            config: &self.config,
            large_resources: &large_resources,
        });

        debug!(
            "Analyzed {} requests ({} bytes): {} recommendations",
            snapshot.total_requests,
            snapshot.total_size_bytes,
            recommendations.len()
        );

        Ok(AnalysisSummary {
            timestamp: now_millis(),
            total_requests: snapshot.total_requests,
            total_size_bytes: snapshot.total_size_bytes,
            total_size_mb: bytes_to_mb(snapshot.total_size_bytes),
            top_domains,
            domains: snapshot.domains.clone(),
            resource_types,
            protocols,
            large_resources,
            cache_stats: snapshot.cache_stats.clone(),
            cache_hit_rate: snapshot.cache_stats.hit_rate(),
            interception: snapshot.interception.clone(),
            recommendations,
        })
    }

    fn top_domains(&self, snapshot: &TrafficSnapshot) -> Vec<DomainUsage> {
        let mut domains: Vec<DomainUsage> = snapshot
            .domains
            .iter()
            .map(|(domain, bucket)| DomainUsage {
                domain: domain.clone(),
                count: bucket.count,
                size_bytes: bucket.total_size_bytes,
                per_resource_type: bucket.per_resource_type.clone(),
            })
            .collect();

        // BTreeMap order breaks ties by name; the sort is stable
        domains.sort_by_key(|d| Reverse(d.size_bytes));
        domains.truncate(self.config.top_n);
        domains
    }

    fn large_resources(&self, snapshot: &TrafficSnapshot) -> Vec<LargeResource> {
        let mut large: Vec<LargeResource> = snapshot
            .records
            .iter()
            .filter(|r| {
                r.is_finalized()
                    && !r.was_blocked
                    && r.size_bytes > self.config.large_resource_threshold_bytes
            })
            .map(|r| LargeResource {
                url: r.url.clone(),
                domain: r.domain.clone(),
                resource_type: r.resource_type,
                size_bytes: r.size_bytes,
            })
            .collect();

        large.sort_by(|a, b| b.size_bytes.cmp(&a.size_bytes).then_with(|| a.url.cmp(&b.url)));
        large.truncate(self.config.top_n);
        large
    }
}

/// Analyze a snapshot with the default thresholds
pub fn analyze(snapshot: &TrafficSnapshot) -> Result<AnalysisSummary> {
    TrafficAnalyzer::new().analyze(snapshot)
}

fn resource_types(snapshot: &TrafficSnapshot) -> Vec<ResourceTypeUsage> {
    let total = snapshot.total_size_bytes;
    let mut usage: Vec<ResourceTypeUsage> = snapshot
        .resource_types
        .iter()
        .map(|(resource_type, bucket)| ResourceTypeUsage {
            resource_type: *resource_type,
            count: bucket.count,
            size_bytes: bucket.total_size_bytes,
            share_percent: percent(bucket.total_size_bytes, total),
        })
        .collect();

    usage.sort_by_key(|u| Reverse(u.size_bytes));
    usage
}

fn protocols(snapshot: &TrafficSnapshot) -> Vec<ProtocolUsage> {
    let total = snapshot.total_requests;
    let mut usage: Vec<ProtocolUsage> = snapshot
        .protocols
        .iter()
        .map(|(protocol, bucket)| ProtocolUsage {
            protocol: *protocol,
            count: bucket.count,
            percent: percent(bucket.count, total),
        })
        .collect();

    usage.sort_by_key(|u| Reverse(u.count));
    usage
}

fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

fn checked_sum(mut values: impl Iterator<Item = u64>, what: &str) -> Result<u64> {
    values
        .try_fold(0u64, |acc, value| acc.checked_add(value))
        .ok_or_else(|| TrafficError::InvalidSnapshot(format!("{} overflow u64", what)))
}

fn validate(snapshot: &TrafficSnapshot) -> Result<()> {
    let domain_size = checked_sum(
        snapshot.domains.values().map(|b| b.total_size_bytes),
        "domain sizes",
    )?;
    if domain_size != snapshot.total_size_bytes {
        return Err(TrafficError::InvalidSnapshot(format!(
            "domain sizes sum to {} but window total is {}",
            domain_size, snapshot.total_size_bytes
        )));
    }

    let domain_count = checked_sum(snapshot.domains.values().map(|b| b.count), "domain counts")?;
    if domain_count != snapshot.total_requests {
        return Err(TrafficError::InvalidSnapshot(format!(
            "domain counts sum to {} but window has {} requests",
            domain_count, snapshot.total_requests
        )));
    }

    let stats = &snapshot.cache_stats;
    if !stats.is_consistent() {
        return Err(TrafficError::InvalidSnapshot(format!(
            "inconsistent cache stats: total {}, cached {}, network {}",
            stats.total, stats.from_cache, stats.from_network
        )));
    }

    if stats.total != snapshot.total_requests {
        return Err(TrafficError::InvalidSnapshot(format!(
            "cache stats cover {} requests but window has {}",
            stats.total, snapshot.total_requests
        )));
    }

    Ok(())
}
