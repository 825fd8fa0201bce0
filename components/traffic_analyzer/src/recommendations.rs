//! Recommendation rules
//!
//! Each rule is a pure predicate over the analysis context producing at most
//! one recommendation. Rules run in declaration order and their output keeps
//! that order.

use std::collections::BTreeMap;
use traffic_types::{bytes_to_mb, Protocol, ResourceType, TrafficSnapshot};

use crate::types::{
    AnalyzerConfig, LargeResource, Priority, Recommendation, RecommendationCategory,
};

/// Inputs shared by every rule
pub(crate) struct AnalysisContext<'a> {
    pub snapshot: &'a TrafficSnapshot,
    pub config: &'a AnalyzerConfig,
    pub large_resources: &'a [LargeResource],
}

type RecommendationRule = fn(&AnalysisContext<'_>) -> Option<Recommendation>;

const RULES: [RecommendationRule; 7] = [
    image_share,
    ad_domains,
    large_resources,
    font_count,
    protocol_adoption,
    cache_hit_rate,
    type_cache_hit_rate,
];

/// Run every rule in order
pub(crate) fn recommend(ctx: &AnalysisContext<'_>) -> Vec<Recommendation> {
    RULES.iter().filter_map(|rule| rule(ctx)).collect()
}

fn image_share(ctx: &AnalysisContext<'_>) -> Option<Recommendation> {
    let total = ctx.snapshot.total_size_bytes;
    if total == 0 {
        return None;
    }

    let image_bytes = ctx
        .snapshot
        .resource_types
        .get(&ResourceType::Image)
        .map(|bucket| bucket.total_size_bytes)?;
    let share = image_bytes as f64 / total as f64 * 100.0;
    if share <= ctx.config.image_share_threshold_percent {
        return None;
    }

    Some(
        Recommendation::new(
            Priority::High,
            RecommendationCategory::ImageOptimization,
            format!(
                "Images account for {:.1}% of transferred bytes ({:.2} MB); serve smaller formats or block non-essential image hosts",
                share,
                bytes_to_mb(image_bytes)
            ),
        )
        .with_saving_potential(image_bytes),
    )
}

fn ad_domains(ctx: &AnalysisContext<'_>) -> Option<Recommendation> {
    let matched: Vec<(&String, u64)> = ctx
        .snapshot
        .domains
        .iter()
        .filter(|(domain, _)| {
            ctx.config
                .ad_domain_markers
                .iter()
                .any(|marker| domain.contains(marker.as_str()))
        })
        .map(|(domain, bucket)| (domain, bucket.total_size_bytes))
        .collect();

    if matched.is_empty() {
        return None;
    }

    let total: u64 = matched.iter().map(|(_, size)| size).sum();
    let domains: Vec<String> = matched.iter().map(|(domain, _)| (*domain).clone()).collect();

    Some(
        Recommendation::new(
            Priority::Medium,
            RecommendationCategory::AdBlocking,
            format!(
                "{} ad/tracking domains transferred {:.2} MB: {}",
                domains.len(),
                bytes_to_mb(total),
                domains.join(", ")
            ),
        )
        .with_saving_potential(total)
        .with_domains(domains),
    )
}

fn large_resources(ctx: &AnalysisContext<'_>) -> Option<Recommendation> {
    if ctx.large_resources.is_empty() {
        return None;
    }

    let examples: Vec<String> = ctx
        .large_resources
        .iter()
        .take(ctx.config.example_limit)
        .map(|r| format!("{} ({:.2} MB)", r.url, bytes_to_mb(r.size_bytes)))
        .collect();

    Some(
        Recommendation::new(
            Priority::High,
            RecommendationCategory::LargeResources,
            format!(
                "{} resources exceed {:.1} MB; split, compress or lazy-load them",
                ctx.large_resources.len(),
                bytes_to_mb(ctx.config.large_resource_threshold_bytes)
            ),
        )
        .with_examples(examples),
    )
}

fn font_count(ctx: &AnalysisContext<'_>) -> Option<Recommendation> {
    let fonts = ctx
        .snapshot
        .resource_types
        .get(&ResourceType::Font)
        .map(|bucket| bucket.count)
        .unwrap_or(0);
    if fonts <= ctx.config.font_count_threshold {
        return None;
    }

    Some(Recommendation::new(
        Priority::Low,
        RecommendationCategory::Fonts,
        format!(
            "{} font files loaded; subset fonts or fall back to system fonts",
            fonts
        ),
    ))
}

/// Heuristic: protocol tags are inferred, not verified
fn protocol_adoption(ctx: &AnalysisContext<'_>) -> Option<Recommendation> {
    let mut by_domain: BTreeMap<&str, bool> = BTreeMap::new();
    for record in &ctx.snapshot.records {
        if !record.is_finalized() || record.was_blocked || record.protocol == Protocol::Unknown {
            continue;
        }
        let uses_h2 = by_domain.entry(record.domain.as_str()).or_insert(false);
        *uses_h2 |= record.protocol == Protocol::Http2;
    }

    let observed = by_domain.len();
    let h2 = by_domain.values().filter(|uses_h2| **uses_h2).count();
    if observed == 0 || h2 * 2 >= observed {
        return None;
    }

    let legacy: Vec<String> = by_domain
        .iter()
        .filter(|(_, uses_h2)| !**uses_h2)
        .map(|(domain, _)| domain.to_string())
        .collect();

    Some(
        Recommendation::new(
            Priority::Low,
            RecommendationCategory::Protocol,
            format!(
                "Only {} of {} domains appear to use HTTP/2; multiplexing could cut connection overhead",
                h2, observed
            ),
        )
        .with_domains(legacy),
    )
}

fn cache_hit_rate(ctx: &AnalysisContext<'_>) -> Option<Recommendation> {
    let stats = &ctx.snapshot.cache_stats;
    if stats.total == 0 {
        return None;
    }

    let hit_rate = stats.hit_rate();
    if hit_rate >= ctx.config.cache_hit_threshold_percent {
        return None;
    }

    let reduction = (1.0 - hit_rate / 100.0) * 0.7 * 100.0;
    Some(
        Recommendation::new(
            Priority::High,
            RecommendationCategory::Caching,
            format!(
                "Cache hit rate is {:.1}%; reusing the browser profile and caching static assets could cut network transfer by about {:.0}%",
                hit_rate, reduction
            ),
        )
        .with_reduction_percent(reduction),
    )
}

fn type_cache_hit_rate(ctx: &AnalysisContext<'_>) -> Option<Recommendation> {
    let poor: Vec<String> = ctx
        .snapshot
        .cache_stats
        .by_type
        .iter()
        .filter(|(_, tally)| {
            tally.total >= ctx.config.type_cache_min_requests
                && tally.hit_rate() < ctx.config.type_cache_hit_threshold_percent
        })
        .map(|(resource_type, tally)| format!("{} ({:.1}%)", resource_type, tally.hit_rate()))
        .collect();

    if poor.is_empty() {
        return None;
    }

    Some(
        Recommendation::new(
            Priority::Medium,
            RecommendationCategory::TypeCaching,
            format!(
                "Low cache hit rate for frequently requested types: {}",
                poor.join(", ")
            ),
        )
        .with_examples(poor),
    )
}
