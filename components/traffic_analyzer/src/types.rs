//! Analysis summary types and analyzer configuration

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use traffic_types::{
    AggregateBucket, CacheStats, InterceptionStats, Protocol, ResourceType, TypeTally,
    BYTES_PER_MB,
};

// ============================================================================
// Configuration
// ============================================================================

/// Thresholds used by the analyzer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalyzerConfig {
    /// Number of domains / large resources kept in the ranked lists
    pub top_n: usize,
    /// Resources strictly larger than this are "large" (bytes)
    pub large_resource_threshold_bytes: u64,
    /// Domain-name substrings that mark ad and tracking hosts
    pub ad_domain_markers: Vec<String>,
    /// Image share of total size above which images are flagged (percent)
    pub image_share_threshold_percent: f64,
    /// Font request count above which fonts are flagged
    pub font_count_threshold: u64,
    /// Overall cache hit rate below which caching is flagged (percent)
    pub cache_hit_threshold_percent: f64,
    /// Minimum requests of one type before its cache rate is judged
    pub type_cache_min_requests: u64,
    /// Per-type cache hit rate below which the type is flagged (percent)
    pub type_cache_hit_threshold_percent: f64,
    /// Examples listed in the large-resource recommendation
    pub example_limit: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            top_n: 10,
            large_resource_threshold_bytes: BYTES_PER_MB,
            ad_domain_markers: default_ad_domain_markers(),
            image_share_threshold_percent: 30.0,
            font_count_threshold: 5,
            cache_hit_threshold_percent: 30.0,
            type_cache_min_requests: 10,
            type_cache_hit_threshold_percent: 20.0,
            example_limit: 3,
        }
    }
}

/// Ad and tracking domain markers
pub fn default_ad_domain_markers() -> Vec<String> {
    [
        "doubleclick",
        "googlesyndication",
        "googleadservices",
        "google-analytics",
        "googletagmanager",
        "facebook",
        "criteo",
        "adnxs",
        "amazon-adsystem",
        "taboola",
        "outbrain",
        "scorecardresearch",
        "hotjar",
        "adsystem",
        "tracking",
    ]
    .iter()
    .map(|m| m.to_string())
    .collect()
}

// ============================================================================
// Recommendations
// ============================================================================

/// Recommendation priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::High => write!(f, "HIGH"),
            Self::Medium => write!(f, "MEDIUM"),
            Self::Low => write!(f, "LOW"),
        }
    }
}

/// What a recommendation is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecommendationCategory {
    ImageOptimization,
    AdBlocking,
    LargeResources,
    Fonts,
    Protocol,
    Caching,
    TypeCaching,
}

/// One optimization recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub priority: Priority,
    pub category: RecommendationCategory,
    pub message: String,
    /// Bytes that could be saved
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub saving_potential: Option<u64>,
    /// Estimated reduction of network transfer (percent)
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub estimated_reduction_percent: Option<f64>,
    /// Domains the recommendation refers to
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub domains: Vec<String>,
    /// Example URLs or resource types
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub examples: Vec<String>,
}

impl Recommendation {
    pub fn new(
        priority: Priority,
        category: RecommendationCategory,
        message: impl Into<String>,
    ) -> Self {
        Self {
            priority,
            category,
            message: message.into(),
            saving_potential: None,
            estimated_reduction_percent: None,
            domains: Vec::new(),
            examples: Vec::new(),
        }
    }

    pub fn with_saving_potential(mut self, bytes: u64) -> Self {
        self.saving_potential = Some(bytes);
        self
    }

    pub fn with_reduction_percent(mut self, percent: f64) -> Self {
        self.estimated_reduction_percent = Some(percent);
        self
    }

    pub fn with_domains(mut self, domains: Vec<String>) -> Self {
        self.domains = domains;
        self
    }

    pub fn with_examples(mut self, examples: Vec<String>) -> Self {
        self.examples = examples;
        self
    }
}

// ============================================================================
// Summary
// ============================================================================

/// Traffic of one domain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainUsage {
    pub domain: String,
    pub count: u64,
    pub size_bytes: u64,
    pub per_resource_type: BTreeMap<ResourceType, TypeTally>,
}

/// Traffic of one resource type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceTypeUsage {
    pub resource_type: ResourceType,
    pub count: u64,
    pub size_bytes: u64,
    /// Share of the window's total size (percent)
    pub share_percent: f64,
}

/// Request share of one protocol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolUsage {
    pub protocol: Protocol,
    pub count: u64,
    /// Share of the window's request count (percent)
    pub percent: f64,
}

/// A resource above the large-resource threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LargeResource {
    pub url: String,
    pub domain: String,
    pub resource_type: ResourceType,
    pub size_bytes: u64,
}

/// Result of analyzing one collection window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSummary {
    pub timestamp: f64,
    pub total_requests: u64,
    pub total_size_bytes: u64,
    pub total_size_mb: f64,
    /// Largest domains, descending by size
    pub top_domains: Vec<DomainUsage>,
    /// Every domain of the window
    pub domains: BTreeMap<String, AggregateBucket>,
    /// Resource types, descending by size
    pub resource_types: Vec<ResourceTypeUsage>,
    /// Protocols, descending by request count
    pub protocols: Vec<ProtocolUsage>,
    /// Largest resources above the threshold, descending
    pub large_resources: Vec<LargeResource>,
    pub cache_stats: CacheStats,
    /// Overall cache hit rate (percent)
    pub cache_hit_rate: f64,
    pub interception: InterceptionStats,
    pub recommendations: Vec<Recommendation>,
}

impl AnalysisSummary {
    /// Usage entry of one resource type, if present
    pub fn resource_type(&self, resource_type: ResourceType) -> Option<&ResourceTypeUsage> {
        self.resource_types
            .iter()
            .find(|usage| usage.resource_type == resource_type)
    }

    /// Recommendations of one category
    pub fn recommendations_for(
        &self,
        category: RecommendationCategory,
    ) -> impl Iterator<Item = &Recommendation> {
        self.recommendations
            .iter()
            .filter(move |r| r.category == category)
    }
}
