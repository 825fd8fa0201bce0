//! Configuration for traffic sessions

use rule_engine::{DomainFlag, RuleFlags};
use serde::{Deserialize, Serialize};
use std::path::Path;
use traffic_analyzer::{default_ad_domain_markers, AnalyzerConfig};
use traffic_types::{TrafficError, BYTES_PER_MB};

use crate::{Result, SessionError};

/// Configuration for a traffic session
///
/// Holds the first-party allow-set, the ordered per-domain switches and the
/// analyzer thresholds. Missing JSON fields fall back to the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionConfig {
    /// Domains eligible for allowance; everything else is blocked
    first_party_domains: Vec<String>,

    /// Ordered per-domain switches
    domain_flags: Vec<DomainFlag>,

    /// Entries kept in the ranked domain and large-resource lists
    top_n: usize,

    /// Resources strictly above this size are reported as large
    large_resource_threshold_bytes: u64,

    /// Domain-name substrings that mark ad and tracking hosts
    ad_domain_markers: Vec<String>,

    /// Font request count above which fonts are flagged
    font_count_threshold: u64,

    /// Page-weight budget the session report measures the window against
    target_page_weight_bytes: u64,
}

impl SessionConfig {
    /// Create a new builder for SessionConfig
    ///
    /// # Example
    ///
    /// ```
    /// use traffic_session::SessionConfig;
    ///
    /// let config = SessionConfig::builder()
    ///     .first_party_domain("news.example.org")
    ///     .block("*.ads.news.example.org")
    ///     .build();
    /// assert_eq!(config.domain_flags().len(), 1);
    /// ```
    pub fn builder() -> SessionConfigBuilder {
        SessionConfigBuilder::default()
    }

    /// Parse a JSON document and validate it
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: SessionConfig = serde_json::from_str(json).map_err(TrafficError::from)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Check the configuration before rules are compiled
    ///
    /// # Errors
    /// `InvalidConfiguration` for an empty first-party set, a blank entry or
    /// a switch pattern with more than one `*`.
    pub fn validate(&self) -> Result<()> {
        if self.first_party_domains.is_empty() {
            return Err(SessionError::InvalidConfiguration(
                "at least one first-party domain is required".to_string(),
            ));
        }

        if self.first_party_domains.iter().any(|d| d.trim().is_empty()) {
            return Err(SessionError::InvalidConfiguration(
                "first-party domains must not be blank".to_string(),
            ));
        }

        for flag in &self.domain_flags {
            let pattern = flag.pattern.trim();
            if pattern.is_empty() {
                return Err(SessionError::InvalidConfiguration(
                    "empty domain pattern".to_string(),
                ));
            }
            if pattern.matches('*').count() > 1 {
                return Err(SessionError::InvalidConfiguration(format!(
                    "pattern '{}' has more than one '*'",
                    pattern
                )));
            }
        }

        Ok(())
    }

    pub fn first_party_domains(&self) -> &[String] {
        &self.first_party_domains
    }

    pub fn domain_flags(&self) -> &[DomainFlag] {
        &self.domain_flags
    }

    pub fn top_n(&self) -> usize {
        self.top_n
    }

    pub fn large_resource_threshold_bytes(&self) -> u64 {
        self.large_resource_threshold_bytes
    }

    pub fn ad_domain_markers(&self) -> &[String] {
        &self.ad_domain_markers
    }

    pub fn font_count_threshold(&self) -> u64 {
        self.font_count_threshold
    }

    pub fn target_page_weight_bytes(&self) -> u64 {
        self.target_page_weight_bytes
    }

    /// Input for the rule builder
    pub fn rule_flags(&self) -> RuleFlags {
        RuleFlags {
            first_party_domains: self.first_party_domains.clone(),
            domain_flags: self.domain_flags.clone(),
        }
    }

    /// Analyzer thresholds derived from this configuration
    pub fn analyzer_config(&self) -> AnalyzerConfig {
        AnalyzerConfig {
            top_n: self.top_n,
            large_resource_threshold_bytes: self.large_resource_threshold_bytes,
            ad_domain_markers: self.ad_domain_markers.clone(),
            font_count_threshold: self.font_count_threshold,
            ..AnalyzerConfig::default()
        }
    }
}

impl Default for SessionConfig {
    /// Create a default configuration
    ///
    /// Default values:
    /// - first_party_domains: the shop.example.com family
    /// - domain_flags: image CDN and static asset CDN allowed, tracking front
    ///   and recommendation widget blocked
    /// - top_n: 10
    /// - large_resource_threshold_bytes: 1 MB
    /// - font_count_threshold: 5
    /// - target_page_weight_bytes: 500 KB
    fn default() -> Self {
        Self {
            first_party_domains: vec![
                "shop.example.com".to_string(),
                "shopcdn.example.net".to_string(),
            ],
            domain_flags: vec![
                DomainFlag::new("images.shopcdn.example.net", true),
                DomainFlag::new("*.static.shopcdn.example.net", true),
                DomainFlag::new("*.tracking.shop.example.com", false),
                DomainFlag::new("recs.shop.example.com", false),
            ],
            top_n: 10,
            large_resource_threshold_bytes: BYTES_PER_MB,
            ad_domain_markers: default_ad_domain_markers(),
            font_count_threshold: 5,
            target_page_weight_bytes: 500 * 1024,
        }
    }
}

/// Builder for SessionConfig
///
/// Unset options take their default values. Adding any first-party domain
/// or switch replaces the default list; the default switches are only kept
/// together with the default first-party domains.
#[derive(Debug, Clone, Default)]
pub struct SessionConfigBuilder {
    first_party_domains: Vec<String>,
    domain_flags: Vec<DomainFlag>,
    top_n: Option<usize>,
    large_resource_threshold_bytes: Option<u64>,
    ad_domain_markers: Vec<String>,
    font_count_threshold: Option<u64>,
    target_page_weight_bytes: Option<u64>,
}

impl SessionConfigBuilder {
    /// Add a first-party domain
    pub fn first_party_domain(mut self, domain: impl Into<String>) -> Self {
        self.first_party_domains.push(domain.into());
        self
    }

    /// Append a switch
    pub fn domain_flag(mut self, pattern: impl Into<String>, allowed: bool) -> Self {
        self.domain_flags.push(DomainFlag::new(pattern, allowed));
        self
    }

    /// Append an allowing switch
    pub fn allow(self, pattern: impl Into<String>) -> Self {
        self.domain_flag(pattern, true)
    }

    /// Append a blocking switch
    pub fn block(self, pattern: impl Into<String>) -> Self {
        self.domain_flag(pattern, false)
    }

    pub fn top_n(mut self, top_n: usize) -> Self {
        self.top_n = Some(top_n);
        self
    }

    pub fn large_resource_threshold_bytes(mut self, bytes: u64) -> Self {
        self.large_resource_threshold_bytes = Some(bytes);
        self
    }

    /// Add an ad/tracking domain marker
    pub fn ad_domain_marker(mut self, marker: impl Into<String>) -> Self {
        self.ad_domain_markers.push(marker.into());
        self
    }

    pub fn font_count_threshold(mut self, count: u64) -> Self {
        self.font_count_threshold = Some(count);
        self
    }

    pub fn target_page_weight_bytes(mut self, bytes: u64) -> Self {
        self.target_page_weight_bytes = Some(bytes);
        self
    }

    /// Build the SessionConfig
    ///
    /// Uses default values for any options not explicitly set.
    pub fn build(self) -> SessionConfig {
        let default = SessionConfig::default();

        let uses_default_family = self.first_party_domains.is_empty();
        let first_party_domains = if uses_default_family {
            default.first_party_domains
        } else {
            self.first_party_domains
        };

        let domain_flags = if self.domain_flags.is_empty() && uses_default_family {
            default.domain_flags
        } else {
            self.domain_flags
        };

        let ad_domain_markers = if self.ad_domain_markers.is_empty() {
            default.ad_domain_markers
        } else {
            self.ad_domain_markers
        };

        SessionConfig {
            first_party_domains,
            domain_flags,
            top_n: self.top_n.unwrap_or(default.top_n),
            large_resource_threshold_bytes: self
                .large_resource_threshold_bytes
                .unwrap_or(default.large_resource_threshold_bytes),
            ad_domain_markers,
            font_count_threshold: self
                .font_count_threshold
                .unwrap_or(default.font_count_threshold),
            target_page_weight_bytes: self
                .target_page_weight_bytes
                .unwrap_or(default.target_page_weight_bytes),
        }
    }
}
