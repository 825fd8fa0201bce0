//! Rule table construction and lookup

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;
use traffic_types::{extract_domain, host_matches_suffix, Result};

use crate::pattern::DomainPattern;

/// A named per-domain switch: `allowed = false` blocks matching domains
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainFlag {
    pub pattern: String,
    pub allowed: bool,
}

impl DomainFlag {
    pub fn new(pattern: impl Into<String>, allowed: bool) -> Self {
        Self {
            pattern: pattern.into(),
            allowed,
        }
    }
}

/// Input to [`build_rules`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleFlags {
    /// Domains always eligible for allowance (exact or `.suffix` match)
    pub first_party_domains: Vec<String>,
    /// Ordered switches; wildcard precedence follows this order
    #[serde(default)]
    pub domain_flags: Vec<DomainFlag>,
}

impl RuleFlags {
    pub fn new(first_party_domains: Vec<String>) -> Self {
        Self {
            first_party_domains,
            domain_flags: Vec::new(),
        }
    }

    /// Append a switch
    pub fn with_flag(mut self, flag: DomainFlag) -> Self {
        self.domain_flags.push(flag);
        self
    }
}

/// A compiled rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub pattern: DomainPattern,
    pub blocked: bool,
}

/// Outcome of a rule lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleDecision {
    pub allowed: bool,
    /// True when no rule matched and the domain passed by default
    pub matched_silently: bool,
}

impl RuleDecision {
    fn deny() -> Self {
        Self {
            allowed: false,
            matched_silently: false,
        }
    }

    fn from_rule(rule: &Rule) -> Self {
        Self {
            allowed: !rule.blocked,
            matched_silently: false,
        }
    }

    fn allow_silently() -> Self {
        Self {
            allowed: true,
            matched_silently: true,
        }
    }
}

/// Read-only rule table, built once per session
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    first_party: Vec<String>,
    exact: HashMap<String, Rule>,
    wildcards: Vec<Rule>,
}

/// Compile switches into a rule table
///
/// When the same exact pattern is declared twice the later switch wins; a
/// duplicate wildcard keeps its first position.
///
/// # Errors
/// Fails when a pattern does not compile.
pub fn build_rules(flags: &RuleFlags) -> Result<RuleTable> {
    let first_party = flags
        .first_party_domains
        .iter()
        .map(|d| d.trim().trim_end_matches('.').to_ascii_lowercase())
        .filter(|d| !d.is_empty())
        .collect();

    let mut exact = HashMap::new();
    let mut wildcards: Vec<Rule> = Vec::new();

    for flag in &flags.domain_flags {
        let rule = Rule {
            pattern: DomainPattern::compile(&flag.pattern)?,
            blocked: !flag.allowed,
        };

        match &rule.pattern {
            DomainPattern::Exact { host } => {
                exact.insert(host.clone(), rule);
            }
            _ => {
                if let Some(existing) = wildcards.iter_mut().find(|r| r.pattern == rule.pattern) {
                    existing.blocked = rule.blocked;
                } else {
                    wildcards.push(rule);
                }
            }
        }
    }

    debug!(
        "Built rule table: {} exact, {} wildcard",
        exact.len(),
        wildcards.len()
    );

    Ok(RuleTable {
        first_party,
        exact,
        wildcards,
    })
}

impl RuleTable {
    /// Decide whether a domain may be requested
    pub fn decide(&self, domain: &str) -> RuleDecision {
        let domain = domain.trim_end_matches('.').to_ascii_lowercase();

        if !self.is_first_party(&domain) {
            return RuleDecision::deny();
        }

        self.lookup(&domain)
            .map(RuleDecision::from_rule)
            .unwrap_or_else(RuleDecision::allow_silently)
    }

    /// Decide for a full URL; unparseable URLs are denied
    pub fn decide_url(&self, url: &str) -> RuleDecision {
        match extract_domain(url) {
            Ok(domain) => self.decide(&domain),
            Err(_) => RuleDecision::deny(),
        }
    }

    /// Whether the domain belongs to the first-party allow-set
    pub fn is_first_party(&self, domain: &str) -> bool {
        self.first_party
            .iter()
            .any(|base| host_matches_suffix(domain, base))
    }

    /// First matching rule: exact key, then wildcards in declaration order
    pub fn lookup(&self, domain: &str) -> Option<&Rule> {
        self.exact
            .get(domain)
            .or_else(|| self.wildcards.iter().find(|r| r.pattern.matches(domain)))
    }

    pub fn first_party_domains(&self) -> &[String] {
        &self.first_party
    }

    /// All rules, exact ones first
    pub fn rules(&self) -> Vec<Rule> {
        let mut exact: Vec<Rule> = self.exact.values().cloned().collect();
        exact.sort_by_key(|r| r.pattern.to_string());
        exact.extend(self.wildcards.iter().cloned());
        exact
    }

    pub fn len(&self) -> usize {
        self.exact.len() + self.wildcards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
