//! Efficiency scoring
//!
//! Reduces a window to a bounded score that rewards staying under a small
//! page-weight budget more than it rewards cache hits.

use serde::{Deserialize, Serialize};

use crate::types::AnalysisSummary;

const BASE_SCORE: f64 = 50.0;
const MAX_CACHE_BONUS: f64 = 10.0;

/// Size tiers as (upper bound in MB, bonus); the first matching tier wins
const SIZE_TIERS: [(f64, f64); 4] = [(0.3, 40.0), (0.5, 35.0), (1.0, 25.0), (2.0, 15.0)];
const OVERSIZE_BONUS: f64 = 5.0;

/// Components of an efficiency score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub base: f64,
    pub size_bonus: f64,
    pub cache_bonus: f64,
    /// Rounded and clamped to `[0, 100]`
    pub score: u8,
}

impl ScoreBreakdown {
    pub fn compute(total_size_mb: f64, cache_hit_rate: f64) -> Self {
        let size_bonus = size_bonus(total_size_mb);
        let cache_bonus = cache_bonus(cache_hit_rate);
        let raw = BASE_SCORE + size_bonus + cache_bonus;

        Self {
            base: BASE_SCORE,
            size_bonus,
            cache_bonus,
            score: raw.round().clamp(0.0, 100.0) as u8,
        }
    }
}

fn size_bonus(total_size_mb: f64) -> f64 {
    if total_size_mb.is_nan() {
        return OVERSIZE_BONUS;
    }
    SIZE_TIERS
        .iter()
        .find(|(limit, _)| total_size_mb <= *limit)
        .map(|(_, bonus)| *bonus)
        .unwrap_or(OVERSIZE_BONUS)
}

fn cache_bonus(cache_hit_rate: f64) -> f64 {
    if cache_hit_rate.is_nan() {
        return 0.0;
    }
    (cache_hit_rate * 0.1).clamp(0.0, MAX_CACHE_BONUS)
}

/// Score a window from its size in MB and its cache hit rate in percent
pub fn efficiency_score(total_size_mb: f64, cache_hit_rate: f64) -> u8 {
    ScoreBreakdown::compute(total_size_mb, cache_hit_rate).score
}

/// Score an analysis summary
pub fn score(summary: &AnalysisSummary) -> u8 {
    efficiency_score(summary.total_size_mb, summary.cache_hit_rate)
}
