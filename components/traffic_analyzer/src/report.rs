//! Human-readable rendering of an analysis summary

use std::fmt::Write;
use traffic_types::bytes_to_mb;

use crate::types::AnalysisSummary;

const RULE: &str = "============================================================";

/// Render a summary and its efficiency score as a multi-line text report
pub fn render_report(summary: &AnalysisSummary, score: u8) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail
    let _ = write_report(&mut out, summary, score, None);
    out
}

/// Same as [`render_report`], plus the window size measured against a
/// page-weight budget
pub fn render_budgeted_report(summary: &AnalysisSummary, score: u8, budget_bytes: u64) -> String {
    let mut out = String::new();
    let _ = write_report(&mut out, summary, score, Some(budget_bytes));
    out
}

fn write_report(
    out: &mut String,
    summary: &AnalysisSummary,
    score: u8,
    budget_bytes: Option<u64>,
) -> std::fmt::Result {
    writeln!(out, "{}", RULE)?;
    writeln!(out, "TRAFFIC ANALYSIS REPORT")?;
    writeln!(out, "{}", RULE)?;
    writeln!(out, "Requests:         {}", summary.total_requests)?;
    writeln!(
        out,
        "Total size:       {:.2} MB ({} bytes)",
        summary.total_size_mb, summary.total_size_bytes
    )?;
    writeln!(out, "Efficiency score: {}/100", score)?;
    if let Some(budget) = budget_bytes.filter(|b| *b > 0) {
        let usage = summary.total_size_bytes as f64 / budget as f64 * 100.0;
        writeln!(
            out,
            "Page weight:      {:.1}% of {:.2} MB budget{}",
            usage,
            bytes_to_mb(budget),
            if summary.total_size_bytes > budget { " (over)" } else { "" }
        )?;
    }

    let interception = &summary.interception;
    if interception.allowed + interception.blocked > 0 {
        writeln!(
            out,
            "Blocked:          {} of {} ({:.1}%)",
            interception.blocked,
            interception.allowed + interception.blocked,
            interception.block_rate()
        )?;
    }

    if !summary.top_domains.is_empty() {
        writeln!(out, "\nTop domains:")?;
        for (rank, domain) in summary.top_domains.iter().enumerate() {
            writeln!(
                out,
                "  {:>2}. {:<40} {:>6} req {:>10.2} KB",
                rank + 1,
                domain.domain,
                domain.count,
                domain.size_bytes as f64 / 1024.0
            )?;
        }
    }

    if !summary.resource_types.is_empty() {
        writeln!(out, "\nResource types:")?;
        for usage in &summary.resource_types {
            writeln!(
                out,
                "  {:<12} {:>6} req {:>10.2} KB {:>6.1}%",
                usage.resource_type.as_str(),
                usage.count,
                usage.size_bytes as f64 / 1024.0,
                usage.share_percent
            )?;
        }
    }

    if !summary.protocols.is_empty() {
        writeln!(out, "\nProtocols:")?;
        for usage in &summary.protocols {
            writeln!(
                out,
                "  {:<12} {:>6} req {:>6.1}%",
                usage.protocol.as_str(),
                usage.count,
                usage.percent
            )?;
        }
    }

    let stats = &summary.cache_stats;
    writeln!(out, "\nCache:")?;
    writeln!(out, "  hit rate        {:.1}%", summary.cache_hit_rate)?;
    writeln!(out, "  memory          {}", stats.from_memory)?;
    writeln!(out, "  disk            {}", stats.from_disk)?;
    writeln!(out, "  service worker  {}", stats.from_service_worker)?;
    writeln!(out, "  network         {}", stats.from_network)?;

    if !summary.large_resources.is_empty() {
        writeln!(out, "\nLarge resources:")?;
        for resource in &summary.large_resources {
            writeln!(
                out,
                "  {:>8.2} MB  {}",
                bytes_to_mb(resource.size_bytes),
                resource.url
            )?;
        }
    }

    writeln!(out, "\nRecommendations:")?;
    if summary.recommendations.is_empty() {
        writeln!(out, "  none")?;
    }
    for rec in &summary.recommendations {
        writeln!(out, "  [{}] {}", rec.priority, rec.message)?;
        for example in &rec.examples {
            writeln!(out, "         - {}", example)?;
        }
    }
    writeln!(out, "{}", RULE)?;

    Ok(())
}
