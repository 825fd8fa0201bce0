//! Report sinks

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::report::SessionReport;
use crate::{Result, SessionError};

/// Destination for finished session reports
#[async_trait]
pub trait ReportSink: Send + Sync {
    /// Deliver one report
    async fn submit(&self, report: &SessionReport) -> Result<()>;
}

/// Writes each report as pretty-printed JSON to a file
///
/// Missing parent directories are created; an existing file is replaced.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ReportSink for JsonFileSink {
    async fn submit(&self, report: &SessionReport) -> Result<()> {
        let json = serde_json::to_string_pretty(report)
            .map_err(|e| SessionError::Sink(format!("cannot encode report: {}", e)))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(&self.path, json).await?;

        info!(
            "Session {} report written to {}",
            report.session_id,
            self.path.display()
        );
        Ok(())
    }
}

/// Emits the rendered text report through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

#[async_trait]
impl ReportSink for LogSink {
    async fn submit(&self, report: &SessionReport) -> Result<()> {
        info!(
            "Session {} finished in {:.0} ms: {} requests, {:.2} MB, score {}",
            report.session_id,
            report.duration_ms(),
            report.summary.total_requests,
            report.summary.total_size_mb,
            report.efficiency_score
        );
        for line in report.render().lines() {
            info!("{}", line);
        }
        Ok(())
    }
}
