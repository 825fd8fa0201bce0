//! Traffic session orchestration
//!
//! Builds the rule table and interceptor from a [`SessionConfig`], attaches a
//! collector to a host page, and turns the closed window into a
//! [`SessionReport`] that can be handed to a [`ReportSink`].
//!
//! # Example
//!
//! ```no_run
//! use traffic_session::{LogSink, SessionConfig, TrafficSession};
//! # use traffic_collector::TrafficPage;
//!
//! # async fn run(page: &dyn TrafficPage) -> traffic_session::Result<()> {
//! let config = SessionConfig::from_file("session.json")?;
//! let session = TrafficSession::new(config)?;
//!
//! session.attach(page).await?;
//! session.wait_for_page_close().await;
//!
//! let report = session.finish_and_submit(&LogSink).await?;
//! println!("score: {}", report.efficiency_score);
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod report;
mod session;
mod sink;

pub use config::{SessionConfig, SessionConfigBuilder};
pub use error::{Result, SessionError};
pub use report::SessionReport;
pub use session::TrafficSession;
pub use sink::{JsonFileSink, LogSink, ReportSink};
