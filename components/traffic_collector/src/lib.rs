//! Traffic event collection
//!
//! Subscribes to a page's network lifecycle, correlates the notifications
//! for each request id into a single [`RequestRecord`](traffic_types::RequestRecord)
//! and maintains running aggregates by domain, resource type, protocol and
//! cache outcome.
//!
//! # Features
//! - **Out-of-order delivery**: cache signals may arrive at any point before
//!   the terminal event and always resolve to the highest-precedence tier
//! - **Finalize once**: duplicate terminal signals never touch the aggregates
//! - **Coarse fallback**: hosts without a granular lifecycle channel are
//!   measured from response headers alone
//! - **Interception stats**: implements
//!   [`InterceptionObserver`](traffic_types::InterceptionObserver) so the
//!   interceptor can report its decisions

mod aggregates;
mod collector;
mod events;
mod page;

pub use aggregates::Aggregates;
pub use collector::{RecordStage, TrafficCollector};
pub use events::{CoarseResponse, NetworkEvent};
pub use page::TrafficPage;
