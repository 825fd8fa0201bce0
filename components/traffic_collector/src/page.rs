//! Host page abstraction

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedReceiver;
use traffic_types::Result;

use crate::events::{CoarseResponse, NetworkEvent};

/// A page-like object the collector can observe
///
/// Implemented by the browser automation layer. Each call hands out a fresh
/// receiver; the collector drains it until the sender side closes or the
/// collector is stopped.
#[async_trait]
pub trait TrafficPage: Send + Sync {
    /// Subscribe to the granular request lifecycle
    ///
    /// Hosts that cannot provide it return
    /// `TrafficError::SubscriptionUnavailable`.
    async fn network_events(&self) -> Result<UnboundedReceiver<NetworkEvent>>;

    /// Subscribe to coarse response notifications
    async fn coarse_responses(&self) -> Result<UnboundedReceiver<CoarseResponse>>;
}
