//! Network lifecycle notifications delivered by the host page

use serde::{Deserialize, Serialize};
use traffic_types::{CacheState, HttpHeaders, ResourceType};

/// Granular per-request lifecycle notification
///
/// Notifications for different requests may interleave freely; for the same
/// request they may arrive out of the nominal order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum NetworkEvent {
    /// The page issued a request
    #[serde(rename_all = "camelCase")]
    RequestObserved {
        id: String,
        url: String,
        method: String,
        resource_type: ResourceType,
    },
    /// Response headers arrived
    #[serde(rename_all = "camelCase")]
    ResponseReceived {
        id: String,
        url: String,
        resource_type: ResourceType,
        status: u16,
        #[serde(default)]
        headers: HttpHeaders,
        /// Protocol reported by the host, if any ("h2", "http/1.1", ...)
        #[serde(default)]
        protocol: Option<String>,
        #[serde(default)]
        from_disk_cache: bool,
        #[serde(default)]
        from_service_worker: bool,
        #[serde(default)]
        from_prefetch_cache: bool,
    },
    /// The response was served from a cache tier
    #[serde(rename_all = "camelCase")]
    ServedFromCache { id: String, tier: CacheState },
    /// Transfer complete, carrying the encoded byte count
    #[serde(rename_all = "camelCase")]
    LoadingFinished { id: String, encoded_data_length: u64 },
    /// The request failed or was aborted
    #[serde(rename_all = "camelCase")]
    LoadingFailed { id: String },
}

impl NetworkEvent {
    /// Correlation key of the request this event belongs to
    pub fn request_id(&self) -> &str {
        match self {
            NetworkEvent::RequestObserved { id, .. }
            | NetworkEvent::ResponseReceived { id, .. }
            | NetworkEvent::ServedFromCache { id, .. }
            | NetworkEvent::LoadingFinished { id, .. }
            | NetworkEvent::LoadingFailed { id } => id,
        }
    }

    /// Whether this event ends the request's lifecycle
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            NetworkEvent::LoadingFinished { .. } | NetworkEvent::LoadingFailed { .. }
        )
    }
}

/// Response notification from hosts without a granular lifecycle channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoarseResponse {
    pub id: String,
    pub url: String,
    pub method: String,
    pub resource_type: ResourceType,
    pub status: u16,
    #[serde(default)]
    pub headers: HttpHeaders,
}

impl CoarseResponse {
    /// Declared `content-length`, 0 when absent or malformed
    pub fn content_length(&self) -> u64 {
        self.headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse().ok())
            .unwrap_or(0)
    }
}
