//! Traffic event collector
//!
//! Builds one record per request id out of the page's lifecycle notifications
//! and folds each record into the window aggregates exactly once.
//!
//! Records live in a single map keyed by request id. Every notification for a
//! given id mutates that entry under the map's per-entry lock, and the
//! finalize step flips the entry's stage to `Finalized` under the same lock,
//! so concurrent terminal signals cannot both reach the aggregates.

use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use traffic_types::{
    now_millis, CacheState, DecisionReport, InterceptionObserver, InterceptionStats, Protocol,
    RequestRecord, ResourceType, Result, TrafficError, TrafficSnapshot,
};

use crate::aggregates::Aggregates;
use crate::events::{CoarseResponse, NetworkEvent};
use crate::page::TrafficPage;

/// Lifecycle stage of a tracked request
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RecordStage {
    Observed,
    HeadersReceived,
    Finished,
    Finalized,
}

#[derive(Debug, Clone)]
struct RecordSlot {
    record: RequestRecord,
    stage: RecordStage,
    seq: u64,
}

/// Collects network traffic for one page session
///
/// Cheap to clone; clones share state.
#[derive(Debug, Clone)]
pub struct TrafficCollector {
    /// Map of tracked requests (request id → slot)
    records: Arc<DashMap<String, RecordSlot>>,
    /// Window aggregates, written only by `finalize`
    aggregates: Arc<RwLock<Aggregates>>,
    /// Interceptor decision counters
    interception: Arc<RwLock<InterceptionStats>>,
    /// Observation order of records
    next_seq: Arc<AtomicU64>,
    /// Task draining the page subscription
    subscription: Arc<Mutex<Option<JoinHandle<()>>>>,
    /// Whether the coarse fallback channel is in use
    degraded: Arc<AtomicBool>,
}

impl Default for TrafficCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl TrafficCollector {
    /// Create an idle collector
    pub fn new() -> Self {
        Self {
            records: Arc::new(DashMap::new()),
            aggregates: Arc::new(RwLock::new(Aggregates::default())),
            interception: Arc::new(RwLock::new(InterceptionStats::default())),
            next_seq: Arc::new(AtomicU64::new(0)),
            subscription: Arc::new(Mutex::new(None)),
            degraded: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Subscribe to a page's network notifications
    ///
    /// Prefers the granular lifecycle channel and degrades to coarse
    /// responses when the page cannot provide it. Must be called from within
    /// a tokio runtime.
    ///
    /// # Errors
    /// `AlreadyStarted` when a subscription is active, or the page's error
    /// when neither channel is available.
    pub async fn start(&self, page: &dyn TrafficPage) -> Result<()> {
        if self.is_running() {
            return Err(TrafficError::AlreadyStarted);
        }

        let handle = match page.network_events().await {
            Ok(mut events) => {
                info!("Traffic collector attached to network lifecycle events");
                self.degraded.store(false, Ordering::SeqCst);
                let collector = self.clone();
                tokio::spawn(async move {
                    while let Some(event) = events.recv().await {
                        collector.handle_event(event);
                    }
                    debug!("Network event channel closed");
                })
            }
            Err(e) => {
                warn!(
                    "Network lifecycle unavailable ({}), falling back to coarse responses",
                    e
                );
                let mut responses = page.coarse_responses().await?;
                self.degraded.store(true, Ordering::SeqCst);
                let collector = self.clone();
                tokio::spawn(async move {
                    while let Some(response) = responses.recv().await {
                        collector.handle_coarse_response(response);
                    }
                    debug!("Coarse response channel closed");
                })
            }
        };

        let mut subscription = self.subscription.lock();
        if subscription.as_ref().is_some_and(|h| !h.is_finished()) {
            handle.abort();
            return Err(TrafficError::AlreadyStarted);
        }
        *subscription = Some(handle);

        Ok(())
    }

    /// Detach from the page
    ///
    /// Safe to call at any time. Records and aggregates are kept; records not
    /// yet finalized stay in their last-known state.
    ///
    /// # Returns
    /// true if a subscription was active
    pub fn stop(&self) -> bool {
        match self.subscription.lock().take() {
            Some(handle) => {
                handle.abort();
                info!("Traffic collector detached");
                true
            }
            None => false,
        }
    }

    /// Wait until the page closes its event channel
    pub async fn wait_for_close(&self) {
        let handle = self.subscription.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                if !e.is_cancelled() {
                    warn!("Traffic subscription task failed: {}", e);
                }
            }
        }
    }

    /// Whether a subscription task is draining events
    pub fn is_running(&self) -> bool {
        self.subscription
            .lock()
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    /// Whether the collector runs on the coarse fallback channel
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::SeqCst)
    }

    /// Apply one lifecycle notification
    pub fn handle_event(&self, event: NetworkEvent) {
        match event {
            NetworkEvent::RequestObserved {
                id,
                url,
                method,
                resource_type,
            } => {
                self.upsert(
                    &id,
                    || RequestRecord::new(id.as_str(), url.as_str(), method.as_str(), resource_type),
                    |slot| {
                        if slot.record.url.is_empty() {
                            slot.record.set_url(url.as_str());
                        }
                        slot.record.method = method.clone();
                        slot.record.resource_type = resource_type;
                    },
                );
            }
            NetworkEvent::ResponseReceived {
                id,
                url,
                resource_type,
                status,
                headers,
                protocol,
                from_disk_cache,
                from_service_worker,
                from_prefetch_cache,
            } => {
                self.upsert(
                    &id,
                    || RequestRecord::new(id.as_str(), url.as_str(), "", resource_type),
                    |slot| {
                        if slot.record.url.is_empty() {
                            slot.record.set_url(url.as_str());
                            slot.record.resource_type = resource_type;
                        }
                        slot.record.status = Some(status);
                        slot.record.protocol = Protocol::infer(protocol.as_deref(), &headers);

                        let mut state = slot.record.cache_state;
                        if from_disk_cache {
                            state = state.merge(CacheState::Disk);
                        }
                        if from_service_worker {
                            state = state.merge(CacheState::ServiceWorker);
                        }
                        if from_prefetch_cache {
                            state = state.merge(CacheState::Prefetch);
                        }
                        slot.record.cache_state = state;

                        if slot.stage < RecordStage::HeadersReceived {
                            slot.stage = RecordStage::HeadersReceived;
                        }
                    },
                );
            }
            NetworkEvent::ServedFromCache { id, tier } => {
                self.upsert(
                    &id,
                    || {
                        debug!("Cache signal before first sighting of request {}", id);
                        RequestRecord::new(id.as_str(), "", "", ResourceType::Other)
                    },
                    |slot| {
                        slot.record.cache_state = slot.record.cache_state.merge(tier);
                    },
                );
            }
            NetworkEvent::LoadingFinished {
                id,
                encoded_data_length,
            } => {
                match self.records.get_mut(&id) {
                    Some(mut slot) => {
                        if slot.stage == RecordStage::Finalized {
                            debug!("Duplicate terminal signal for request {}", id);
                            return;
                        }
                        slot.record.size_bytes = encoded_data_length;
                        slot.stage = RecordStage::Finished;
                    }
                    None => {
                        debug!("Loading finished for unknown request {}", id);
                        return;
                    }
                }
                self.finalize(&id);
            }
            NetworkEvent::LoadingFailed { id } => {
                if self.records.contains_key(&id) {
                    self.finalize(&id);
                } else {
                    debug!("Loading failed for unknown request {}", id);
                }
            }
        }
    }

    /// Apply a coarse response as an immediately terminal event
    ///
    /// Size is taken from `content-length` (0 if absent); cache detection is
    /// not available on this channel.
    pub fn handle_coarse_response(&self, response: CoarseResponse) {
        let size = response.content_length();
        let id = response.id.clone();

        self.upsert(
            &id,
            || {
                RequestRecord::new(
                    response.id.as_str(),
                    response.url.as_str(),
                    response.method.as_str(),
                    response.resource_type,
                )
            },
            |slot| {
                if slot.record.url.is_empty() {
                    slot.record.set_url(response.url.as_str());
                }
                slot.record.status = Some(response.status);
                slot.record.protocol = Protocol::infer(None, &response.headers);
                slot.record.size_bytes = size;
                slot.stage = RecordStage::Finished;
            },
        );

        self.finalize(&id);
    }

    /// Push a record into the aggregates
    ///
    /// Idempotent: only the first call for an id has any effect. Records the
    /// interceptor blocked are closed but never reach the aggregates; they
    /// are counted by the interception stats only.
    ///
    /// # Returns
    /// true if this call finalized the record
    pub fn finalize(&self, id: &str) -> bool {
        // Aggregates lock is taken first so snapshots never see a finalized
        // record that is missing from the totals.
        let mut aggregates = self.aggregates.write();

        let record = {
            let Some(mut slot) = self.records.get_mut(id) else {
                debug!("Finalize for unknown request {}", id);
                return false;
            };
            if slot.stage == RecordStage::Finalized {
                debug!("{}", TrafficError::DuplicateFinalize(id.to_string()));
                return false;
            }
            slot.stage = RecordStage::Finalized;
            slot.record.finalized_at = Some(now_millis());
            slot.record.clone()
        };

        if record.was_blocked {
            debug!("Request {} was blocked, kept out of the window totals", id);
        } else {
            aggregates.apply(&record);
        }
        true
    }

    /// Finalize every pending record and return the closed window
    ///
    /// Records that never reached a terminal signal enter the aggregates with
    /// their last-known size (0 if unknown).
    pub fn close_window(&self) -> TrafficSnapshot {
        let pending: Vec<(String, bool)> = self
            .records
            .iter()
            .filter(|entry| entry.stage != RecordStage::Finalized)
            .map(|entry| (entry.key().clone(), entry.record.was_blocked))
            .collect();

        let mut partial = 0;
        for (id, was_blocked) in &pending {
            if self.finalize(id) && !was_blocked {
                debug!("{}", TrafficError::PartialRecord(id.clone()));
                partial += 1;
            }
        }

        if partial > 0 {
            info!("Closed window with {} partial records", partial);
        }

        self.get_snapshot()
    }

    /// Copy of every record plus the current aggregates
    pub fn get_snapshot(&self) -> TrafficSnapshot {
        let aggregates = self.aggregates.read();

        let mut slots: Vec<(u64, RequestRecord)> = self
            .records
            .iter()
            .map(|entry| (entry.seq, entry.record.clone()))
            .collect();
        slots.sort_by_key(|(seq, _)| *seq);

        TrafficSnapshot {
            records: slots.into_iter().map(|(_, record)| record).collect(),
            domains: aggregates.domains.clone(),
            resource_types: aggregates.resource_types.clone(),
            protocols: aggregates.protocols.clone(),
            cache_stats: aggregates.cache_stats.clone(),
            interception: self.interception.read().clone(),
            total_requests: aggregates.total_requests,
            total_size_bytes: aggregates.total_size_bytes,
            captured_at: now_millis(),
        }
    }

    /// Drop every record, aggregate and counter
    ///
    /// Does not touch the subscription.
    pub fn reset(&self) {
        let mut aggregates = self.aggregates.write();
        self.records.clear();
        *aggregates = Aggregates::default();
        *self.interception.write() = InterceptionStats::default();
        self.next_seq.store(0, Ordering::SeqCst);
        debug!("Traffic collector reset");
    }

    /// Current state of one record
    pub fn get_record(&self, id: &str) -> Option<RequestRecord> {
        self.records.get(id).map(|slot| slot.record.clone())
    }

    /// Lifecycle stage of one record
    pub fn get_stage(&self, id: &str) -> Option<RecordStage> {
        self.records.get(id).map(|slot| slot.stage)
    }

    /// Number of tracked records
    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// Number of records not yet finalized
    pub fn pending_count(&self) -> usize {
        self.records
            .iter()
            .filter(|entry| entry.stage != RecordStage::Finalized)
            .count()
    }

    /// Create the slot on first sighting, then apply `update` unless the
    /// record is already finalized
    fn upsert<C, U>(&self, id: &str, create: C, update: U)
    where
        C: FnOnce() -> RequestRecord,
        U: FnOnce(&mut RecordSlot),
    {
        let mut slot = self
            .records
            .entry(id.to_string())
            .or_insert_with(|| RecordSlot {
                record: create(),
                stage: RecordStage::Observed,
                seq: self.next_seq.fetch_add(1, Ordering::SeqCst),
            });

        if slot.stage == RecordStage::Finalized {
            debug!("Ignoring late event for finalized request {}", id);
            return;
        }

        update(slot.value_mut());
    }
}

impl InterceptionObserver for TrafficCollector {
    fn on_decision(&self, report: &DecisionReport) {
        self.interception.write().record(report);

        if !report.allowed {
            self.upsert(
                &report.request_id,
                || {
                    RequestRecord::new(
                        report.request_id.as_str(),
                        report.url.as_str(),
                        "",
                        report.resource_type,
                    )
                },
                |slot| slot.record.was_blocked = true,
            );
        }
    }
}
