//! Side-effect queue between primary writes and realtime fan-out.
//!
//! After a booking, contract, or message write commits, the service appends
//! an [`OutboxRecord`] to the [`Outbox`]. Enqueueing never waits: a full
//! queue drops the record and logs. A single [`OutboxDispatcher`] task
//! drains the queue and performs the best-effort work:
//!
//! 1. publish the update on its channel
//! 2. append it to the user's recovery list
//! 3. for metric-affecting records: refresh the snapshot, write it to the
//!    cache, publish it on `metrics-updates`, and append it to the recovery
//!    list as well
//!
//! Records are processed in enqueue order by one task, so refreshes for the
//! same user never race each other inside a process.

use tokio::sync::mpsc;

use super::{MetricsCache, UpdateBus, UpdateType, UserId};

/// One pending side effect.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboxRecord {
    /// User whose dashboard is affected.
    pub user_id: UserId,
    /// Kind of change.
    pub update_type: UpdateType,
    /// Event payload.
    pub data: serde_json::Value,
    /// Whether the user's metrics snapshot must be recomputed.
    pub refresh_metrics: bool,
}

impl OutboxRecord {
    /// Creates a record that also refreshes the user's metrics.
    #[must_use]
    pub fn with_metrics(user_id: UserId, update_type: UpdateType, data: serde_json::Value) -> Self {
        Self {
            user_id,
            update_type,
            data,
            refresh_metrics: true,
        }
    }

    /// Creates a record that only fans out the update.
    #[must_use]
    pub fn notify_only(user_id: UserId, update_type: UpdateType, data: serde_json::Value) -> Self {
        Self {
            user_id,
            update_type,
            data,
            refresh_metrics: false,
        }
    }
}

/// Producer side of the queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Outbox {
    sender: mpsc::Sender<OutboxRecord>,
}

impl Outbox {
    /// Creates a queue with the given capacity and its dispatcher.
    #[must_use]
    pub fn new(capacity: usize, cache: MetricsCache, bus: UpdateBus) -> (Self, OutboxDispatcher) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (
            Self { sender },
            OutboxDispatcher {
                receiver,
                cache,
                bus,
            },
        )
    }

    /// Appends a record without waiting. Returns `false` if the queue is
    /// full or the dispatcher has stopped.
    pub fn enqueue(&self, record: OutboxRecord) -> bool {
        match self.sender.try_send(record) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(record)) => {
                tracing::warn!(
                    user_id = %record.user_id,
                    update_type = %record.update_type,
                    "outbox full, dropping realtime update"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(record)) => {
                tracing::warn!(
                    user_id = %record.user_id,
                    update_type = %record.update_type,
                    "outbox dispatcher stopped, dropping realtime update"
                );
                false
            }
        }
    }

    /// Returns the number of free slots.
    #[must_use]
    pub fn remaining_capacity(&self) -> usize {
        self.sender.capacity()
    }
}

/// What happened to one dispatched record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// The update reached the channel.
    pub published: bool,
    /// The update was appended to the recovery list.
    pub stored: bool,
    /// A fresh snapshot was written to the cache.
    pub metrics_cached: bool,
    /// The fresh snapshot was published on `metrics-updates`.
    pub metrics_published: bool,
    /// The fresh snapshot was appended to the recovery list.
    pub metrics_stored: bool,
}

/// Consumer side of the queue.
#[derive(Debug)]
pub struct OutboxDispatcher {
    receiver: mpsc::Receiver<OutboxRecord>,
    cache: MetricsCache,
    bus: UpdateBus,
}

impl OutboxDispatcher {
    /// Drains the queue until every [`Outbox`] handle is dropped.
    pub async fn run(mut self) {
        tracing::info!("outbox dispatcher started");
        while let Some(record) = self.receiver.recv().await {
            self.dispatch(&record).await;
        }
        tracing::info!("outbox dispatcher stopped");
    }

    /// Processes every record currently queued and returns their reports.
    pub async fn drain(&mut self) -> Vec<DispatchReport> {
        let mut reports = Vec::new();
        while let Ok(record) = self.receiver.try_recv() {
            reports.push(self.dispatch(&record).await);
        }
        reports
    }

    /// Performs the side effects of a single record.
    pub async fn dispatch(&self, record: &OutboxRecord) -> DispatchReport {
        let user_id = &record.user_id;
        let mut report = DispatchReport {
            published: self
                .bus
                .publish_update(record.update_type, user_id, record.data.clone())
                .await
                .success,
            stored: self
                .bus
                .store_event(user_id, record.update_type, record.data.clone())
                .await,
            ..DispatchReport::default()
        };

        if record.refresh_metrics
            && let Some(snapshot) = self.cache.refresh(user_id).await
        {
            report.metrics_cached = self.cache.store(user_id, &snapshot).await;
            let data = serde_json::to_value(&snapshot).unwrap_or_default();
            report.metrics_published = self
                .bus
                .publish_update(UpdateType::Metrics, user_id, data.clone())
                .await
                .success;
            report.metrics_stored = self
                .bus
                .store_event(user_id, UpdateType::Metrics, data)
                .await;
        }

        tracing::debug!(
            user_id = %user_id,
            update_type = %record.update_type,
            published = report.published,
            stored = report.stored,
            metrics_cached = report.metrics_cached,
            metrics_stored = report.metrics_stored,
            "outbox record dispatched"
        );
        report
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::Utc;

    use crate::domain::MetricsSnapshot;
    use crate::kv::{KvClient, KvStore, MemoryKvStore};
    use crate::persistence::{MemoryStore, NewBooking, RecordStore};
    use crate::retry::{RetryOn, RetryPolicy};

    fn user(raw: &str) -> UserId {
        let Ok(id) = UserId::parse(raw) else {
            panic!("valid user id");
        };
        id
    }

    fn wiring(kv: &MemoryKvStore, db: &MemoryStore, capacity: usize) -> (Outbox, OutboxDispatcher) {
        let handle: Arc<dyn KvStore> = Arc::new(kv.clone());
        let policy = RetryPolicy::default()
            .with_delay(Duration::from_millis(10))
            .with_retry_on(RetryOn::Transient);
        let client = KvClient::new(Some(handle), policy);
        let cache = MetricsCache::new(client.clone(), Arc::new(db.clone()));
        Outbox::new(capacity, cache, UpdateBus::new(client))
    }

    #[test]
    fn enqueue_on_full_queue_returns_false() {
        let (outbox, _dispatcher) = wiring(&MemoryKvStore::new(), &MemoryStore::new(), 1);
        let record = OutboxRecord::notify_only(user("u1"), UpdateType::Message, serde_json::json!({}));
        assert!(outbox.enqueue(record.clone()));
        assert_eq!(outbox.remaining_capacity(), 0);
        assert!(!outbox.enqueue(record));
    }

    #[test]
    fn enqueue_after_dispatcher_dropped_returns_false() {
        let (outbox, dispatcher) = wiring(&MemoryKvStore::new(), &MemoryStore::new(), 4);
        drop(dispatcher);
        let record = OutboxRecord::notify_only(user("u1"), UpdateType::Message, serde_json::json!({}));
        assert!(!outbox.enqueue(record));
    }

    #[tokio::test]
    async fn dispatch_refreshes_cache_and_publishes_metrics() {
        let kv = MemoryKvStore::new();
        let db = MemoryStore::new();
        let (outbox, mut dispatcher) = wiring(&kv, &db, 8);
        let mut bookings_rx = kv.subscribe("booking-updates").await;
        let mut metrics_rx = kv.subscribe("metrics-updates").await;

        let u1 = user("u1");
        let Ok(booking) = db
            .insert_booking(&NewBooking {
                client_id: u1.clone(),
                provider_id: user("p1"),
                service_name: "Audit".to_string(),
                scheduled_at: Utc::now(),
                amount: 300.0,
            })
            .await
        else {
            panic!("insert failed");
        };
        assert!(outbox.enqueue(OutboxRecord::with_metrics(
            u1.clone(),
            UpdateType::Booking,
            serde_json::json!({"bookingId": booking.id}),
        )));

        let reports = dispatcher.drain().await;
        let [report] = reports.as_slice() else {
            panic!("expected one report");
        };
        assert!(report.published && report.stored && report.metrics_cached && report.metrics_published);
        assert!(report.metrics_stored);

        assert!(bookings_rx.recv().await.is_ok());
        let Ok(raw) = metrics_rx.recv().await else {
            panic!("expected metrics update");
        };
        assert!(raw.contains("\"totalBookings\":1"));

        let Ok(Some(cached)) = kv.get("dashboard_metrics:u1").await else {
            panic!("expected cached snapshot");
        };
        let Ok(snapshot) = serde_json::from_str::<MetricsSnapshot>(&cached) else {
            panic!("cached snapshot should decode");
        };
        assert_eq!(snapshot.pending_bookings, 1);

        let Ok(history) = kv.lrange("events:u1", 0, -1).await else {
            panic!("recovery list should be readable");
        };
        let types: Vec<Option<String>> = history
            .iter()
            .map(|raw| {
                serde_json::from_str::<serde_json::Value>(raw)
                    .ok()
                    .and_then(|v| v.get("type").and_then(|t| t.as_str()).map(str::to_string))
            })
            .collect();
        assert_eq!(
            types,
            vec![Some("metrics".to_string()), Some("booking".to_string())]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn dispatch_during_outage_reports_failures() {
        let kv = MemoryKvStore::new();
        kv.set_unavailable(true);
        let (_outbox, dispatcher) = wiring(&kv, &MemoryStore::new(), 8);

        let record = OutboxRecord::with_metrics(user("u1"), UpdateType::Contract, serde_json::json!({}));
        let report = dispatcher.dispatch(&record).await;
        assert_eq!(report, DispatchReport::default());
    }

    #[tokio::test]
    async fn run_stops_when_outbox_dropped() {
        let (outbox, dispatcher) = wiring(&MemoryKvStore::new(), &MemoryStore::new(), 8);
        let handle = tokio::spawn(dispatcher.run());
        assert!(outbox.enqueue(OutboxRecord::notify_only(
            user("u1"),
            UpdateType::Message,
            serde_json::json!({"text": "hi"}),
        )));
        drop(outbox);
        let joined = tokio::time::timeout(Duration::from_secs(5), handle).await;
        assert!(matches!(joined, Ok(Ok(()))));
    }
}
