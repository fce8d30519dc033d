//! Dashboard service: primary writes plus best-effort realtime side effects.

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::{
    MetricsCache, MetricsRead, Outbox, OutboxRecord, PublishOutcome, UpdateBus, UpdateEvent,
    UpdateType, UserId,
};
use crate::error::AppError;
use crate::persistence::{
    Booking, BookingStatus, Contract, Message, NewBooking, NewContract, NewMessage, RecordStore,
};

/// Orchestration layer for dashboard reads and record mutations.
///
/// Every mutation follows the same pattern: validate → write to the
/// record store (errors propagate) → enqueue one outbox record per
/// affected user (never fails the request) → return the row.
#[derive(Debug, Clone)]
pub struct DashboardService {
    store: Arc<dyn RecordStore>,
    cache: MetricsCache,
    bus: UpdateBus,
    outbox: Outbox,
}

impl DashboardService {
    /// Creates a new `DashboardService`.
    #[must_use]
    pub fn new(
        store: Arc<dyn RecordStore>,
        cache: MetricsCache,
        bus: UpdateBus,
        outbox: Outbox,
    ) -> Self {
        Self {
            store,
            cache,
            bus,
            outbox,
        }
    }

    /// Returns a reference to the update bus.
    #[must_use]
    pub fn bus(&self) -> &UpdateBus {
        &self.bus
    }

    /// Creates a booking and notifies both participants.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::InvalidRequest`] for a blank service name or a
    /// negative amount, or a persistence error from the store.
    pub async fn create_booking(&self, booking: NewBooking) -> Result<Booking, AppError> {
        require_text("serviceName", &booking.service_name)?;
        require_amount("amount", booking.amount)?;

        let row = self.store.insert_booking(&booking).await?;
        tracing::info!(booking_id = %row.id, client_id = %row.client_id, "booking created");

        let data = serde_json::json!({ "action": "created", "booking": &row });
        self.notify(
            [&row.client_id, &row.provider_id],
            UpdateType::Booking,
            &data,
            true,
        );
        Ok(row)
    }

    /// Changes a booking's status and notifies both participants.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::BookingNotFound`] if the booking does not exist,
    /// or a persistence error from the store.
    pub async fn update_booking_status(
        &self,
        booking_id: Uuid,
        status: BookingStatus,
    ) -> Result<Booking, AppError> {
        let row = self.store.update_booking_status(booking_id, status).await?;
        tracing::info!(booking_id = %row.id, status = %status, "booking status changed");

        let data = serde_json::json!({ "action": "status_changed", "booking": &row });
        self.notify(
            [&row.client_id, &row.provider_id],
            UpdateType::Booking,
            &data,
            true,
        );
        Ok(row)
    }

    /// Creates a contract and notifies both parties.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::InvalidRequest`] for a blank title or a negative
    /// value, or a persistence error from the store.
    pub async fn create_contract(&self, contract: NewContract) -> Result<Contract, AppError> {
        require_text("title", &contract.title)?;
        require_amount("value", contract.value)?;

        let row = self.store.insert_contract(&contract).await?;
        tracing::info!(contract_id = %row.id, status = %row.status, "contract created");

        let data = serde_json::json!({ "action": "created", "contract": &row });
        self.notify(
            [&row.client_id, &row.provider_id],
            UpdateType::Contract,
            &data,
            true,
        );
        Ok(row)
    }

    /// Stores a message and notifies both sides of the conversation.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::InvalidRequest`] for an empty body, or a
    /// persistence error from the store.
    pub async fn send_message(&self, message: NewMessage) -> Result<Message, AppError> {
        require_text("body", &message.body)?;

        let row = self.store.insert_message(&message).await?;
        tracing::debug!(message_id = %row.id, "message stored");

        let data = serde_json::json!({ "action": "received", "message": &row });
        self.notify(
            [&row.recipient_id, &row.sender_id],
            UpdateType::Message,
            &data,
            false,
        );
        Ok(row)
    }

    /// Cache-aside metrics read; never fails.
    pub async fn dashboard_metrics(&self, user_id: &UserId) -> MetricsRead {
        self.cache.load(user_id).await
    }

    /// Publishes an update directly, bypassing the outbox.
    pub async fn publish_update(
        &self,
        update_type: UpdateType,
        user_id: &UserId,
        data: serde_json::Value,
    ) -> PublishOutcome {
        self.bus.publish_update(update_type, user_id, data).await
    }

    /// Returns the user's recent events, newest first.
    pub async fn recent_events(&self, user_id: &UserId, limit: usize) -> Vec<UpdateEvent> {
        self.bus.recent_events(user_id, limit).await
    }

    /// Enqueues one outbox record per distinct user.
    fn notify<const N: usize>(
        &self,
        users: [&UserId; N],
        update_type: UpdateType,
        data: &serde_json::Value,
        refresh_metrics: bool,
    ) {
        let mut seen: Vec<&UserId> = Vec::with_capacity(N);
        for user_id in users {
            if seen.contains(&user_id) {
                continue;
            }
            seen.push(user_id);
            let record = OutboxRecord {
                user_id: user_id.clone(),
                update_type,
                data: data.clone(),
                refresh_metrics,
            };
            let _ = self.outbox.enqueue(record);
        }
    }
}

fn require_text(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::InvalidRequest(format!("{field} must not be empty")));
    }
    Ok(())
}

fn require_amount(field: &str, value: f64) -> Result<(), AppError> {
    if !value.is_finite() || value < 0.0 {
        return Err(AppError::InvalidRequest(format!(
            "{field} must be a non-negative number"
        )));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use std::time::Duration;

    use chrono::Utc;

    use crate::domain::{MetricsOrigin, OutboxDispatcher};
    use crate::kv::{KvClient, KvStore, MemoryKvStore};
    use crate::persistence::{ContractStatus, MemoryStore};
    use crate::retry::{RetryOn, RetryPolicy};

    fn user(raw: &str) -> UserId {
        let Ok(id) = UserId::parse(raw) else {
            panic!("valid user id");
        };
        id
    }

    fn make_service(kv: &MemoryKvStore, db: &MemoryStore) -> (DashboardService, OutboxDispatcher) {
        let handle: Arc<dyn KvStore> = Arc::new(kv.clone());
        let policy = RetryPolicy::default()
            .with_delay(Duration::from_millis(10))
            .with_retry_on(RetryOn::Transient);
        let client = KvClient::new(Some(handle), policy);
        let store: Arc<dyn RecordStore> = Arc::new(db.clone());
        let cache = MetricsCache::new(client.clone(), Arc::clone(&store));
        let bus = UpdateBus::new(client);
        let (outbox, dispatcher) = Outbox::new(64, cache.clone(), bus.clone());
        (DashboardService::new(store, cache, bus, outbox), dispatcher)
    }

    fn new_booking(client: &str, provider: &str) -> NewBooking {
        NewBooking {
            client_id: user(client),
            provider_id: user(provider),
            service_name: "Translation".to_string(),
            scheduled_at: Utc::now(),
            amount: 75.0,
        }
    }

    #[tokio::test]
    async fn create_booking_enqueues_for_both_participants() {
        let (service, mut dispatcher) = make_service(&MemoryKvStore::new(), &MemoryStore::new());

        let result = service.create_booking(new_booking("c1", "p1")).await;
        assert!(result.is_ok());

        let reports = dispatcher.drain().await;
        assert_eq!(reports.len(), 2);
        assert!(reports.iter().all(|r| r.published && r.metrics_cached));

        for participant in ["c1", "p1"] {
            let events = service.recent_events(&user(participant), 10).await;
            let types: Vec<UpdateType> = events.iter().map(|e| e.update_type).collect();
            assert_eq!(types, vec![UpdateType::Metrics, UpdateType::Booking]);
        }
    }

    #[tokio::test]
    async fn self_booking_notifies_once() {
        let (service, mut dispatcher) = make_service(&MemoryKvStore::new(), &MemoryStore::new());
        let _ = service.create_booking(new_booking("u1", "u1")).await;
        assert_eq!(dispatcher.drain().await.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn booking_survives_kv_outage() {
        let kv = MemoryKvStore::new();
        let db = MemoryStore::new();
        kv.set_unavailable(true);
        let (service, mut dispatcher) = make_service(&kv, &db);

        let Ok(booking) = service.create_booking(new_booking("u1", "p1")).await else {
            panic!("booking must succeed while the cache is down");
        };
        let outcome = service
            .publish_update(UpdateType::Booking, &user("u1"), serde_json::json!({"id": booking.id}))
            .await;
        assert!(!outcome.success);

        let reports = dispatcher.drain().await;
        assert!(reports.iter().all(|r| !r.published && !r.stored));
        assert_eq!(db.bookings().await.len(), 1);
    }

    #[tokio::test]
    async fn status_change_refreshes_cached_metrics() {
        let kv = MemoryKvStore::new();
        let (service, mut dispatcher) = make_service(&kv, &MemoryStore::new());
        let u1 = user("u1");

        let Ok(booking) = service.create_booking(new_booking("u1", "p1")).await else {
            panic!("booking failed");
        };
        dispatcher.drain().await;
        let before = service.dashboard_metrics(&u1).await;
        assert_eq!(before.origin, MetricsOrigin::Cache);
        assert_eq!(before.snapshot.pending_bookings, 1);

        let _ = service
            .update_booking_status(booking.id, BookingStatus::Confirmed)
            .await;
        dispatcher.drain().await;

        let after = service.dashboard_metrics(&u1).await;
        assert_eq!(after.snapshot.pending_bookings, 0);
        assert_eq!(after.snapshot.confirmed_bookings, 1);
    }

    #[tokio::test]
    async fn invalid_input_is_rejected_before_writing() {
        let db = MemoryStore::new();
        let (service, _dispatcher) = make_service(&MemoryKvStore::new(), &db);

        let mut booking = new_booking("c1", "p1");
        booking.amount = -1.0;
        assert!(matches!(
            service.create_booking(booking).await,
            Err(AppError::InvalidRequest(_))
        ));

        let contract = NewContract {
            client_id: user("c1"),
            provider_id: user("p1"),
            title: "  ".to_string(),
            value: 10.0,
            status: ContractStatus::Draft,
        };
        assert!(service.create_contract(contract).await.is_err());
        assert!(db.bookings().await.is_empty());
    }

    #[tokio::test]
    async fn messages_notify_both_sides_without_metrics() {
        let db = MemoryStore::new();
        let (service, mut dispatcher) = make_service(&MemoryKvStore::new(), &db);

        let sent = service
            .send_message(NewMessage {
                sender_id: user("p1"),
                recipient_id: user("c1"),
                body: "Your appointment is confirmed".to_string(),
            })
            .await;
        assert!(sent.is_ok());

        let reports = dispatcher.drain().await;
        assert_eq!(reports.len(), 2);
        assert!(reports.iter().all(|r| r.published && !r.metrics_cached));
        assert_eq!(db.messages().await.len(), 1);
    }
}
