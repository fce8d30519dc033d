//! Publish-only fan-out of realtime updates.
//!
//! [`UpdateBus`] pushes [`UpdateEvent`]s onto named channels of the
//! key-value medium. Subscribers live outside this service. Delivery is
//! at-most-once: a failed publish is logged and reported as `false`, never
//! raised, so it cannot fail the write that triggered it. PUBLISH and LPUSH
//! are resent only when the connection was never established.
//!
//! Independently of the channels, each user has a recovery list holding the
//! last [`RECENT_EVENTS_CAPACITY`] events for dashboards that reconnect.

use serde::Serialize;
use serde_json::{Map, Value};
use utoipa::ToSchema;

use super::update_event::iso_timestamp;
use super::{UpdateEvent, UpdateType, UserId};
use crate::kv::KvClient;
use crate::retry::with_retry_timeout;

/// Maximum number of events kept per user for catch-up.
pub const RECENT_EVENTS_CAPACITY: usize = 100;

/// Result of a typed publish, returned as-is to HTTP callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct PublishOutcome {
    /// Whether the medium accepted the message.
    pub success: bool,
}

/// Fan-out bus over the key-value medium.
#[derive(Debug, Clone)]
pub struct UpdateBus {
    kv: KvClient,
}

impl UpdateBus {
    /// Creates a bus over the given client.
    #[must_use]
    pub fn new(kv: KvClient) -> Self {
        Self { kv }
    }

    /// Returns `true` when a key-value medium is configured.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.kv.is_configured()
    }

    /// Publishes `payload` on `channel` with a generation timestamp.
    ///
    /// Object payloads get a `timestamp` field; anything else is wrapped as
    /// `{"data": payload, "timestamp": ...}`. Returns `false` when the
    /// medium is unconfigured or the publish fails after retries.
    pub async fn publish(&self, channel: &str, payload: Value) -> bool {
        let Some(store) = self.kv.store("update_bus") else {
            return false;
        };

        let message = match serde_json::to_string(&stamp(payload)) {
            Ok(message) => message,
            Err(err) => {
                tracing::error!(channel, error = %err, "failed to serialize update");
                return false;
            }
        };

        match with_retry_timeout(self.kv.write_retry_policy(), || store.publish(channel, &message)).await {
            Ok(receivers) => {
                tracing::debug!(channel, receivers, "update published");
                true
            }
            Err(err) => {
                tracing::warn!(channel, error = %err, "failed to publish update");
                false
            }
        }
    }

    /// Publishes a typed update for `user_id` on the channel of
    /// `update_type`.
    pub async fn publish_update(
        &self,
        update_type: UpdateType,
        user_id: &UserId,
        data: Value,
    ) -> PublishOutcome {
        let payload = serde_json::json!({
            "type": update_type,
            "userId": user_id,
            "data": data,
        });
        PublishOutcome {
            success: self.publish(update_type.channel(), payload).await,
        }
    }

    /// Appends an event to the user's recovery list, keeping the newest
    /// [`RECENT_EVENTS_CAPACITY`] entries.
    pub async fn store_event(&self, user_id: &UserId, update_type: UpdateType, data: Value) -> bool {
        let Some(store) = self.kv.store("update_bus") else {
            return false;
        };

        let key = events_key(user_id);
        let event = UpdateEvent::new(update_type, data);
        let encoded = match serde_json::to_string(&event) {
            Ok(encoded) => encoded,
            Err(err) => {
                tracing::error!(user_id = %user_id, error = %err, "failed to serialize event");
                return false;
            }
        };

        let stop = i64::try_from(RECENT_EVENTS_CAPACITY).unwrap_or(i64::MAX) - 1;
        let result = async {
            with_retry_timeout(self.kv.write_retry_policy(), || store.lpush(&key, &encoded)).await?;
            with_retry_timeout(self.kv.retry_policy(), || store.ltrim(&key, 0, stop)).await
        }
        .await;

        match result {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(user_id = %user_id, error = %err, "failed to store event");
                false
            }
        }
    }

    /// Returns up to `limit` recent events for the user, newest first.
    ///
    /// `limit` is clamped to `1..=RECENT_EVENTS_CAPACITY`. Entries that do
    /// not decode are skipped.
    pub async fn recent_events(&self, user_id: &UserId, limit: usize) -> Vec<UpdateEvent> {
        let Some(store) = self.kv.store("update_bus") else {
            return Vec::new();
        };

        let key = events_key(user_id);
        let limit = limit.clamp(1, RECENT_EVENTS_CAPACITY);
        let stop = i64::try_from(limit).unwrap_or(i64::MAX) - 1;

        let raw = match with_retry_timeout(self.kv.retry_policy(), || store.lrange(&key, 0, stop)).await {
            Ok(raw) => raw,
            Err(err) => {
                tracing::warn!(user_id = %user_id, error = %err, "failed to read recent events");
                return Vec::new();
            }
        };

        raw.iter()
            .filter_map(|entry| match serde_json::from_str::<UpdateEvent>(entry) {
                Ok(event) => Some(event),
                Err(err) => {
                    tracing::debug!(user_id = %user_id, error = %err, "skipping undecodable event");
                    None
                }
            })
            .collect()
    }
}

/// Recovery-list key for a user.
fn events_key(user_id: &UserId) -> String {
    format!("events:{user_id}")
}

/// Attaches the generation timestamp to a payload.
fn stamp(payload: Value) -> Value {
    let timestamp = Value::String(iso_timestamp(chrono::Utc::now()));
    match payload {
        Value::Object(mut map) => {
            map.insert("timestamp".to_string(), timestamp);
            Value::Object(map)
        }
        other => {
            let mut map = Map::new();
            map.insert("data".to_string(), other);
            map.insert("timestamp".to_string(), timestamp);
            Value::Object(map)
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;

    use crate::kv::{KvResult, KvStore, MemoryKvStore};
    use crate::retry::{RetryOn, RetryPolicy};

    fn user(raw: &str) -> UserId {
        let Ok(id) = UserId::parse(raw) else {
            panic!("valid user id");
        };
        id
    }

    fn bus_with(store: &MemoryKvStore) -> UpdateBus {
        let handle: Arc<dyn KvStore> = Arc::new(store.clone());
        let policy = RetryPolicy::default()
            .with_delay(Duration::from_millis(10))
            .with_retry_on(RetryOn::Transient);
        UpdateBus::new(KvClient::new(Some(handle), policy))
    }

    #[tokio::test]
    async fn publish_without_credentials_returns_false() {
        let bus = UpdateBus::new(KvClient::disabled());
        for channel in UpdateType::ALL.map(UpdateType::channel) {
            assert!(!bus.publish(channel, serde_json::json!({"id": 1})).await);
        }
        let outcome = bus
            .publish_update(UpdateType::Booking, &user("u1"), serde_json::json!({}))
            .await;
        assert!(!outcome.success);
    }

    #[tokio::test]
    async fn publish_attaches_timestamp() {
        let store = MemoryKvStore::new();
        let bus = bus_with(&store);
        let mut rx = store.subscribe("booking-updates").await;

        assert!(bus.publish("booking-updates", serde_json::json!({"id": 42})).await);

        let Ok(raw) = rx.recv().await else {
            panic!("expected message");
        };
        let Ok(msg) = serde_json::from_str::<Value>(&raw) else {
            panic!("message should be JSON");
        };
        assert_eq!(msg.get("id"), Some(&serde_json::json!(42)));
        assert!(msg.get("timestamp").and_then(Value::as_str).is_some());
    }

    #[test]
    fn scalar_payloads_are_wrapped() {
        let stamped = stamp(serde_json::json!("refresh"));
        assert_eq!(stamped.get("data"), Some(&serde_json::json!("refresh")));
        assert!(stamped.get("timestamp").is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn publish_during_outage_returns_false() {
        let store = MemoryKvStore::new();
        store.set_unavailable(true);
        let bus = bus_with(&store);
        assert!(!bus.publish("metrics-updates", serde_json::json!({})).await);
    }

    #[tokio::test]
    async fn recovery_list_keeps_newest_hundred() {
        let store = MemoryKvStore::new();
        let bus = bus_with(&store);
        let u1 = user("u1");

        for seq in 0..150 {
            assert!(bus.store_event(&u1, UpdateType::Booking, serde_json::json!({"seq": seq})).await);
        }

        let events = bus.recent_events(&u1, 100).await;
        assert_eq!(events.len(), 100);
        let seqs: Vec<i64> = events
            .iter()
            .filter_map(|e| e.data.get("seq").and_then(Value::as_i64))
            .collect();
        let expected: Vec<i64> = (50..150).rev().collect();
        assert_eq!(seqs, expected);
    }

    #[tokio::test]
    async fn recent_events_clamps_limit_and_isolates_users() {
        let store = MemoryKvStore::new();
        let bus = bus_with(&store);
        let (u1, u2) = (user("u1"), user("u2"));

        for seq in 0..5 {
            bus.store_event(&u1, UpdateType::Message, serde_json::json!({"seq": seq}))
                .await;
        }

        assert_eq!(bus.recent_events(&u1, 2).await.len(), 2);
        assert_eq!(bus.recent_events(&u1, 0).await.len(), 1);
        assert_eq!(bus.recent_events(&u1, 10_000).await.len(), 5);
        assert!(bus.recent_events(&u2, 100).await.is_empty());
    }

    /// Applies PUBLISH and LPUSH, then answers after the attempt timeout.
    #[derive(Debug)]
    struct LateReplyStore {
        inner: MemoryKvStore,
        writes: AtomicU32,
    }

    #[async_trait]
    impl KvStore for LateReplyStore {
        async fn get(&self, key: &str) -> KvResult<Option<String>> {
            self.inner.get(key).await
        }

        async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> KvResult<()> {
            self.inner.set_ex(key, value, ttl).await
        }

        async fn publish(&self, channel: &str, message: &str) -> KvResult<u64> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            let receivers = self.inner.publish(channel, message).await?;
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(receivers)
        }

        async fn lpush(&self, key: &str, value: &str) -> KvResult<u64> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            let len = self.inner.lpush(key, value).await?;
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(len)
        }

        async fn ltrim(&self, key: &str, start: i64, stop: i64) -> KvResult<()> {
            self.inner.ltrim(key, start, stop).await
        }

        async fn lrange(&self, key: &str, start: i64, stop: i64) -> KvResult<Vec<String>> {
            self.inner.lrange(key, start, stop).await
        }
    }

    fn late_reply_bus(inner: &MemoryKvStore) -> (UpdateBus, Arc<LateReplyStore>) {
        let slow = Arc::new(LateReplyStore {
            inner: inner.clone(),
            writes: AtomicU32::new(0),
        });
        let handle: Arc<dyn KvStore> = Arc::clone(&slow) as Arc<dyn KvStore>;
        let policy = RetryPolicy::default()
            .with_delay(Duration::from_millis(10))
            .with_retry_on(RetryOn::Transient)
            .with_attempt_timeout(Duration::from_secs(2));
        (UpdateBus::new(KvClient::new(Some(handle), policy)), slow)
    }

    #[tokio::test(start_paused = true)]
    async fn timed_out_lpush_is_not_resent() {
        let inner = MemoryKvStore::new();
        let (bus, slow) = late_reply_bus(&inner);
        let u1 = user("u1");

        assert!(!bus.store_event(&u1, UpdateType::Booking, serde_json::json!({"seq": 1})).await);

        assert_eq!(slow.writes.load(Ordering::SeqCst), 1);
        let Ok(entries) = inner.lrange("events:u1", 0, -1).await else {
            panic!("list should be readable");
        };
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn timed_out_publish_is_not_resent() {
        let inner = MemoryKvStore::new();
        let mut rx = inner.subscribe("booking-updates").await;
        let (bus, slow) = late_reply_bus(&inner);

        assert!(!bus.publish("booking-updates", serde_json::json!({"id": 7})).await);

        assert_eq!(slow.writes.load(Ordering::SeqCst), 1);
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn undecodable_entries_are_skipped() {
        let store = MemoryKvStore::new();
        let bus = bus_with(&store);
        let u1 = user("u1");

        bus.store_event(&u1, UpdateType::Contract, serde_json::json!({"id": 1}))
            .await;
        let _ = store.lpush("events:u1", "not json").await;

        let events = bus.recent_events(&u1, 100).await;
        assert_eq!(events.len(), 1);
        assert_eq!(events.first().map(|e| e.update_type), Some(UpdateType::Contract));
    }
}
