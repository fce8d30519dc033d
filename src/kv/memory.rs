//! In-memory key-value backend.
//!
//! Mirrors the REST backend closely enough for local runs and tests:
//!
//! - string values with lazy TTL expiry measured on [`tokio::time::Instant`],
//!   so a paused test clock can fast-forward past it
//! - lists with Redis `LPUSH`/`LTRIM`/`LRANGE` semantics
//! - pub/sub channels backed by [`tokio::sync::broadcast`]
//!
//! [`MemoryKvStore::set_unavailable`] simulates an outage of the medium.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{RwLock, broadcast};
use tokio::time::Instant;

use super::{KvError, KvErrorKind, KvResult, KvStore, resolve_range};

/// Capacity of each in-memory pub/sub channel.
const CHANNEL_CAPACITY: usize = 256;

/// Shortest expiry accepted by `SET EX`, matching the REST backend.
const MIN_TTL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
enum Entry {
    Value {
        value: String,
        expires_at: Option<Instant>,
    },
    List(VecDeque<String>),
}

impl Entry {
    fn is_expired(&self) -> bool {
        match self {
            Self::Value {
                expires_at: Some(at),
                ..
            } => Instant::now() >= *at,
            _ => false,
        }
    }
}

/// Thread-safe in-memory store. Cloning shares the underlying maps.
#[derive(Debug, Clone, Default)]
pub struct MemoryKvStore {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
    channels: Arc<RwLock<HashMap<String, broadcast::Sender<String>>>>,
    unavailable: Arc<AtomicBool>,
}

impl MemoryKvStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent command fail with [`KvErrorKind::Unavailable`]
    /// (or succeed again when `false`).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Subscribes to a channel. Messages published before this call are not
    /// delivered.
    pub async fn subscribe(&self, channel: &str) -> broadcast::Receiver<String> {
        let mut channels = self.channels.write().await;
        channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    fn check_available(&self) -> KvResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(KvError::new(
                KvErrorKind::Unavailable,
                "in-memory store marked unavailable",
            ));
        }
        Ok(())
    }
}

fn wrong_type(key: &str) -> KvError {
    KvError::new(
        KvErrorKind::Command,
        format!("WRONGTYPE operation against key {key} holding the wrong kind of value"),
    )
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, key: &str) -> KvResult<Option<String>> {
        self.check_available()?;
        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(Entry::is_expired) {
            entries.remove(key);
            return Ok(None);
        }
        match entries.get(key) {
            Some(Entry::Value { value, .. }) => Ok(Some(value.clone())),
            Some(Entry::List(_)) => Err(wrong_type(key)),
            None => Ok(None),
        }
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> KvResult<()> {
        self.check_available()?;
        let entry = Entry::Value {
            value: value.to_string(),
            expires_at: Some(Instant::now() + ttl.max(MIN_TTL)),
        };
        self.entries.write().await.insert(key.to_string(), entry);
        Ok(())
    }

    async fn publish(&self, channel: &str, message: &str) -> KvResult<u64> {
        self.check_available()?;
        let channels = self.channels.read().await;
        let delivered = channels
            .get(channel)
            .and_then(|tx| tx.send(message.to_string()).ok())
            .unwrap_or(0);
        Ok(u64::try_from(delivered).unwrap_or(u64::MAX))
    }

    async fn lpush(&self, key: &str, value: &str) -> KvResult<u64> {
        self.check_available()?;
        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(Entry::is_expired) {
            entries.remove(key);
        }
        let entry = entries
            .entry(key.to_string())
            .or_insert_with(|| Entry::List(VecDeque::new()));
        let Entry::List(list) = entry else {
            return Err(wrong_type(key));
        };
        list.push_front(value.to_string());
        Ok(u64::try_from(list.len()).unwrap_or(u64::MAX))
    }

    async fn ltrim(&self, key: &str, start: i64, stop: i64) -> KvResult<()> {
        self.check_available()?;
        let mut entries = self.entries.write().await;
        let Some(entry) = entries.get_mut(key) else {
            return Ok(());
        };
        let Entry::List(list) = entry else {
            return Err(wrong_type(key));
        };
        match resolve_range(list.len(), start, stop) {
            Some((from, to)) => {
                list.truncate(to);
                list.drain(..from);
            }
            None => {
                entries.remove(key);
            }
        }
        Ok(())
    }

    async fn lrange(&self, key: &str, start: i64, stop: i64) -> KvResult<Vec<String>> {
        self.check_available()?;
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some(Entry::List(list)) => Ok(resolve_range(list.len(), start, stop)
                .map(|(from, to)| list.range(from..to).cloned().collect())
                .unwrap_or_default()),
            Some(Entry::Value { .. }) => Err(wrong_type(key)),
            None => Ok(Vec::new()),
        }
    }
}
