//! Cache-aside layer for dashboard metrics.
//!
//! [`MetricsCache`] keeps one [`MetricsSnapshot`] per user in the key-value
//! medium under `dashboard_metrics:{user_id}` with a fixed TTL. Reads try the
//! cache first; on a miss the caller (or [`MetricsCache::load`]) refreshes
//! from the relational store and writes the result back.
//!
//! Nothing here returns an error. The cache is an optimization and the
//! dashboard must render even when both media are down, so every failure
//! is logged and mapped to `None`, `false`, or the zero snapshot.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use utoipa::ToSchema;

use super::{MetricsSnapshot, UserId};
use crate::kv::KvClient;
use crate::persistence::RecordStore;
use crate::retry::with_retry_timeout;

/// Lifetime of a cached snapshot.
pub const METRICS_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Where a snapshot returned by [`MetricsCache::load`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MetricsOrigin {
    /// Served from the key-value cache.
    Cache,
    /// Recomputed from the relational store.
    Database,
    /// Neither medium answered; all counters are zero.
    Default,
}

/// Result of a cache-aside read.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsRead {
    /// The snapshot to render.
    pub snapshot: MetricsSnapshot,
    /// Where it came from.
    pub origin: MetricsOrigin,
}

/// Cache-aside access to per-user metrics.
#[derive(Debug, Clone)]
pub struct MetricsCache {
    kv: KvClient,
    source: Arc<dyn RecordStore>,
    ttl: Duration,
}

impl MetricsCache {
    /// Creates a cache over `kv` that falls back to `source`.
    #[must_use]
    pub fn new(kv: KvClient, source: Arc<dyn RecordStore>) -> Self {
        Self {
            kv,
            source,
            ttl: METRICS_CACHE_TTL,
        }
    }

    /// Overrides the entry lifetime.
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Returns the entry lifetime.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the cached snapshot, or `None` when the medium is
    /// unconfigured, the entry is missing or expired, or the read fails.
    ///
    /// `None` means "ask the source of truth", never "zero metrics".
    pub async fn get(&self, user_id: &UserId) -> Option<MetricsSnapshot> {
        let store = self.kv.store("metrics_cache")?;
        let key = cache_key(user_id);

        let raw = match with_retry_timeout(self.kv.retry_policy(), || store.get(&key)).await {
            Ok(raw) => raw?,
            Err(err) => {
                tracing::warn!(user_id = %user_id, error = %err, "metrics cache read failed");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(snapshot) => Some(snapshot),
            Err(err) => {
                tracing::warn!(user_id = %user_id, error = %err, "discarding undecodable metrics entry");
                None
            }
        }
    }

    /// Recomputes the snapshot from the relational store. A failing query
    /// is logged and yields `None`.
    pub async fn refresh(&self, user_id: &UserId) -> Option<MetricsSnapshot> {
        match self.source.fetch_metrics(user_id).await {
            Ok(snapshot) => Some(snapshot),
            Err(err) => {
                tracing::error!(user_id = %user_id, error = %err, "metrics query failed");
                None
            }
        }
    }

    /// Writes the snapshot with the configured TTL. Returns whether the
    /// write succeeded.
    pub async fn store(&self, user_id: &UserId, snapshot: &MetricsSnapshot) -> bool {
        let Some(store) = self.kv.store("metrics_cache") else {
            return false;
        };
        let key = cache_key(user_id);

        let value = match serde_json::to_string(snapshot) {
            Ok(value) => value,
            Err(err) => {
                tracing::error!(user_id = %user_id, error = %err, "failed to serialize metrics");
                return false;
            }
        };

        match with_retry_timeout(self.kv.retry_policy(), || store.set_ex(&key, &value, self.ttl)).await {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(user_id = %user_id, error = %err, "metrics cache write failed");
                false
            }
        }
    }

    /// Cache-aside read: cache, else database (written back), else the zero
    /// snapshot.
    pub async fn load(&self, user_id: &UserId) -> MetricsRead {
        if let Some(snapshot) = self.get(user_id).await {
            return MetricsRead {
                snapshot,
                origin: MetricsOrigin::Cache,
            };
        }

        match self.refresh(user_id).await {
            Some(snapshot) => {
                self.store(user_id, &snapshot).await;
                MetricsRead {
                    snapshot,
                    origin: MetricsOrigin::Database,
                }
            }
            None => MetricsRead {
                snapshot: MetricsSnapshot::default(),
                origin: MetricsOrigin::Default,
            },
        }
    }
}

/// Cache key for a user's snapshot.
fn cache_key(user_id: &UserId) -> String {
    format!("dashboard_metrics:{user_id}")
}
