//! Key-value medium: cache entries, pub/sub channels and per-user lists.
//!
//! [`KvStore`] is the seam between the realtime core and the hosted
//! key-value service. Two backends exist:
//!
//! - [`RestKvStore`]: HTTPS endpoint + bearer token, one JSON command per request
//! - [`MemoryKvStore`]: in-process maps, used for local runs and tests
//!
//! When no credentials are configured the application holds no store at
//! all (`Option<Arc<dyn KvStore>>` is `None`) and every caller degrades to
//! its safe default.

pub mod client;
pub mod error;
pub mod memory;
pub mod rest;

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

pub use client::KvClient;
pub use error::{KvError, KvErrorKind};
pub use memory::MemoryKvStore;
pub use rest::RestKvStore;

/// Result alias for key-value operations.
pub type KvResult<T> = Result<T, KvError>;

/// Shared, optional handle to the configured store.
pub type KvHandle = Option<Arc<dyn KvStore>>;

/// Commands the realtime core issues against the key-value medium.
#[async_trait]
pub trait KvStore: Send + Sync + Debug {
    /// `GET key`. Expired or missing keys yield `None`.
    async fn get(&self, key: &str) -> KvResult<Option<String>>;

    /// `SET key value EX ttl`.
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> KvResult<()>;

    /// `PUBLISH channel message`. Returns the number of receivers.
    async fn publish(&self, channel: &str, message: &str) -> KvResult<u64>;

    /// `LPUSH key value`. Returns the new list length.
    async fn lpush(&self, key: &str, value: &str) -> KvResult<u64>;

    /// `LTRIM key start stop` (inclusive, Redis semantics).
    async fn ltrim(&self, key: &str, start: i64, stop: i64) -> KvResult<()>;

    /// `LRANGE key start stop` (inclusive, Redis semantics).
    async fn lrange(&self, key: &str, start: i64, stop: i64) -> KvResult<Vec<String>>;
}

/// Resolves a Redis-style inclusive `[start, stop]` range against a list of
/// length `len`, returning a half-open index range. Negative indices count
/// from the end.
pub(crate) fn resolve_range(len: usize, start: i64, stop: i64) -> Option<(usize, usize)> {
    let len_i = i64::try_from(len).ok()?;
    let norm = |i: i64| if i < 0 { len_i + i } else { i };
    let start = norm(start).max(0);
    let stop = norm(stop).min(len_i - 1);
    if start > stop || start >= len_i {
        return None;
    }
    let start = usize::try_from(start).ok()?;
    let end = usize::try_from(stop).ok()?.checked_add(1)?;
    Some((start, end))
}
