//! Optional store handle shared by the cache and the update bus.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::{KvHandle, KvStore};
use crate::retry::{RetryOn, RetryPolicy};

/// The configured key-value store (if any) and the retry policies for calls
/// against it.
///
/// Idempotent commands (GET, SET, LTRIM, LRANGE) use the configured policy.
/// PUBLISH and LPUSH use a copy restricted to [`RetryOn::Unsent`]: a
/// timed-out attempt may already have been applied, and resending it would
/// deliver or record the update twice.
///
/// Clones share the "already warned" flag, so an unconfigured medium is
/// reported once per process rather than once per request.
#[derive(Debug, Clone)]
pub struct KvClient {
    store: KvHandle,
    retry: RetryPolicy,
    write_retry: RetryPolicy,
    warned: Arc<AtomicBool>,
}

impl KvClient {
    /// Wraps an optional store.
    #[must_use]
    pub fn new(store: KvHandle, retry: RetryPolicy) -> Self {
        let write_retry = retry.clone().with_retry_on(RetryOn::Unsent);
        Self {
            store,
            retry,
            write_retry,
            warned: Arc::new(AtomicBool::new(false)),
        }
    }

    /// A client with no store; every caller degrades to its default.
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(None, RetryPolicy::default())
    }

    /// Returns `true` if a store is configured.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.store.is_some()
    }

    /// Returns the retry policy for idempotent commands.
    #[must_use]
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Returns the retry policy for commands that must not be applied twice.
    #[must_use]
    pub fn write_retry_policy(&self) -> &RetryPolicy {
        &self.write_retry
    }

    /// Returns the store, logging a warning the first time it is missing.
    pub fn store(&self, component: &'static str) -> Option<&dyn KvStore> {
        match &self.store {
            Some(store) => Some(store.as_ref()),
            None => {
                if !self.warned.swap(true, Ordering::Relaxed) {
                    tracing::warn!(component, "key-value store not configured; realtime features disabled");
                }
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryKvStore;

    #[test]
    fn disabled_client_has_no_store() {
        let client = KvClient::disabled();
        assert!(!client.is_configured());
        assert!(client.store("test").is_none());
        assert!(client.store("test").is_none());
    }

    #[test]
    fn configured_client_exposes_store() {
        let store: Arc<dyn KvStore> = Arc::new(MemoryKvStore::new());
        let client = KvClient::new(Some(store), RetryPolicy::default());
        assert!(client.is_configured());
        assert!(client.store("test").is_some());
    }

    #[test]
    fn write_policy_keeps_timing_but_only_resends_unsent() {
        let policy = RetryPolicy::default().with_retry_on(RetryOn::Transient);
        let client = KvClient::new(None, policy.clone());
        assert_eq!(client.retry_policy(), &policy);
        assert_eq!(client.write_retry_policy().retry_on, RetryOn::Unsent);
        assert_eq!(client.write_retry_policy().delay, policy.delay);
        assert_eq!(client.write_retry_policy().max_retries, policy.max_retries);
    }
}
