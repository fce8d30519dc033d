//! Domain layer: metrics snapshots, realtime updates, and the components
//! that cache and fan them out.
//!
//! This module contains the per-user metrics model and its cache-aside
//! layer, the update event model and the bus that publishes it, and the
//! outbox that decouples both from the primary writes.

pub mod metrics_cache;
pub mod metrics_snapshot;
pub mod outbox;
pub mod update_bus;
pub mod update_event;
pub mod user_id;

pub use metrics_cache::{METRICS_CACHE_TTL, MetricsCache, MetricsOrigin, MetricsRead};
pub use metrics_snapshot::MetricsSnapshot;
pub use outbox::{DispatchReport, Outbox, OutboxDispatcher, OutboxRecord};
pub use update_bus::{PublishOutcome, RECENT_EVENTS_CAPACITY, UpdateBus};
pub use update_event::{UpdateEvent, UpdateType};
pub use user_id::UserId;
