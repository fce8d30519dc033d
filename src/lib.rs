//! # smartpro-realtime
//!
//! Dashboard metrics cache, realtime update bus, and retry core for the
//! SmartPRO business-services platform.
//!
//! The relational store is the source of truth. A key-value medium sits
//! beside it as a best-effort cache and pub/sub transport: when it is
//! missing or down, dashboards fall back to the database (or to zero
//! metrics) and writes still succeed.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP)
//!     │
//!     ├── REST Handlers (api/)
//!     │
//!     ├── DashboardService (service/)
//!     │       │
//!     │       ├── RecordStore ── PostgreSQL / memory (persistence/)
//!     │       └── Outbox ──► OutboxDispatcher (domain/)
//!     │                           │
//!     ├── MetricsCache ◄──────────┤
//!     ├── UpdateBus ◄─────────────┘
//!     │
//!     ├── with_retry (retry)
//!     └── KvStore ── REST endpoint / memory (kv/)
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod kv;
pub mod persistence;
pub mod retry;
pub mod service;
