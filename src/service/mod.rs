//! Service layer: business logic orchestration.
//!
//! [`DashboardService`] performs the primary writes against the
//! [`crate::persistence::RecordStore`], hands realtime side effects to the
//! [`crate::domain::Outbox`], and serves cache-aside metrics reads.

pub mod dashboard_service;

pub use dashboard_service::DashboardService;
