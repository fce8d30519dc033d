//! Persistence layer: the relational source of truth.
//!
//! Provides the [`RecordStore`] trait for the primary writes (bookings,
//! contracts, messages) and the `dashboard_metrics` aggregate. The
//! production implementation uses `sqlx::PgPool`; [`MemoryStore`] keeps
//! rows in process for local runs and tests.

pub mod memory;
pub mod models;
pub mod postgres;

use std::fmt::Debug;

use async_trait::async_trait;
use uuid::Uuid;

pub use memory::MemoryStore;
pub use models::{
    Booking, BookingStatus, Contract, ContractStatus, Message, NewBooking, NewContract, NewMessage,
};
pub use postgres::PostgresStore;

use crate::domain::{MetricsSnapshot, UserId};
use crate::error::AppError;

/// Relational store operations used by the service layer.
#[async_trait]
pub trait RecordStore: Send + Sync + Debug {
    /// Reads the dashboard aggregate for a user. Users without any rows get
    /// the zero snapshot.
    async fn fetch_metrics(&self, user_id: &UserId) -> Result<MetricsSnapshot, AppError>;

    /// Inserts a booking with status `pending`.
    async fn insert_booking(&self, booking: &NewBooking) -> Result<Booking, AppError>;

    /// Changes the status of an existing booking.
    async fn update_booking_status(
        &self,
        booking_id: Uuid,
        status: BookingStatus,
    ) -> Result<Booking, AppError>;

    /// Inserts a contract.
    async fn insert_contract(&self, contract: &NewContract) -> Result<Contract, AppError>;

    /// Inserts a message.
    async fn insert_message(&self, message: &NewMessage) -> Result<Message, AppError>;
}
