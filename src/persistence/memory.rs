//! In-process record store.
//!
//! Keeps rows in `tokio::sync::RwLock`-protected vectors and computes the
//! dashboard aggregate the same way the `dashboard_metrics` view does:
//! bookings where the user is client or provider, contracts where the user
//! is a party.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::RecordStore;
use super::models::{
    Booking, BookingStatus, Contract, ContractStatus, Message, NewBooking, NewContract, NewMessage,
};
use crate::domain::{MetricsSnapshot, UserId};
use crate::error::AppError;

/// Record store backed by process memory. Cloning shares the rows.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    bookings: Arc<RwLock<Vec<Booking>>>,
    contracts: Arc<RwLock<Vec<Contract>>>,
    messages: Arc<RwLock<Vec<Message>>>,
    unavailable: Arc<AtomicBool>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail with a persistence error (or
    /// succeed again when `false`).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Returns a copy of every stored booking.
    pub async fn bookings(&self) -> Vec<Booking> {
        self.bookings.read().await.clone()
    }

    /// Returns a copy of every stored message.
    pub async fn messages(&self) -> Vec<Message> {
        self.messages.read().await.clone()
    }

    fn check_available(&self) -> Result<(), AppError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AppError::PersistenceError(
                "in-memory store marked unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn fetch_metrics(&self, user_id: &UserId) -> Result<MetricsSnapshot, AppError> {
        self.check_available()?;
        let mut snapshot = MetricsSnapshot::default();

        for booking in self.bookings.read().await.iter() {
            if booking.client_id != *user_id && booking.provider_id != *user_id {
                continue;
            }
            snapshot.total_bookings += 1;
            match booking.status {
                BookingStatus::Confirmed => snapshot.confirmed_bookings += 1,
                BookingStatus::Pending => snapshot.pending_bookings += 1,
                BookingStatus::Cancelled => snapshot.cancelled_bookings += 1,
                BookingStatus::Completed => {}
            }
        }

        for contract in self.contracts.read().await.iter() {
            if contract.client_id != *user_id && contract.provider_id != *user_id {
                continue;
            }
            snapshot.total_contracts += 1;
            snapshot.total_contract_value += contract.value;
            if contract.status == ContractStatus::Signed {
                snapshot.signed_contracts += 1;
            }
        }

        Ok(snapshot)
    }

    async fn insert_booking(&self, booking: &NewBooking) -> Result<Booking, AppError> {
        self.check_available()?;
        let row = Booking {
            id: Uuid::new_v4(),
            client_id: booking.client_id.clone(),
            provider_id: booking.provider_id.clone(),
            service_name: booking.service_name.clone(),
            scheduled_at: booking.scheduled_at,
            amount: booking.amount,
            status: BookingStatus::Pending,
            created_at: Utc::now(),
        };
        self.bookings.write().await.push(row.clone());
        Ok(row)
    }

    async fn update_booking_status(
        &self,
        booking_id: Uuid,
        status: BookingStatus,
    ) -> Result<Booking, AppError> {
        self.check_available()?;
        let mut bookings = self.bookings.write().await;
        let booking = bookings
            .iter_mut()
            .find(|b| b.id == booking_id)
            .ok_or(AppError::BookingNotFound(booking_id))?;
        booking.status = status;
        Ok(booking.clone())
    }

    async fn insert_contract(&self, contract: &NewContract) -> Result<Contract, AppError> {
        self.check_available()?;
        let row = Contract {
            id: Uuid::new_v4(),
            client_id: contract.client_id.clone(),
            provider_id: contract.provider_id.clone(),
            title: contract.title.clone(),
            value: contract.value,
            status: contract.status,
            created_at: Utc::now(),
        };
        self.contracts.write().await.push(row.clone());
        Ok(row)
    }

    async fn insert_message(&self, message: &NewMessage) -> Result<Message, AppError> {
        self.check_available()?;
        let row = Message {
            id: Uuid::new_v4(),
            sender_id: message.sender_id.clone(),
            recipient_id: message.recipient_id.clone(),
            body: message.body.clone(),
            created_at: Utc::now(),
        };
        self.messages.write().await.push(row.clone());
        Ok(row)
    }
}
