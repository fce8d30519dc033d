//! PostgreSQL implementation of the persistence layer.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::models::{
    Booking, BookingStatus, Contract, ContractStatus, Message, NewBooking, NewContract, NewMessage,
};
use super::RecordStore;
use crate::domain::{MetricsSnapshot, UserId};
use crate::error::AppError;

type BookingRow = (Uuid, String, String, String, DateTime<Utc>, f64, String, DateTime<Utc>);
type ContractRow = (Uuid, String, String, String, f64, String, DateTime<Utc>);
type MetricsRow = (i64, i64, i64, i64, i64, i64, f64);

const BOOKING_COLUMNS: &str =
    "id, client_id, provider_id, service_name, scheduled_at, amount::float8, status, created_at";

/// PostgreSQL-backed record store using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new store with the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn non_negative(v: i64) -> u64 {
    u64::try_from(v).unwrap_or(0)
}

fn booking_from_row(row: BookingRow) -> Result<Booking, AppError> {
    let (id, client_id, provider_id, service_name, scheduled_at, amount, status, created_at) = row;
    Ok(Booking {
        id,
        client_id: UserId::parse(client_id).map_err(|e| AppError::PersistenceError(e.to_string()))?,
        provider_id: UserId::parse(provider_id)
            .map_err(|e| AppError::PersistenceError(e.to_string()))?,
        service_name,
        scheduled_at,
        amount,
        status: status
            .parse::<BookingStatus>()
            .map_err(|e| AppError::PersistenceError(e.to_string()))?,
        created_at,
    })
}

fn contract_from_row(row: ContractRow) -> Result<Contract, AppError> {
    let (id, client_id, provider_id, title, value, status, created_at) = row;
    Ok(Contract {
        id,
        client_id: UserId::parse(client_id).map_err(|e| AppError::PersistenceError(e.to_string()))?,
        provider_id: UserId::parse(provider_id)
            .map_err(|e| AppError::PersistenceError(e.to_string()))?,
        title,
        value,
        status: status
            .parse::<ContractStatus>()
            .map_err(|e| AppError::PersistenceError(e.to_string()))?,
        created_at,
    })
}

#[async_trait]
impl RecordStore for PostgresStore {
    /// Reads the `dashboard_metrics` view.
    ///
    /// # Errors
    ///
    /// Returns an [`AppError::PersistenceError`] on database failure.
    async fn fetch_metrics(&self, user_id: &UserId) -> Result<MetricsSnapshot, AppError> {
        let row = sqlx::query_as::<_, MetricsRow>(
            "SELECT total_bookings, confirmed_bookings, pending_bookings, cancelled_bookings, \
             total_contracts, signed_contracts, total_contract_value::float8 \
             FROM dashboard_metrics WHERE user_id = $1",
        )
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        let Some((total, confirmed, pending, cancelled, contracts, signed, value)) = row else {
            return Ok(MetricsSnapshot::default());
        };

        Ok(MetricsSnapshot {
            total_bookings: non_negative(total),
            confirmed_bookings: non_negative(confirmed),
            pending_bookings: non_negative(pending),
            cancelled_bookings: non_negative(cancelled),
            total_contracts: non_negative(contracts),
            signed_contracts: non_negative(signed),
            total_contract_value: value.max(0.0),
        })
    }

    async fn insert_booking(&self, booking: &NewBooking) -> Result<Booking, AppError> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "INSERT INTO bookings (id, client_id, provider_id, service_name, scheduled_at, amount, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {BOOKING_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(booking.client_id.as_str())
        .bind(booking.provider_id.as_str())
        .bind(&booking.service_name)
        .bind(booking.scheduled_at)
        .bind(booking.amount)
        .bind(BookingStatus::Pending.as_str())
        .fetch_one(&self.pool)
        .await?;

        booking_from_row(row)
    }

    async fn update_booking_status(
        &self,
        booking_id: Uuid,
        status: BookingStatus,
    ) -> Result<Booking, AppError> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "UPDATE bookings SET status = $2, updated_at = now() WHERE id = $1 \
             RETURNING {BOOKING_COLUMNS}"
        ))
        .bind(booking_id)
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::BookingNotFound(booking_id))?;

        booking_from_row(row)
    }

    async fn insert_contract(&self, contract: &NewContract) -> Result<Contract, AppError> {
        let row = sqlx::query_as::<_, ContractRow>(
            "INSERT INTO contracts (id, client_id, provider_id, title, value, status) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING id, client_id, provider_id, title, value::float8, status, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(contract.client_id.as_str())
        .bind(contract.provider_id.as_str())
        .bind(&contract.title)
        .bind(contract.value)
        .bind(contract.status.as_str())
        .fetch_one(&self.pool)
        .await?;

        contract_from_row(row)
    }

    async fn insert_message(&self, message: &NewMessage) -> Result<Message, AppError> {
        let (id, created_at) = sqlx::query_as::<_, (Uuid, DateTime<Utc>)>(
            "INSERT INTO messages (id, sender_id, recipient_id, body) VALUES ($1, $2, $3, $4) \
             RETURNING id, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(message.sender_id.as_str())
        .bind(message.recipient_id.as_str())
        .bind(&message.body)
        .fetch_one(&self.pool)
        .await?;

        Ok(Message {
            id,
            sender_id: message.sender_id.clone(),
            recipient_id: message.recipient_id.clone(),
            body: message.body.clone(),
            created_at,
        })
    }
}
