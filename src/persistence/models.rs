//! Rows of the relational store and their insert payloads.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::UserId;
use crate::error::AppError;

/// Lifecycle of a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    /// Requested by the client, awaiting the provider.
    Pending,
    /// Accepted by the provider.
    Confirmed,
    /// Called off by either side.
    Cancelled,
    /// Service delivered.
    Completed,
}

/// Lifecycle of a contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ContractStatus {
    /// Being drafted.
    Draft,
    /// Sent for signature.
    Sent,
    /// Signed by both parties.
    Signed,
    /// Withdrawn.
    Cancelled,
}

macro_rules! status_strings {
    ($ty:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        impl $ty {
            /// Returns the status as stored in the database.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $s,)+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = AppError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant),)+
                    other => Err(AppError::InvalidRequest(format!(
                        concat!("unknown ", stringify!($ty), ": {}"),
                        other
                    ))),
                }
            }
        }
    };
}

status_strings!(BookingStatus {
    Pending => "pending",
    Confirmed => "confirmed",
    Cancelled => "cancelled",
    Completed => "completed",
});

status_strings!(ContractStatus {
    Draft => "draft",
    Sent => "sent",
    Signed => "signed",
    Cancelled => "cancelled",
});

/// A row of the `bookings` table.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    /// Row ID.
    pub id: Uuid,
    /// Client who booked.
    pub client_id: UserId,
    /// Provider delivering the service.
    pub provider_id: UserId,
    /// Booked service name.
    pub service_name: String,
    /// Appointment time.
    pub scheduled_at: DateTime<Utc>,
    /// Agreed price.
    pub amount: f64,
    /// Current status.
    pub status: BookingStatus,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// Insert payload for [`Booking`]. New bookings start as `pending`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBooking {
    /// Client who books.
    pub client_id: UserId,
    /// Provider delivering the service.
    pub provider_id: UserId,
    /// Service name.
    pub service_name: String,
    /// Appointment time.
    pub scheduled_at: DateTime<Utc>,
    /// Agreed price.
    pub amount: f64,
}

/// A row of the `contracts` table.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Contract {
    /// Row ID.
    pub id: Uuid,
    /// Client party.
    pub client_id: UserId,
    /// Provider party.
    pub provider_id: UserId,
    /// Contract title.
    pub title: String,
    /// Contract value.
    pub value: f64,
    /// Current status.
    pub status: ContractStatus,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// Insert payload for [`Contract`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewContract {
    /// Client party.
    pub client_id: UserId,
    /// Provider party.
    pub provider_id: UserId,
    /// Contract title.
    pub title: String,
    /// Contract value.
    pub value: f64,
    /// Initial status.
    pub status: ContractStatus,
}

/// A row of the `messages` table.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Row ID.
    pub id: Uuid,
    /// Author.
    pub sender_id: UserId,
    /// Addressee.
    pub recipient_id: UserId,
    /// Message text.
    pub body: String,
    /// Send time.
    pub created_at: DateTime<Utc>,
}

/// Insert payload for [`Message`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewMessage {
    /// Author.
    pub sender_id: UserId,
    /// Addressee.
    pub recipient_id: UserId,
    /// Message text.
    pub body: String,
}
