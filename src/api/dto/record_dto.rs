//! Request bodies for booking, contract, and message writes.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::error::AppError;
use crate::persistence::{BookingStatus, ContractStatus, NewBooking, NewContract, NewMessage};

use super::require_user_id;

/// Request body for `POST /api/v1/bookings`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    /// Client who books.
    pub client_id: String,
    /// Provider delivering the service.
    pub provider_id: String,
    /// Booked service name.
    pub service_name: String,
    /// Appointment time (ISO-8601).
    pub scheduled_at: DateTime<Utc>,
    /// Agreed price.
    pub amount: f64,
}

impl TryFrom<CreateBookingRequest> for NewBooking {
    type Error = AppError;

    fn try_from(req: CreateBookingRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            client_id: require_user_id(Some(&req.client_id))?,
            provider_id: require_user_id(Some(&req.provider_id))?,
            service_name: req.service_name,
            scheduled_at: req.scheduled_at,
            amount: req.amount,
        })
    }
}

/// Request body for `PATCH /api/v1/bookings/{id}/status`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateBookingStatusRequest {
    /// New status.
    pub status: BookingStatus,
}

/// Request body for `POST /api/v1/contracts`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateContractRequest {
    /// Client party.
    pub client_id: String,
    /// Provider party.
    pub provider_id: String,
    /// Contract title.
    pub title: String,
    /// Contract value.
    pub value: f64,
    /// Initial status. Defaults to `draft`.
    #[serde(default)]
    pub status: Option<ContractStatus>,
}

impl TryFrom<CreateContractRequest> for NewContract {
    type Error = AppError;

    fn try_from(req: CreateContractRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            client_id: require_user_id(Some(&req.client_id))?,
            provider_id: require_user_id(Some(&req.provider_id))?,
            title: req.title,
            value: req.value,
            status: req.status.unwrap_or(ContractStatus::Draft),
        })
    }
}

/// Request body for `POST /api/v1/messages`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    /// Author.
    pub sender_id: String,
    /// Addressee.
    pub recipient_id: String,
    /// Message text.
    pub body: String,
}

impl TryFrom<SendMessageRequest> for NewMessage {
    type Error = AppError;

    fn try_from(req: SendMessageRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            sender_id: require_user_id(Some(&req.sender_id))?,
            recipient_id: require_user_id(Some(&req.recipient_id))?,
            body: req.body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contract_status_defaults_to_draft() {
        let req = CreateContractRequest {
            client_id: "c1".to_string(),
            provider_id: "p1".to_string(),
            title: "Retainer".to_string(),
            value: 1200.0,
            status: None,
        };
        assert!(matches!(
            NewContract::try_from(req),
            Ok(NewContract { status: ContractStatus::Draft, .. })
        ));
    }

    #[test]
    fn blank_participant_is_rejected() {
        let req = SendMessageRequest {
            sender_id: " ".to_string(),
            recipient_id: "c1".to_string(),
            body: "hello".to_string(),
        };
        assert!(NewMessage::try_from(req).is_err());
    }

    #[test]
    fn booking_request_reads_camel_case() {
        let raw = serde_json::json!({
            "clientId": "c1",
            "providerId": "p1",
            "serviceName": "Legal review",
            "scheduledAt": "2026-03-01T09:00:00Z",
            "amount": 150.0,
        });
        let parsed = serde_json::from_value::<CreateBookingRequest>(raw);
        assert!(matches!(parsed, Ok(ref req) if req.service_name == "Legal review"));
    }
}
