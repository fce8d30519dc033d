//! Realtime publish and event-recovery DTOs.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::{RECENT_EVENTS_CAPACITY, UpdateEvent, UserId};
use crate::error::AppError;

use super::require_user_id;

/// Request body for `POST /api/v1/realtime/{kind}`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublishUpdateRequest {
    /// Dashboard owner the update is addressed to.
    pub user_id: String,
    /// Arbitrary update payload.
    #[serde(default)]
    pub data: serde_json::Value,
}

/// `?userId=&limit=` query string for `GET /api/v1/events`.
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct EventsQuery {
    /// Dashboard owner.
    #[serde(default)]
    pub user_id: Option<String>,
    /// Maximum number of events (1..=100). Defaults to 100.
    #[serde(default)]
    pub limit: Option<usize>,
}

impl EventsQuery {
    /// Validates and returns the user ID.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::InvalidRequest`] if `userId` is missing or blank.
    pub fn user_id(&self) -> Result<UserId, AppError> {
        require_user_id(self.user_id.as_deref())
    }

    /// Requested limit, defaulting to the recovery list capacity.
    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit.unwrap_or(RECENT_EVENTS_CAPACITY)
    }
}

/// Response body for `GET /api/v1/events`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EventsResponse {
    /// Always `true`; an unavailable medium yields an empty list.
    pub success: bool,
    /// Recent events, most recent first.
    pub events: Vec<UpdateEvent>,
}
