//! Shared DTO types used across multiple endpoints.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::UserId;
use crate::error::AppError;

/// `?userId=` query string.
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct UserQuery {
    /// Dashboard owner.
    #[serde(default)]
    pub user_id: Option<String>,
}

impl UserQuery {
    /// Validates and returns the user ID.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::InvalidRequest`] if `userId` is missing or blank.
    pub fn user_id(&self) -> Result<UserId, AppError> {
        require_user_id(self.user_id.as_deref())
    }
}

/// Success envelope for mutation endpoints: `{ "success": true, "data": … }`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DataEnvelope<T> {
    /// Always `true`; failures use the error envelope instead.
    pub success: bool,
    /// The created or updated record.
    pub data: T,
}

impl<T> DataEnvelope<T> {
    /// Wraps `data` in a successful envelope.
    #[must_use]
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Parses a raw `userId` from a query or body field.
///
/// # Errors
///
/// Returns [`AppError::InvalidRequest`] if the value is missing or blank.
pub fn require_user_id(raw: Option<&str>) -> Result<UserId, AppError> {
    match raw {
        Some(raw) => UserId::parse(raw),
        None => Err(AppError::InvalidRequest("userId is required".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_user_id_is_rejected() {
        let query = UserQuery { user_id: None };
        assert!(matches!(query.user_id(), Err(AppError::InvalidRequest(_))));

        let blank = UserQuery {
            user_id: Some("   ".to_string()),
        };
        assert!(blank.user_id().is_err());
    }

    #[test]
    fn envelope_serializes_success_flag() {
        let body = serde_json::to_value(DataEnvelope::ok(7)).unwrap_or_default();
        assert_eq!(body.get("success"), Some(&serde_json::Value::Bool(true)));
        assert_eq!(body.get("data"), Some(&serde_json::json!(7)));
    }
}
