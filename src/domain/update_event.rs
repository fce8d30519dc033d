//! Realtime update events and the channels they travel on.
//!
//! Every state change is announced as an [`UpdateEvent`] on the channel of
//! its [`UpdateType`]. Events are also pushed into a short per-user recovery
//! list so reconnecting dashboards can catch up.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;

/// Kind of domain change an update announces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum UpdateType {
    /// A booking was created or changed status.
    Booking,
    /// A contract was created or changed.
    Contract,
    /// A message was sent.
    Message,
    /// A user's dashboard aggregate changed.
    Metrics,
}

impl UpdateType {
    /// All update types, in channel order.
    pub const ALL: [Self; 4] = [Self::Booking, Self::Contract, Self::Message, Self::Metrics];

    /// Returns the pub/sub channel for this update type.
    #[must_use]
    pub const fn channel(self) -> &'static str {
        match self {
            Self::Booking => "booking-updates",
            Self::Contract => "contract-updates",
            Self::Message => "message-updates",
            Self::Metrics => "metrics-updates",
        }
    }

    /// Returns the lowercase wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Booking => "booking",
            Self::Contract => "contract",
            Self::Message => "message",
            Self::Metrics => "metrics",
        }
    }
}

impl fmt::Display for UpdateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UpdateType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| AppError::InvalidUpdateType(s.to_string()))
    }
}

/// Immutable record of a published change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UpdateEvent {
    /// What changed.
    #[serde(rename = "type")]
    pub update_type: UpdateType,
    /// Arbitrary event payload.
    pub data: serde_json::Value,
    /// Generation time, ISO-8601.
    pub timestamp: String,
}

impl UpdateEvent {
    /// Creates an event stamped with the current time.
    #[must_use]
    pub fn new(update_type: UpdateType, data: serde_json::Value) -> Self {
        Self::at(update_type, data, Utc::now())
    }

    /// Creates an event stamped with the given time.
    #[must_use]
    pub fn at(update_type: UpdateType, data: serde_json::Value, at: DateTime<Utc>) -> Self {
        Self {
            update_type,
            data,
            timestamp: iso_timestamp(at),
        }
    }
}

/// Formats a timestamp as ISO-8601 with millisecond precision and `Z`.
#[must_use]
pub fn iso_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn channels_are_fixed() {
        let channels: Vec<_> = UpdateType::ALL.iter().map(|t| t.channel()).collect();
        assert_eq!(
            channels,
            vec![
                "booking-updates",
                "contract-updates",
                "message-updates",
                "metrics-updates"
            ]
        );
    }

    #[test]
    fn parses_wire_names() {
        assert!(matches!("booking".parse::<UpdateType>(), Ok(UpdateType::Booking)));
        assert!(matches!("metrics".parse::<UpdateType>(), Ok(UpdateType::Metrics)));
        assert!("invoice".parse::<UpdateType>().is_err());
    }

    #[test]
    fn event_serializes_type_field() {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).single();
        let Some(at) = at else {
            panic!("valid timestamp");
        };
        let event = UpdateEvent::at(UpdateType::Contract, serde_json::json!({"id": 7}), at);
        let json = serde_json::to_string(&event).unwrap_or_default();
        assert!(json.contains("\"type\":\"contract\""));
        assert!(json.contains("\"timestamp\":\"2026-03-01T09:30:00.000Z\""));
    }
}
