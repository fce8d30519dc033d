//! Per-user dashboard aggregate.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Aggregate counters shown on a user's dashboard.
///
/// Recomputed from the relational store and cached for one hour.
/// [`MetricsSnapshot::default`] is the canonical zero record rendered when
/// neither the cache nor the database can answer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    /// All bookings the user takes part in.
    pub total_bookings: u64,
    /// Bookings with status `confirmed`.
    pub confirmed_bookings: u64,
    /// Bookings with status `pending`.
    pub pending_bookings: u64,
    /// Bookings with status `cancelled`.
    pub cancelled_bookings: u64,
    /// All contracts the user is a party to.
    pub total_contracts: u64,
    /// Contracts with status `signed`.
    pub signed_contracts: u64,
    /// Sum of contract values.
    pub total_contract_value: f64,
}

impl MetricsSnapshot {
    /// Returns `true` if every counter is zero.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
