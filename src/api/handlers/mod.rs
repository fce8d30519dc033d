//! REST endpoint handlers organized by resource.

pub mod bookings;
pub mod contracts;
pub mod messages;
pub mod metrics;
pub mod realtime;
pub mod system;

use axum::Router;

use crate::app_state::AppState;

/// Composes all resource routes under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(metrics::routes())
        .merge(bookings::routes())
        .merge(contracts::routes())
        .merge(messages::routes())
        .merge(realtime::routes())
}
