//! Realtime handlers: direct publish and event recovery.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{EventsQuery, EventsResponse, PublishUpdateRequest, require_user_id};
use crate::app_state::AppState;
use crate::domain::{PublishOutcome, UpdateType};
use crate::error::{AppError, ErrorResponse};

/// `POST /realtime/{kind}`: Publish an update on the kind's channel.
///
/// A failed publish is not an HTTP error: the response is
/// `{"success": false}` with status 200.
///
/// # Errors
///
/// Returns [`AppError::InvalidUpdateType`] for an unknown kind, or
/// [`AppError::InvalidRequest`] if `userId` is blank.
#[utoipa::path(
    post,
    path = "/api/v1/realtime/{kind}",
    tag = "Realtime",
    summary = "Publish a realtime update",
    description = "Publishes `{type, userId, data}` on the channel of the given kind (booking, contract, message, metrics).",
    params(
        ("kind" = String, Path, description = "Update kind"),
    ),
    request_body = PublishUpdateRequest,
    responses(
        (status = 200, description = "Publish attempted", body = PublishOutcome),
        (status = 400, description = "Unknown kind or missing userId", body = ErrorResponse),
    )
)]
pub async fn publish_update(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Json(req): Json<PublishUpdateRequest>,
) -> Result<impl IntoResponse, AppError> {
    let update_type: UpdateType = kind.parse()?;
    let user_id = require_user_id(Some(&req.user_id))?;
    let outcome = state
        .dashboard
        .publish_update(update_type, &user_id, req.data)
        .await;
    Ok(Json(outcome))
}

/// `GET /events?userId=&limit=`: Recent events for reconnecting clients.
///
/// # Errors
///
/// Returns [`AppError::InvalidRequest`] if `userId` is missing.
#[utoipa::path(
    get,
    path = "/api/v1/events",
    tag = "Realtime",
    summary = "List recent events",
    description = "Returns up to `limit` (max 100) of the user's most recent updates, newest first.",
    params(EventsQuery),
    responses(
        (status = 200, description = "Recent events", body = EventsResponse),
        (status = 400, description = "Missing userId", body = ErrorResponse),
    )
)]
pub async fn recent_events(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = query.user_id()?;
    let events = state.dashboard.recent_events(&user_id, query.limit()).await;
    Ok(Json(EventsResponse {
        success: true,
        events,
    }))
}

/// Realtime routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/realtime/{kind}", post(publish_update))
        .route("/events", get(recent_events))
}
