//! Dashboard metrics handler.

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::UserQuery;
use crate::app_state::AppState;
use crate::domain::MetricsSnapshot;
use crate::error::{AppError, ErrorResponse};

/// `GET /metrics?userId=`: Cache-aside metrics read.
///
/// Responds with a one-element array. When neither the cache nor the
/// database answers, the element is the zero snapshot.
///
/// # Errors
///
/// Returns [`AppError::InvalidRequest`] if `userId` is missing.
#[utoipa::path(
    get,
    path = "/api/v1/metrics",
    tag = "Metrics",
    summary = "Get dashboard metrics",
    description = "Returns the user's metrics snapshot, served from the cache when present and recomputed from the database otherwise.",
    params(UserQuery),
    responses(
        (status = 200, description = "One-element snapshot array", body = Vec<MetricsSnapshot>),
        (status = 400, description = "Missing userId", body = ErrorResponse),
    )
)]
pub async fn get_metrics(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = query.user_id()?;
    let read = state.dashboard.dashboard_metrics(&user_id).await;
    tracing::debug!(user_id = %user_id, origin = ?read.origin, "metrics served");
    Ok(Json(vec![read.snapshot]))
}

/// Metrics routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/metrics", get(get_metrics))
}
