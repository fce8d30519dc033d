//! Message handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};

use crate::api::dto::{DataEnvelope, SendMessageRequest};
use crate::app_state::AppState;
use crate::error::{AppError, ErrorResponse};
use crate::persistence::{Message, NewMessage};

/// `POST /messages`: Send a message.
///
/// # Errors
///
/// Returns [`AppError::InvalidRequest`] on an empty body or blank
/// participant.
#[utoipa::path(
    post,
    path = "/api/v1/messages",
    tag = "Messages",
    summary = "Send a message",
    description = "Stores a message and pushes it to both sides of the conversation.",
    request_body = SendMessageRequest,
    responses(
        (status = 201, description = "Message stored", body = DataEnvelope<Message>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
    )
)]
pub async fn send_message(
    State(state): State<AppState>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, AppError> {
    let message = state.dashboard.send_message(NewMessage::try_from(req)?).await?;
    Ok((StatusCode::CREATED, Json(DataEnvelope::ok(message))))
}

/// Message routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/messages", post(send_message))
}
