//! Contract handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};

use crate::api::dto::{CreateContractRequest, DataEnvelope};
use crate::app_state::AppState;
use crate::error::{AppError, ErrorResponse};
use crate::persistence::{Contract, NewContract};

/// `POST /contracts`: Create a contract.
///
/// # Errors
///
/// Returns [`AppError::InvalidRequest`] on invalid input, or
/// [`AppError::PersistenceError`] if the write fails.
#[utoipa::path(
    post,
    path = "/api/v1/contracts",
    tag = "Contracts",
    summary = "Create a contract",
    description = "Stores a contract and notifies both parties.",
    request_body = CreateContractRequest,
    responses(
        (status = 201, description = "Contract created", body = DataEnvelope<Contract>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
    )
)]
pub async fn create_contract(
    State(state): State<AppState>,
    Json(req): Json<CreateContractRequest>,
) -> Result<impl IntoResponse, AppError> {
    let contract = state
        .dashboard
        .create_contract(NewContract::try_from(req)?)
        .await?;
    Ok((StatusCode::CREATED, Json(DataEnvelope::ok(contract))))
}

/// Contract routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/contracts", post(create_contract))
}
