//! Booking handlers: create and status change.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{patch, post};
use axum::{Json, Router};
use uuid::Uuid;

use crate::api::dto::{CreateBookingRequest, DataEnvelope, UpdateBookingStatusRequest};
use crate::app_state::AppState;
use crate::error::{AppError, ErrorResponse};
use crate::persistence::{Booking, NewBooking};

/// `POST /bookings`: Create a booking.
///
/// The booking is committed before any realtime side effect runs, so a
/// cache outage never fails this request.
///
/// # Errors
///
/// Returns [`AppError::InvalidRequest`] on invalid input, or
/// [`AppError::PersistenceError`] if the write fails.
#[utoipa::path(
    post,
    path = "/api/v1/bookings",
    tag = "Bookings",
    summary = "Create a booking",
    description = "Stores a pending booking and notifies both participants.",
    request_body = CreateBookingRequest,
    responses(
        (status = 201, description = "Booking created", body = DataEnvelope<Booking>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 500, description = "Database failure", body = ErrorResponse),
    )
)]
pub async fn create_booking(
    State(state): State<AppState>,
    Json(req): Json<CreateBookingRequest>,
) -> Result<impl IntoResponse, AppError> {
    let booking = state.dashboard.create_booking(NewBooking::try_from(req)?).await?;
    Ok((StatusCode::CREATED, Json(DataEnvelope::ok(booking))))
}

/// `PATCH /bookings/{id}/status`: Change a booking's status.
///
/// # Errors
///
/// Returns [`AppError::BookingNotFound`] if the booking does not exist.
#[utoipa::path(
    patch,
    path = "/api/v1/bookings/{id}/status",
    tag = "Bookings",
    summary = "Update booking status",
    description = "Moves a booking to a new status and refreshes both participants' metrics.",
    params(
        ("id" = uuid::Uuid, Path, description = "Booking UUID"),
    ),
    request_body = UpdateBookingStatusRequest,
    responses(
        (status = 200, description = "Booking updated", body = DataEnvelope<Booking>),
        (status = 404, description = "Booking not found", body = ErrorResponse),
    )
)]
pub async fn update_booking_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateBookingStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    let booking = state.dashboard.update_booking_status(id, req.status).await?;
    Ok(Json(DataEnvelope::ok(booking)))
}

/// Booking routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/bookings", post(create_booking))
        .route("/bookings/{id}/status", patch(update_booking_status))
}
