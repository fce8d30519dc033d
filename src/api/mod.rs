//! REST API layer: route handlers, DTOs, and router composition.
//!
//! All resource endpoints are mounted under `/api/v1`. With the
//! `swagger-ui` feature the interactive docs are served at `/swagger-ui`.

pub mod dto;
pub mod handlers;

use axum::Router;
use utoipa::OpenApi;

use crate::app_state::AppState;

/// OpenAPI document for every REST endpoint.
#[derive(Debug, OpenApi)]
#[openapi(
    info(title = "SmartPRO realtime API"),
    paths(
        handlers::system::health_handler,
        handlers::metrics::get_metrics,
        handlers::bookings::create_booking,
        handlers::bookings::update_booking_status,
        handlers::contracts::create_contract,
        handlers::messages::send_message,
        handlers::realtime::publish_update,
        handlers::realtime::recent_events,
    ),
    tags(
        (name = "System", description = "Health and documentation"),
        (name = "Metrics", description = "Cached dashboard metrics"),
        (name = "Bookings", description = "Booking writes"),
        (name = "Contracts", description = "Contract writes"),
        (name = "Messages", description = "Message writes"),
        (name = "Realtime", description = "Update publishing and recovery"),
    )
)]
pub struct ApiDoc;

/// Builds the complete API router with all REST endpoints.
pub fn build_router() -> Router<AppState> {
    let router = Router::new()
        .nest("/api/v1", handlers::routes())
        .merge(handlers::system::routes());

    #[cfg(feature = "swagger-ui")]
    let router = router.merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
            .url("/api-docs/swagger.json", ApiDoc::openapi()),
    );

    router
}
