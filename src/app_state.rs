//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::service::DashboardService;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Dashboard service for all business logic.
    pub dashboard: Arc<DashboardService>,
    /// Whether a key-value medium is configured.
    pub realtime_enabled: bool,
}

impl AppState {
    /// Creates the state from a service.
    #[must_use]
    pub fn new(dashboard: DashboardService) -> Self {
        let realtime_enabled = dashboard.bus().is_configured();
        Self {
            dashboard: Arc::new(dashboard),
            realtime_enabled,
        }
    }
}
