//! Application builder: wires state, router and middleware into an Axum app.

use axum::Router;

use crate::router::build_router;
use crate::state::AppState;

/// Builds the complete Axum application with all routes and middleware.
pub fn build_app(state: AppState) -> Router {
    tracing::debug!(
        public_base_url = %state.config.server.public_base_url,
        "Building HTTP application"
    );
    build_router(state)
}
