//! Route definitions
//!
//! Defines all HTTP API endpoints.

use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::handlers::{get_settings, health, session_info, turn, update_settings};
use crate::middleware::auth_middleware;
use crate::server::AppState;

/// Create the API router
pub fn routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route(
            "/api/chatbot/settings",
            get(get_settings).put(update_settings).post(update_settings),
        )
        .route("/api/chatbot/turn", post(turn))
        .route("/api/chatbot/sessions/{phone_number}", get(session_info))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new()
        // Health check
        .route("/health", get(health))
        .merge(protected)
}
