//! Axum router construction for the Observer API.
//!
//! Assembles all routes (REST + `WebSocket`) into a single [`Router`]
//! with CORS middleware enabled for cross-origin dashboard access.

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::admin;
use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router for the Observer server.
///
/// The router includes:
/// - `GET /` -- minimal HTML status page
/// - `GET /ws/rotation` -- `WebSocket` frame stream
/// - `GET /api/rotation` -- current rotation snapshot
/// - the admin command surface under `/api/admin`
///
/// CORS is configured to allow any origin for development. In
/// production this should be restricted, and the admin routes gated.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Status page
        .route("/", get(handlers::index))
        // WebSocket
        .route("/ws/rotation", get(ws::ws_rotation))
        // REST API
        .route("/api/rotation", get(handlers::get_rotation))
        // Admin command surface
        .route("/api/admin/start", post(admin::start))
        .route("/api/admin/stop", post(admin::stop))
        .route("/api/admin/status", get(admin::status))
        .route("/api/admin/duration", post(admin::set_duration))
        .route("/api/admin/autostart", post(admin::set_autostart))
        .route("/api/admin/advance-time", post(admin::advance_time))
        .route("/api/admin/set-time", post(admin::set_time))
        .route("/api/admin/participants", post(admin::join))
        .route("/api/admin/participants/{id}", delete(admin::leave))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
