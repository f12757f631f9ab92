//! Axum router construction.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete router.
///
/// - `GET /join` -- `WebSocket` upgrade into a session
/// - `GET /api/sessions` -- list sessions
/// - `GET /api/sessions/{name}` -- one session
/// - anything else -- static files from the configured directory
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let assets = ServeDir::new(&state.static_dir);

    Router::new()
        .route("/join", get(ws::join))
        .route("/api/sessions", get(handlers::list_sessions))
        .route("/api/sessions/{name}", get(handlers::get_session))
        .fallback_service(assets)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
