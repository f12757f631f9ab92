//! REST endpoints over the session registry.
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/api/sessions` | List live sessions |
//! | `GET` | `/api/sessions/{name}` | One session |

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::response::IntoResponse;

use crate::error::ApiError;
use crate::state::AppState;

/// List every live session, ordered by name.
pub async fn list_sessions(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.registry.list().await)
}

/// Look up one session by name. Never creates it.
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let handle = state
        .registry
        .get(&name)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("session {name}")))?;
    Ok(Json(handle.summary()))
}
