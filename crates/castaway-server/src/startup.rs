//! Launches the server on a background Tokio task.

use std::sync::Arc;

use castaway_core::config::ListenConfig;
use tokio::task::JoinHandle;

use crate::server::{ServerError, bind, serve};
use crate::state::AppState;

/// Errors that can occur when spawning the server.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// The server failed to bind or start.
    #[error("server start error: {0}")]
    Server(#[from] ServerError),
}

/// Bind the listener, then serve on a background task.
///
/// The bind happens before spawning, so an occupied port is reported to
/// the caller instead of only being logged. The returned handle finishes
/// when the server stops.
///
/// # Errors
///
/// Returns [`StartupError::Server`] if the address cannot be bound.
pub async fn spawn_server(
    config: &ListenConfig,
    state: Arc<AppState>,
) -> Result<JoinHandle<()>, StartupError> {
    let listener = bind(config).await?;

    let handle = tokio::spawn(async move {
        if let Err(e) = serve(listener, state).await {
            tracing::error!(error = %e, "castaway server exited with error");
        }
    });

    tracing::info!(port = config.port, "castaway server spawned on background task");
    Ok(handle)
}
