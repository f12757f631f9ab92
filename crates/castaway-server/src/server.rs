//! HTTP server lifecycle.
//!
//! Binding and serving are separate steps so that a caller can surface a
//! bad address or an occupied port before moving the server onto a
//! background task.

use std::net::SocketAddr;
use std::sync::Arc;

use castaway_core::config::ListenConfig;
use tokio::net::TcpListener;
use tracing::info;

use crate::router::build_router;
use crate::state::AppState;

/// Errors that can occur when starting or running the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Failed to bind to the network address.
    #[error("bind error: {0}")]
    Bind(String),

    /// The server encountered a fatal error while serving.
    #[error("serve error: {0}")]
    Serve(String),
}

/// Bind a TCP listener on the configured host and port.
///
/// # Errors
///
/// Returns [`ServerError::Bind`] if the address does not parse or the
/// port cannot be bound.
pub async fn bind(config: &ListenConfig) -> Result<TcpListener, ServerError> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| ServerError::Bind(format!("invalid address: {e}")))?;

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::Bind(format!("bind failed on {addr}: {e}")))?;

    info!(%addr, "castaway server listening");
    Ok(listener)
}

/// Serve requests on an already bound listener until it fails.
///
/// # Errors
///
/// Returns [`ServerError::Serve`] on a fatal I/O error.
pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> Result<(), ServerError> {
    let router = build_router(state);
    axum::serve(listener, router)
        .await
        .map_err(|e| ServerError::Serve(format!("serve error: {e}")))
}
