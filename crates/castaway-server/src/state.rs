//! Shared application state for the HTTP server.

use castaway_core::config::CastawayConfig;
use castaway_core::registry::SessionRegistry;

/// State shared by every request handler.
#[derive(Debug)]
pub struct AppState {
    /// Live sessions.
    pub registry: SessionRegistry,
    /// Session joined when a client names none.
    pub default_session: String,
    /// Directory served for non-API paths.
    pub static_dir: String,
}

impl AppState {
    /// Build state from loaded configuration.
    pub fn new(config: &CastawayConfig) -> Self {
        Self {
            registry: SessionRegistry::new(config.session.clone(), config.odds.clone()),
            default_session: config.server.default_session.clone(),
            static_dir: config.server.static_dir.clone(),
        }
    }
}
