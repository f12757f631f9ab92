//! Castaway session server binary.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `castaway-config.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Build the session registry and shared state
//! 4. Bind and spawn the HTTP + `WebSocket` server
//! 5. Run until the server stops or `Ctrl-C` is received

use std::path::Path;
use std::sync::Arc;

use castaway_core::config::{CastawayConfig, ConfigError, LoggingConfig};
use castaway_server::startup::{StartupError, spawn_server};
use castaway_server::state::AppState;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Path of the configuration file, relative to the working directory.
const CONFIG_PATH: &str = "castaway-config.yaml";

/// Top-level errors for the server binary.
#[derive(Debug, thiserror::Error)]
enum AppError {
    /// Configuration could not be loaded.
    #[error("configuration error: {source}")]
    Config {
        /// The underlying error.
        #[from]
        source: ConfigError,
    },

    /// The server could not be started.
    #[error("startup error: {source}")]
    Startup {
        /// The underlying error.
        #[from]
        source: StartupError,
    },
}

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration loading or server startup fails.
#[tokio::main]
async fn main() -> Result<(), AppError> {
    // 1. Load configuration.
    let config = load_config()?;

    // 2. Initialize structured logging.
    init_tracing(&config.logging);
    info!(
        host = config.server.host,
        port = config.server.port,
        static_dir = config.server.static_dir,
        default_session = config.server.default_session,
        tick_interval_ms = config.session.tick_interval_ms,
        "castaway-server starting"
    );

    // 3. Build shared state.
    let state = Arc::new(AppState::new(&config));

    // 4. Spawn the server.
    let server = spawn_server(&config.server, state).await?;

    // 5. Run until the server stops or we are interrupted.
    tokio::select! {
        result = server => {
            if let Err(e) = result {
                error!(error = %e, "server task failed");
            }
        }
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                error!(error = %e, "failed to listen for ctrl-c");
            }
            info!("shutdown requested");
        }
    }

    info!("castaway-server stopped");
    Ok(())
}

/// Load `castaway-config.yaml`, or defaults if the file does not exist.
fn load_config() -> Result<CastawayConfig, AppError> {
    let config_path = Path::new(CONFIG_PATH);
    if config_path.exists() {
        Ok(CastawayConfig::from_file(config_path)?)
    } else {
        let mut config = CastawayConfig::default();
        config.server.apply_env_overrides();
        Ok(config)
    }
}

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}
