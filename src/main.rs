//! C.H.A.O.S. realtime gateway: presence and message fan-out server.
//!
//! Main entry point: loads configuration, sets up logging, and hands off to
//! the API crate to serve HTTP and WebSocket traffic.

use tracing_subscriber::{EnvFilter, fmt};

use chaos_core::config::AppConfig;
use chaos_core::error::AppError;

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = %config.server.environment,
        "Starting C.H.A.O.S. gateway"
    );

    if let Err(e) = chaos_api::app::run_server(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Load configuration from `config/` and `CHAOS__*` environment overrides.
fn load_configuration() -> Result<AppConfig, AppError> {
    let env = std::env::var("CHAOS_ENV").unwrap_or_else(|_| "development".to_string());
    let mut config = AppConfig::load(&env)?;
    if config.server.environment.is_empty() {
        config.server.environment = env;
    }
    Ok(config)
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}
