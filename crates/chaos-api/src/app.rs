//! Application builder: wires router, middleware and state into an Axum
//! app, and runs the server.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tower_http::trace::TraceLayer;

use chaos_auth::JwtDecoder;
use chaos_cache::CacheManager;
use chaos_core::config::AppConfig;
use chaos_core::error::AppError;
use chaos_realtime::RealtimeEngine;

use crate::middleware::cors::build_cors_layer;
use crate::router::build_router;
use crate::state::AppState;

/// Builds the complete Axum application with all routes and middleware.
pub fn build_app(state: AppState) -> Router {
    let cors = build_cors_layer(&state.config.server.cors);
    build_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Builds every component from configuration.
pub async fn build_state(config: AppConfig) -> Result<AppState, AppError> {
    tracing::info!(provider = %config.cache.provider, "Initializing cache");
    let cache = Arc::new(CacheManager::new(&config.cache).await?);

    let jwt_decoder = Arc::new(JwtDecoder::new(&config.auth, Arc::clone(&cache)));
    let realtime = RealtimeEngine::new(
        config.realtime.clone(),
        Arc::clone(&cache),
        jwt_decoder.clone(),
    );

    Ok(AppState::new(config, cache, jwt_decoder, realtime))
}

/// Runs the gateway until Ctrl+C, then drains connections.
pub async fn run_server(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting C.H.A.O.S. realtime gateway...");

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let grace = Duration::from_secs(config.server.shutdown_grace_seconds);

    let state = build_state(config).await?;
    let engine = state.realtime.clone();
    engine.start();

    let app = build_app(state);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;

    tracing::info!("Gateway listening on {}", addr);

    let shutdown_engine = engine.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            shutdown_engine.shutdown().await;
        })
        .await
        .map_err(|e| AppError::internal(format!("Server error: {e}")))?;

    if engine.wait_for_drain(grace).await {
        tracing::info!("All connections reconciled");
    }

    tracing::info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C; shutting down");
    }
    tracing::info!("Shutdown signal received");
}
