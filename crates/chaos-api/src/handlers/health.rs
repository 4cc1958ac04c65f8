//! Welcome and health check handlers.

use axum::Json;
use axum::extract::State;

use chaos_core::traits::CacheProvider;

use crate::dto::response::{HealthResponse, WelcomeResponse};
use crate::state::AppState;

/// GET /
pub async fn root(State(state): State<AppState>) -> Json<WelcomeResponse> {
    Json(WelcomeResponse {
        message: "C.H.A.O.S. realtime gateway".to_string(),
        status: "operational".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        environment: state.config.server.environment.clone(),
    })
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let cache_ok = match state.cache.health_check().await {
        Ok(ok) => ok,
        Err(e) => {
            tracing::warn!(error = %e, "Cache health check failed");
            false
        }
    };

    Json(HealthResponse {
        status: if cache_ok { "ok" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        cache: if cache_ok { "connected" } else { "unavailable" }.to_string(),
        ws_connections: state.realtime.registry.connection_count(),
        online_users: state.realtime.registry.user_count(),
    })
}
