//! Application state shared across all handlers and extractors.

use std::sync::Arc;
use std::time::Instant;

use chaos_auth::JwtDecoder;
use chaos_cache::CacheManager;
use chaos_core::config::AppConfig;
use chaos_realtime::RealtimeEngine;

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Shared cache (presence store and token blocklist).
    pub cache: Arc<CacheManager>,
    /// JWT verification for bearer-authenticated HTTP routes.
    pub jwt_decoder: Arc<JwtDecoder>,
    /// Real-time engine.
    pub realtime: RealtimeEngine,
    /// Process start, for uptime reporting.
    pub started_at: Instant,
}

impl AppState {
    /// Wire the state from already-built components.
    pub fn new(
        config: AppConfig,
        cache: Arc<CacheManager>,
        jwt_decoder: Arc<JwtDecoder>,
        realtime: RealtimeEngine,
    ) -> Self {
        Self {
            config: Arc::new(config),
            cache,
            jwt_decoder,
            realtime,
            started_at: Instant::now(),
        }
    }
}
