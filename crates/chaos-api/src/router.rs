//! Route definitions for the gateway's HTTP surface.
//!
//! Query endpoints are mounted under `/api`; the WebSocket upgrade, the
//! welcome payload and health live at the root.

use axum::{Router, routing::get};

use crate::handlers;
use crate::state::AppState;

/// Build the router and thread `AppState` through every route.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new().merge(presence_routes());

    Router::new()
        .nest("/api", api_routes)
        .merge(root_routes())
        .with_state(state)
}

/// Welcome, health and WebSocket upgrade
fn root_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::health::root))
        .route("/health", get(handlers::health::health))
        .route("/ws", get(handlers::ws::ws_handler))
}

/// Presence queries (bearer auth)
fn presence_routes() -> Router<AppState> {
    Router::new()
        .route("/presence/online", get(handlers::presence::list_online))
        .route("/presence/{user_id}", get(handlers::presence::get_presence))
}
