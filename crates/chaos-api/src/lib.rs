//! # chaos-api
//!
//! HTTP layer for the C.H.A.O.S. realtime gateway built on Axum.
//!
//! Provides the authenticated WebSocket upgrade, presence query endpoints,
//! health reporting, CORS, request tracing and error mapping.

pub mod app;
pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use app::build_app;
pub use error::ApiError;
pub use state::AppState;
