//! Shared helpers for HTTP and WebSocket integration tests.

#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use http::{Request, StatusCode};
use tower::ServiceExt;
use uuid::Uuid;

use chaos_api::app::{build_app, build_state};
use chaos_api::AppState;
use chaos_auth::JwtEncoder;
use chaos_core::config::AppConfig;

/// A fully wired application over the in-memory cache.
pub struct TestApp {
    pub state: AppState,
    pub router: Router,
    pub encoder: JwtEncoder,
}

/// A decoded response.
pub struct TestResponse {
    pub status: StatusCode,
    pub body: serde_json::Value,
}

impl TestApp {
    pub async fn new() -> Self {
        let config = AppConfig::default();
        let encoder = JwtEncoder::new(&config.auth);
        let state = build_state(config).await.expect("state");
        let router = build_app(state.clone());
        Self {
            state,
            router,
            encoder,
        }
    }

    /// A valid access token for the user.
    pub fn token_for(&self, user_id: Uuid, username: &str) -> String {
        self.encoder
            .generate_access_token(user_id, username)
            .expect("token")
            .0
    }

    /// Send a GET request, optionally with a bearer token.
    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = builder.body(Body::empty()).expect("request");

        let response = self.router.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("body");
        let body = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
        };

        TestResponse { status, body }
    }
}
