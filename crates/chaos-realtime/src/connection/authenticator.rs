//! WebSocket authentication: validates the bearer token presented on connect.

use std::sync::Arc;

use uuid::Uuid;

use chaos_core::error::AppError;
use chaos_core::traits::TokenVerifier;

/// Authenticated connection info extracted from a verified token.
#[derive(Debug, Clone)]
pub struct AuthenticatedConnection {
    /// User ID.
    pub user_id: Uuid,
    /// Username.
    pub username: String,
}

/// Admits or rejects WebSocket connections before any other processing.
///
/// Every rejection carries the same message so clients cannot distinguish
/// a missing token from an expired or forged one.
#[derive(Clone)]
pub struct WsAuthenticator {
    /// Token verifier.
    verifier: Arc<dyn TokenVerifier>,
}

impl std::fmt::Debug for WsAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsAuthenticator").finish()
    }
}

impl WsAuthenticator {
    /// Creates a new WebSocket authenticator.
    pub fn new(verifier: Arc<dyn TokenVerifier>) -> Self {
        Self { verifier }
    }

    /// Authenticates a connection from the token presented at handshake.
    pub async fn authenticate(
        &self,
        token: Option<&str>,
    ) -> Result<AuthenticatedConnection, AppError> {
        let token = token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                tracing::debug!("WebSocket connection rejected: no token presented");
                rejected()
            })?;

        match self.verifier.verify(token).await {
            Ok(identity) => Ok(AuthenticatedConnection {
                user_id: identity.user_id,
                username: identity.username,
            }),
            Err(e) => {
                tracing::debug!(reason = %e, "WebSocket connection rejected");
                Err(rejected())
            }
        }
    }
}

fn rejected() -> AppError {
    AppError::authentication("Authentication failed")
}
