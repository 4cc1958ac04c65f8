//! Bearer token verification seam used by the WebSocket gate.

use async_trait::async_trait;
use uuid::Uuid;

use crate::result::AppResult;

/// Identity extracted from a verified bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    /// User ID (token subject).
    pub user_id: Uuid,
    /// Display name carried in the token.
    pub username: String,
}

/// Verifies a bearer credential and yields the identity it was issued to.
///
/// Implementations check signature, expiry and revocation. Any failure is an
/// `ErrorKind::Authentication` error.
#[async_trait]
pub trait TokenVerifier: Send + Sync + std::fmt::Debug + 'static {
    /// Verify `token` and return the identity it carries.
    async fn verify(&self, token: &str) -> AppResult<VerifiedIdentity>;
}
