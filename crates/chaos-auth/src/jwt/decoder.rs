//! JWT token validation and blocklist checking.

use std::sync::Arc;

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use tracing::debug;
use uuid::Uuid;

use chaos_cache::keys;
use chaos_cache::provider::CacheManager;
use chaos_core::config::AuthConfig;
use chaos_core::error::AppError;
use chaos_core::result::AppResult;
use chaos_core::traits::{CacheProvider, TokenVerifier, VerifiedIdentity};

use super::claims::{Claims, TokenType};

/// Validates JWT tokens and checks blocklist status.
#[derive(Clone)]
pub struct JwtDecoder {
    /// HMAC secret key for verification.
    decoding_key: DecodingKey,
    /// Validation configuration.
    validation: Validation,
    /// Cache manager for blocklist lookups.
    cache: Arc<CacheManager>,
}

impl std::fmt::Debug for JwtDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtDecoder")
            .field("validation", &self.validation)
            .finish()
    }
}

impl JwtDecoder {
    /// Creates a new decoder from auth configuration.
    pub fn new(config: &AuthConfig, cache: Arc<CacheManager>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = config.leeway_seconds;

        Self {
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
            cache,
        }
    }

    /// Decodes and validates an access token string.
    ///
    /// Checks:
    /// 1. Signature validity
    /// 2. Expiration
    /// 3. Token type is Access
    /// 4. JTI not in blocklist
    pub async fn decode_access_token(&self, token: &str) -> Result<Claims, AppError> {
        let claims = self.decode_token(token)?;

        if claims.token_type != TokenType::Access {
            return Err(AppError::authentication(
                "Invalid token type: expected access token",
            ));
        }

        self.check_blocklist(&claims.jti).await?;

        Ok(claims)
    }

    /// Internal decode without type checking.
    fn decode_token(&self, token: &str) -> Result<Claims, AppError> {
        let token_data =
            decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
                match e.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                        AppError::authentication("Token has expired")
                    }
                    jsonwebtoken::errors::ErrorKind::InvalidToken => {
                        AppError::authentication("Invalid token format")
                    }
                    jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                        AppError::authentication("Invalid token signature")
                    }
                    _ => AppError::authentication(format!("Token validation failed: {e}")),
                }
            })?;

        Ok(token_data.claims)
    }

    /// Checks whether the given JWT ID has been blocklisted.
    ///
    /// A failed lookup counts as not revoked.
    async fn check_blocklist(&self, jti: &Uuid) -> Result<(), AppError> {
        let key = keys::jwt_blocklist(*jti);
        let blocked = match self.cache.get(&key).await {
            Ok(value) => value,
            Err(e) => {
                debug!(error = %e, "Blocklist lookup failed, skipping");
                None
            }
        };
        if blocked.is_some() {
            return Err(AppError::authentication("Token has been revoked"));
        }
        Ok(())
    }

    /// Adds a JWT ID to the blocklist with the remaining TTL.
    pub async fn blocklist_token(
        &self,
        jti: Uuid,
        remaining_ttl_seconds: u64,
    ) -> Result<(), AppError> {
        let key = keys::jwt_blocklist(jti);
        let ttl = if remaining_ttl_seconds > 0 {
            std::time::Duration::from_secs(remaining_ttl_seconds)
        } else {
            // Minimum 60 seconds to cover clock skew leeway
            std::time::Duration::from_secs(60)
        };
        self.cache
            .set(&key, "revoked", ttl)
            .await
            .map_err(|e| AppError::internal(format!("Failed to blocklist token: {e}")))?;
        Ok(())
    }
}

#[async_trait]
impl TokenVerifier for JwtDecoder {
    async fn verify(&self, token: &str) -> AppResult<VerifiedIdentity> {
        let claims = self.decode_access_token(token).await?;
        Ok(VerifiedIdentity {
            user_id: claims.user_id(),
            username: claims.username,
        })
    }
}
