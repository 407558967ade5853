/// Credential service implementation using runtime queries
use crate::{
    config::ServerConfig,
    credential::{AccessClaims, RefreshClaims, TokenPair},
    error::{ApiError, ApiResult},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sqlx::{Row, SqlitePool};
use std::sync::Arc;
use uuid::Uuid;

/// Issues, verifies, rotates and revokes token pairs
pub struct CredentialService {
    db: SqlitePool,
    config: Arc<ServerConfig>,
}

impl CredentialService {
    pub fn new(db: SqlitePool, config: Arc<ServerConfig>) -> Self {
        Self { db, config }
    }

    /// Issue a new token pair for a user and persist the refresh token on the
    /// user record, overwriting any prior value (single active session).
    pub async fn issue_pair(&self, user_id: &str) -> ApiResult<TokenPair> {
        let row = sqlx::query("SELECT username, email, full_name FROM users WHERE id = ?1")
            .bind(user_id)
            .fetch_optional(&self.db)
            .await
            .map_err(ApiError::Database)?
            .ok_or_else(|| ApiError::Internal("Failed to generate tokens".to_string()))?;

        let now = Utc::now();

        let access_claims = AccessClaims {
            sub: user_id.to_string(),
            username: row.get("username"),
            email: row.get("email"),
            full_name: row.get("full_name"),
            iat: now.timestamp(),
            exp: (now + Duration::minutes(self.config.auth.access_token_ttl_minutes)).timestamp(),
        };
        let access_token = encode(
            &Header::new(Algorithm::HS256),
            &access_claims,
            &EncodingKey::from_secret(self.config.auth.access_token_secret.as_bytes()),
        )
        .map_err(|e| ApiError::Internal(format!("Failed to generate tokens: {}", e)))?;

        let refresh_claims = RefreshClaims {
            sub: user_id.to_string(),
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::days(self.config.auth.refresh_token_ttl_days)).timestamp(),
        };
        let refresh_token = encode(
            &Header::new(Algorithm::HS256),
            &refresh_claims,
            &EncodingKey::from_secret(self.config.auth.refresh_token_secret.as_bytes()),
        )
        .map_err(|e| ApiError::Internal(format!("Failed to generate tokens: {}", e)))?;

        let result = sqlx::query("UPDATE users SET refresh_token = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(&refresh_token)
            .bind(now)
            .bind(user_id)
            .execute(&self.db)
            .await
            .map_err(ApiError::Database)?;

        if result.rows_affected() == 0 {
            return Err(ApiError::Internal("Failed to generate tokens".to_string()));
        }

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Verify an access token and return its claims
    pub fn verify_access(&self, token: &str) -> ApiResult<AccessClaims> {
        let data = decode::<AccessClaims>(
            token,
            &DecodingKey::from_secret(self.config.auth.access_token_secret.as_bytes()),
            &validation(),
        )
        .map_err(token_error)?;

        Ok(data.claims)
    }

    /// Rotate a refresh token: verify the signature, compare against the
    /// stored value, and mint a new pair. A mismatch means the presented
    /// token is stale or stolen; the session is not recoverable.
    pub async fn rotate_refresh(&self, presented: &str) -> ApiResult<TokenPair> {
        let data = decode::<RefreshClaims>(
            presented,
            &DecodingKey::from_secret(self.config.auth.refresh_token_secret.as_bytes()),
            &validation(),
        )
        .map_err(token_error)?;

        let user_id = data.claims.sub;

        let row = sqlx::query("SELECT refresh_token FROM users WHERE id = ?1")
            .bind(&user_id)
            .fetch_optional(&self.db)
            .await
            .map_err(ApiError::Database)?
            .ok_or_else(|| ApiError::Authentication("Invalid token".to_string()))?;

        let stored: Option<String> = row.get("refresh_token");
        if stored.as_deref() != Some(presented) {
            tracing::warn!(user_id = %user_id, "refresh token mismatch, forcing re-authentication");
            return Err(ApiError::Authentication(
                "Refresh token mismatch".to_string(),
            ));
        }

        self.issue_pair(&user_id).await
    }

    /// Clear the stored refresh token (logout). Idempotent.
    pub async fn revoke(&self, user_id: &str) -> ApiResult<()> {
        sqlx::query("UPDATE users SET refresh_token = NULL, updated_at = ?1 WHERE id = ?2")
            .bind(Utc::now())
            .bind(user_id)
            .execute(&self.db)
            .await
            .map_err(ApiError::Database)?;

        Ok(())
    }
}

fn validation() -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    // Allow some clock skew (5 minutes)
    validation.leeway = 300;
    validation
}

fn token_error(e: jsonwebtoken::errors::Error) -> ApiError {
    match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
            ApiError::Authentication("Token has expired".to_string())
        }
        jsonwebtoken::errors::ErrorKind::InvalidSignature => {
            ApiError::Authentication("Invalid token signature".to_string())
        }
        _ => ApiError::Authentication(format!("Invalid token: {}", e)),
    }
}
