//! First-party token authentication.
//!
//! Access/refresh token pairs signed with HS256. The access token carries
//! only the user identity claim; every request re-validates the account by
//! lookup, so there is no session store to invalidate.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::state::AppState;

const TOKEN_TYPE_ACCESS: &str = "access";
const TOKEN_TYPE_REFRESH: &str = "refresh";

/// Token claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    /// "access" or "refresh"
    pub token_type: String,
    /// Issued at (unix seconds)
    pub iat: i64,
    /// Expiration (unix seconds)
    pub exp: i64,
}

/// Issued token pair.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Issue an access/refresh pair for a user.
pub fn issue_token_pair(config: &ApiConfig, user_id: Uuid) -> Result<TokenPair, ApiError> {
    let now = Utc::now();
    let key = EncodingKey::from_secret(config.jwt_secret.as_bytes());

    let access = Claims {
        sub: user_id.to_string(),
        token_type: TOKEN_TYPE_ACCESS.to_string(),
        iat: now.timestamp(),
        exp: (now + Duration::minutes(config.access_token_ttl_minutes)).timestamp(),
    };
    let refresh = Claims {
        sub: user_id.to_string(),
        token_type: TOKEN_TYPE_REFRESH.to_string(),
        iat: now.timestamp(),
        exp: (now + Duration::days(config.refresh_token_ttl_days)).timestamp(),
    };

    let access_token = encode(&Header::default(), &access, &key)
        .map_err(|e| ApiError::internal(format!("Failed to sign token: {e}")))?;
    let refresh_token = encode(&Header::default(), &refresh, &key)
        .map_err(|e| ApiError::internal(format!("Failed to sign token: {e}")))?;

    Ok(TokenPair {
        access_token,
        refresh_token,
    })
}

/// Verify an access token and return the user id it names.
pub fn verify_access_token(config: &ApiConfig, token: &str) -> Result<Uuid, ApiError> {
    let key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
    let validation = Validation::default();

    let data = decode::<Claims>(token, &key, &validation)
        .map_err(|_| ApiError::unauthorized("Invalid or expired token"))?;

    if data.claims.token_type != TOKEN_TYPE_ACCESS {
        return Err(ApiError::unauthorized("Invalid or expired token"));
    }

    Uuid::parse_str(&data.claims.sub)
        .map_err(|_| ApiError::unauthorized("Invalid or expired token"))
}

/// Hash a password for storage.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST)
        .map_err(|e| ApiError::internal(format!("Password hashing failed: {e}")))
}

/// Check a password against its stored hash.
pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}

/// Authenticated user extracted from the request.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("Missing Authorization header"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::unauthorized("Invalid Authorization header format"))?;

        let user_id = verify_access_token(&state.config, token)?;

        // Claims only carry identity; the account itself is re-checked here
        let user = state
            .users()
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| ApiError::unauthorized("Invalid or expired token"))?;

        if !user.is_active {
            return Err(ApiError::unauthorized("User account is deactivated"));
        }

        Ok(AuthUser {
            id: user.id,
            email: user.email,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_roundtrip() {
        let config = ApiConfig::default();
        let user_id = Uuid::new_v4();

        let pair = issue_token_pair(&config, user_id).unwrap();
        let decoded = verify_access_token(&config, &pair.access_token).unwrap();
        assert_eq!(decoded, user_id);
    }

    #[test]
    fn test_refresh_token_is_not_an_access_token() {
        let config = ApiConfig::default();
        let pair = issue_token_pair(&config, Uuid::new_v4()).unwrap();
        assert!(verify_access_token(&config, &pair.refresh_token).is_err());
    }

    #[test]
    fn test_garbage_token_rejected() {
        let config = ApiConfig::default();
        assert!(verify_access_token(&config, "not-a-token").is_err());
    }

    #[test]
    fn test_password_hash_roundtrip() {
        let hash = hash_password("hunter22").unwrap();
        assert!(verify_password("hunter22", &hash));
        assert!(!verify_password("hunter23", &hash));
    }
}
