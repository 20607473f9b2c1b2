//! Identity and session handling: password hashing, login, bearer tokens and
//! the `Caller` extractor used by every authenticated handler.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    async_trait,
    extract::{FromRequestParts, State},
    http::{header::AUTHORIZATION, request::Parts},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::sync::Arc;
use thiserror::Error;

use super::error::{ApiError, ValidationErrorBuilder};
use super::extract::AppJson;
use super::response::{ApiResponse, ApiResult};
use crate::config::AuthConfig;
use crate::db::{LoginRequest, LoginResponse, User, UserRole};
use crate::AppState;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("Account is inactive")]
    AccountInactive,
    #[error("Token not found")]
    MissingToken,
    #[error("Invalid token")]
    TokenInvalid,
    #[error("Token has expired")]
    TokenExpired,
    #[error("User not found")]
    UserNotFound,
    #[error("Failed to issue token: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::AccountInactive => ApiError::forbidden(err.to_string()),
            AuthError::InvalidCredentials
            | AuthError::MissingToken
            | AuthError::TokenInvalid
            | AuthError::TokenExpired
            | AuthError::UserNotFound => ApiError::unauthorized(err.to_string()),
            AuthError::Signing(e) => {
                tracing::error!("Token signing failed: {}", e);
                ApiError::internal("Failed to issue token").with_detail(e.to_string())
            }
            AuthError::Database(e) => ApiError::from(e),
        }
    }
}

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2.hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a password against a hash
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Session token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: i64,
    pub username: String,
    pub status: bool,
    pub level_role: i64,
    pub iat: i64,
    pub exp: i64,
}

/// Sign a session token for `user`
pub fn issue_token(config: &AuthConfig, user: &User) -> Result<String, AuthError> {
    let now = Utc::now();
    let claims = Claims {
        sub: user.id,
        username: user.username.clone(),
        status: user.status,
        level_role: user.level_role,
        iat: now.timestamp(),
        exp: (now + Duration::hours(config.token_ttl_hours)).timestamp(),
    };

    let token = jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )?;
    Ok(token)
}

/// Verify a token's signature and expiry
pub fn decode_token(config: &AuthConfig, token: &str) -> Result<Claims, AuthError> {
    jsonwebtoken::decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        _ => AuthError::TokenInvalid,
    })
}

/// Check credentials and issue a session token.
///
/// Inactive accounts are rejected before the password is checked.
pub async fn authenticate(
    db: &SqlitePool,
    config: &AuthConfig,
    username: &str,
    password: &str,
) -> Result<(User, String), AuthError> {
    let user = User::find_by_username(db, username)
        .await?
        .ok_or(AuthError::InvalidCredentials)?;

    if !user.status {
        return Err(AuthError::AccountInactive);
    }

    if !verify_password(password, &user.password_hash) {
        return Err(AuthError::InvalidCredentials);
    }

    let token = issue_token(config, &user)?;
    Ok((user, token))
}

/// The authenticated identity behind a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Caller {
    pub id: i64,
    pub username: String,
    pub status: bool,
    pub level_role: UserRole,
}

impl Caller {
    pub fn is_admin(&self) -> bool {
        self.level_role == UserRole::Admin
    }
}

/// Resolve a token to a live, active caller.
///
/// The role comes from the stored user row, not from the token.
pub async fn resolve_token(
    db: &SqlitePool,
    config: &AuthConfig,
    token: &str,
) -> Result<Caller, AuthError> {
    let claims = decode_token(config, token)?;

    let user = User::find_by_id(db, claims.sub)
        .await?
        .ok_or(AuthError::UserNotFound)?;

    if !user.status {
        return Err(AuthError::AccountInactive);
    }

    Ok(Caller {
        id: user.id,
        level_role: user.role(),
        username: user.username,
        status: user.status,
    })
}

/// Extract the bearer token from request headers
fn extract_token(headers: &axum::http::HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_token(&parts.headers).ok_or(AuthError::MissingToken)?;
        let caller = resolve_token(&state.db, &state.config.auth, token).await?;
        Ok(caller)
    }
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    AppJson(request): AppJson<LoginRequest>,
) -> ApiResult<LoginResponse> {
    let username = request.username.unwrap_or_default();
    let password = request.password.unwrap_or_default();

    let mut errors = ValidationErrorBuilder::new();
    if username.is_empty() {
        errors.add("username", "Username is required");
    }
    if password.is_empty() {
        errors.add("password", "Password is required");
    }
    errors.finish()?;

    let (user, token) = authenticate(&state.db, &state.config.auth, &username, &password)
        .await
        .map_err(|e| {
            tracing::info!(username = %username, "Login rejected: {}", e);
            e
        })?;

    tracing::info!(user_id = user.id, "User logged in");

    Ok(ApiResponse::success(
        "Login successful",
        LoginResponse {
            level_role: user.role(),
            username: user.username,
            status: user.status,
            token,
        },
    ))
}

/// GET /api/auth/me
pub async fn me(caller: Caller) -> ApiResult<Caller> {
    Ok(ApiResponse::success("Current user", caller))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderMap;

    fn test_config() -> AuthConfig {
        AuthConfig {
            jwt_secret: "test-secret".to_string(),
            token_ttl_hours: 1,
            admin_username: "admin".to_string(),
            admin_password: None,
        }
    }

    fn test_user() -> User {
        User {
            id: 42,
            username: "alice".to_string(),
            password_hash: String::new(),
            status: true,
            level_role: 1,
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
            updated_at: "2026-01-01T00:00:00.000Z".to_string(),
            deleted_at: None,
        }
    }

    #[test]
    fn test_password_roundtrip() {
        let hash = hash_password("secret123").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("secret123", &hash));
        assert!(!verify_password("wrong", &hash));
        assert!(!verify_password("secret123", "not-a-hash"));
    }

    #[test]
    fn test_token_claims() {
        let config = test_config();
        let token = issue_token(&config, &test_user()).unwrap();
        let claims = decode_token(&config, &token).unwrap();

        assert_eq!(claims.sub, 42);
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.level_role, 1);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_token_wrong_secret() {
        let token = issue_token(&test_config(), &test_user()).unwrap();
        let other = AuthConfig {
            jwt_secret: "other".to_string(),
            ..test_config()
        };
        assert!(matches!(
            decode_token(&other, &token),
            Err(AuthError::TokenInvalid)
        ));
        assert!(matches!(
            decode_token(&other, "garbage"),
            Err(AuthError::TokenInvalid)
        ));
    }

    #[test]
    fn test_expired_token() {
        let config = AuthConfig {
            token_ttl_hours: -2,
            ..test_config()
        };
        let token = issue_token(&config, &test_user()).unwrap();
        assert!(matches!(
            decode_token(&config, &token),
            Err(AuthError::TokenExpired)
        ));
    }

    #[test]
    fn test_extract_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_token(&headers), None);

        headers.insert(AUTHORIZATION, "Basic abc".parse().unwrap());
        assert_eq!(extract_token(&headers), None);

        headers.insert(AUTHORIZATION, "Bearer abc.def".parse().unwrap());
        assert_eq!(extract_token(&headers), Some("abc.def"));
    }

    #[test]
    fn test_auth_error_status() {
        use axum::http::StatusCode;

        assert_eq!(
            ApiError::from(AuthError::AccountInactive).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::from(AuthError::TokenExpired).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::from(AuthError::MissingToken).message(),
            "Token not found"
        );
    }
}
