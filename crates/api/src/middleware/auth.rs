//! Session tokens and the extractors that gate protected routes.
//!
//! A session is an HS256 JWT issued after Sign-In with Ethereum. Scripts may
//! use a long-lived API key instead, sent as `X-API-Key`.

use axum::extract::{FromRequestParts, OptionalFromRequestParts};
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use cin_common::error::AppError;
use cin_notes::users::UserService;

use crate::state::AppState;

/// JWT claims stored in the token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject: the user's UUID
    pub sub: String,
    /// Expiration time (UNIX timestamp)
    pub exp: i64,
    /// Issued at (UNIX timestamp)
    pub iat: i64,
}

/// How a request proved its identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    Jwt,
    ApiKey,
}

/// Authenticated caller.
///
/// Add it to a handler's arguments to make the route require a session:
/// ```ignore
/// async fn handler(auth: AuthUser) -> impl IntoResponse {
///     // auth.user_id is the caller's UUID
/// }
/// ```
/// Use `Option<AuthUser>` where anonymous access is allowed but the caller
/// should be recognised when credentials are present.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub method: AuthMethod,
}

/// Encode a JWT token for a user.
pub fn encode_jwt(user_id: Uuid, secret: &str, expiry_hours: u64) -> Result<String, AppError> {
    let now = Utc::now();
    let exp = i64::try_from(expiry_hours)
        .ok()
        .and_then(Duration::try_hours)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .ok_or_else(|| {
            AppError::Config(format!("JWT expiry of {} hours is out of range", expiry_hours))
        })?;
    let claims = Claims {
        sub: user_id.to_string(),
        exp: exp.timestamp(),
        iat: now.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Auth(format!("Failed to encode JWT: {}", e)))
}

/// Decode and validate a JWT token.
pub fn decode_jwt(token: &str, secret: &str) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| AppError::Auth(format!("Invalid token: {}", e)))
}

/// Credentials found on a request, before validation.
enum Credentials {
    Bearer(String),
    ApiKey(String),
}

fn credentials(parts: &Parts) -> Option<Credentials> {
    let header = |name: &str| {
        parts
            .headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    if let Some(token) = header("authorization").and_then(|v| v.strip_prefix("Bearer ")) {
        return Some(Credentials::Bearer(token.trim().to_string()));
    }
    header("x-api-key").map(|key| Credentials::ApiKey(key.to_string()))
}

async fn authenticate(credentials: Credentials, state: &AppState) -> Result<AuthUser, AppError> {
    match credentials {
        Credentials::Bearer(token) => {
            let claims = decode_jwt(&token, &state.config.jwt_secret)?;
            let user_id = Uuid::parse_str(&claims.sub)
                .map_err(|_| AppError::Auth("Invalid user ID in token".to_string()))?;
            Ok(AuthUser {
                user_id,
                method: AuthMethod::Jwt,
            })
        }
        Credentials::ApiKey(key) => {
            let user_id = UserService::find_by_api_key(&state.pool, &key)
                .await?
                .ok_or_else(|| AppError::Auth("Unknown API key".to_string()))?;
            Ok(AuthUser {
                user_id,
                method: AuthMethod::ApiKey,
            })
        }
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let credentials = credentials(parts).ok_or_else(|| {
            AppError::Auth(
                "Missing or invalid Authorization header. Use 'Bearer <JWT>' or 'X-API-Key: <key>'"
                    .to_string(),
            )
        })?;
        authenticate(credentials, state).await
    }
}

/// Anonymous requests yield `None`; presented but invalid credentials are
/// still rejected.
impl OptionalFromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Option<Self>, Self::Rejection> {
        match credentials(parts) {
            Some(credentials) => authenticate(credentials, state).await.map(Some),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::http::Request;

    use super::*;

    const TEST_SECRET: &str = "test-secret-key-for-unit-tests";

    fn parts_with(headers: &[(&str, &str)]) -> Parts {
        let mut builder = Request::builder().uri("/api/notes");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_encode_decode_jwt() {
        let user_id = Uuid::new_v4();
        let token = encode_jwt(user_id, TEST_SECRET, 24).unwrap();
        let claims = decode_jwt(&token, TEST_SECRET).unwrap();
        assert_eq!(claims.sub, user_id.to_string());
        assert!(claims.exp > Utc::now().timestamp());
        assert!(claims.iat <= Utc::now().timestamp());
    }

    #[test]
    fn test_invalid_secret_rejected() {
        let token = encode_jwt(Uuid::new_v4(), TEST_SECRET, 24).unwrap();
        assert!(decode_jwt(&token, "wrong-secret").is_err());
    }

    #[test]
    fn test_expired_jwt_rejected() {
        let now = Utc::now();
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            exp: (now - Duration::hours(1)).timestamp(),
            iat: (now - Duration::hours(2)).timestamp(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
        )
        .unwrap();

        assert!(decode_jwt(&token, TEST_SECRET).is_err());
    }

    #[test]
    fn test_unrepresentable_expiry_is_config_error() {
        let result = encode_jwt(Uuid::new_v4(), TEST_SECRET, u64::MAX);
        assert!(matches!(result, Err(AppError::Config(_))));

        let result = encode_jwt(Uuid::new_v4(), TEST_SECRET, 3_000_000_000_000_000);
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_garbage_token_rejected() {
        assert!(decode_jwt("not.a.valid.jwt", TEST_SECRET).is_err());
    }

    #[test]
    fn test_bearer_preferred_over_api_key() {
        let parts = parts_with(&[("authorization", "Bearer abc.def"), ("x-api-key", "cin_key")]);
        assert!(matches!(credentials(&parts), Some(Credentials::Bearer(t)) if t == "abc.def"));
    }

    #[test]
    fn test_api_key_and_missing_credentials() {
        let parts = parts_with(&[("x-api-key", "cin_key")]);
        assert!(matches!(credentials(&parts), Some(Credentials::ApiKey(k)) if k == "cin_key"));

        let parts = parts_with(&[("authorization", "Basic dXNlcjpwYXNz")]);
        assert!(credentials(&parts).is_none());

        let parts = parts_with(&[]);
        assert!(credentials(&parts).is_none());
    }
}
