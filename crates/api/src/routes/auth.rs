//! Authentication routes: wallet login, SIWE sessions and API keys.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use cin_common::error::AppError;
use cin_common::types::User;
use cin_notes::users::UserService;

use crate::extract::ApiJson;
use crate::middleware::auth::{AuthUser, encode_jwt};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/wallet-login", post(wallet_login))
        .route("/api/auth/siwe", post(siwe_login))
        .route("/api/auth/api-keys", post(generate_api_key))
        .route("/api/auth/me", get(me))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletLoginRequest {
    pub wallet_address: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct WalletLoginResponse {
    pub message: &'static str,
    pub user: User,
}

/// Request body for SIWE login.
#[derive(Debug, Deserialize)]
pub struct SiweLoginRequest {
    /// The EIP-4361 message as signed by the wallet
    pub message: String,
    /// Hex signature, with or without `0x`
    pub signature: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user_id: Uuid,
    pub wallet_address: String,
}

#[derive(Debug, Serialize)]
pub struct ApiKeyResponse {
    pub api_key: String,
}

/// POST /api/auth/wallet-login: look up a wallet, registering it on first use.
///
/// Answers 201 for a new user and 200 for a returning one. No session is
/// issued here since the caller has not proven control of the key.
async fn wallet_login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<WalletLoginRequest>,
) -> Result<(StatusCode, Json<WalletLoginResponse>), AppError> {
    let wallet_address = req
        .wallet_address
        .as_deref()
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .ok_or_else(|| AppError::Validation("Wallet address is required".to_string()))?;

    let (user, created) = UserService::find_or_create(&state.pool, wallet_address).await?;

    let (status, message) = if created {
        (StatusCode::CREATED, "User signed up successfully")
    } else {
        (StatusCode::OK, "User logged in successfully")
    };

    Ok((status, Json(WalletLoginResponse { message, user })))
}

/// POST /api/auth/siwe: verify a SIWE message and signature, return a JWT.
async fn siwe_login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<SiweLoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let message: siwe::Message = req
        .message
        .parse()
        .map_err(|e| AppError::Validation(format!("Invalid SIWE message: {}", e)))?;

    let signature = req.signature.trim();
    let sig_bytes = hex::decode(signature.strip_prefix("0x").unwrap_or(signature))
        .map_err(|e| AppError::Validation(format!("Invalid hex signature: {}", e)))?;

    // No domain or nonce binding, only signature and validity window
    message
        .verify(&sig_bytes, &siwe::VerificationOpts::default())
        .await
        .map_err(|e| AppError::Auth(format!("Signature verification failed: {}", e)))?;

    let user = UserService::upsert(&state.pool, &format!("0x{}", hex::encode(message.address)))
        .await?;

    let token = encode_jwt(
        user.id,
        &state.config.jwt_secret,
        state.config.jwt_expiry_hours,
    )?;

    tracing::info!(user_id = %user.id, wallet = %user.wallet_address, "User authenticated via SIWE");

    Ok(Json(LoginResponse {
        token,
        user_id: user.id,
        wallet_address: user.wallet_address,
    }))
}

/// POST /api/auth/api-keys: replace the caller's API key with a fresh one.
async fn generate_api_key(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiKeyResponse>, AppError> {
    let api_key = format!("cin_{}", Uuid::new_v4().simple());
    UserService::set_api_key(&state.pool, auth.user_id, &api_key).await?;

    tracing::info!(user_id = %auth.user_id, "API key generated");

    Ok(Json(ApiKeyResponse { api_key }))
}

/// GET /api/auth/me
async fn me(State(state): State<AppState>, auth: AuthUser) -> Result<Json<User>, AppError> {
    Ok(Json(UserService::get(&state.pool, auth.user_id).await?))
}
