//! CIN faucet routes.

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use cin_common::error::AppError;
use cin_notes::users::UserService;
use cin_token::{MintReceipt, TokenBalance};

use crate::extract::{ApiJson, ApiPath};
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/faucet/mint", post(mint))
        .route("/api/faucet/balance/{address}", get(balance))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MintRequest {
    /// Recipient; the caller's own wallet when omitted
    pub user_address: Option<String>,
}

/// POST /api/faucet/mint: Send the faucet allowance to an address.
async fn mint(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(req): ApiJson<MintRequest>,
) -> Result<Json<MintReceipt>, AppError> {
    let recipient = match req.user_address {
        Some(address) => address,
        None => UserService::get(&state.pool, auth.user_id).await?.wallet_address,
    };

    tracing::debug!(user_id = %auth.user_id, recipient = %recipient, "Faucet mint requested");

    let mut redis = state.redis.clone();
    let receipt = state.faucet.mint(&mut redis, &recipient).await?;
    Ok(Json(receipt))
}

/// GET /api/faucet/balance/{address}
async fn balance(
    State(state): State<AppState>,
    ApiPath(address): ApiPath<String>,
) -> Result<Json<TokenBalance>, AppError> {
    Ok(Json(state.faucet.balance(&address).await?))
}
