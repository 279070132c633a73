//! Shared application state for the Axum API server.

use std::sync::Arc;

use cin_common::config::AppConfig;
use cin_token::FaucetService;
use redis::aio::ConnectionManager;
use sqlx::PgPool;

/// Application state shared across all route handlers via Axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub redis: ConnectionManager,
    pub config: AppConfig,
    pub faucet: Arc<FaucetService>,
}

impl AppState {
    pub fn new(
        pool: PgPool,
        redis: ConnectionManager,
        config: AppConfig,
        faucet: FaucetService,
    ) -> Self {
        Self {
            pool,
            redis,
            config,
            faucet: Arc::new(faucet),
        }
    }
}
