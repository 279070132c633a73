pub mod auth;
pub mod community;
pub mod faucet;
pub mod health;
pub mod notes;
pub mod portfolio;

use axum::Router;

use crate::state::AppState;

/// Build the complete API router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(auth::router())
        .merge(notes::router())
        .merge(community::router())
        .merge(portfolio::router())
        .merge(faucet::router())
        .with_state(state)
}
