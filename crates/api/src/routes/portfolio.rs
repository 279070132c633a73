//! Portfolio analytics over the caller's trade logs.
//!
//! Everything is recomputed from the stored notes on each request.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use cin_common::error::AppError;
use cin_common::types::NoteWithTrades;
use cin_notes::notes::NoteService;
use cin_notes::portfolio::{
    self, AllocationSlice, Holding, MonthlySummary, PerformanceMetrics, TradeEntry,
    TradeTypeFilter,
};

use crate::extract::ApiQuery;
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/portfolio", get(overview))
        .route("/api/portfolio/metrics", get(metrics))
        .route("/api/portfolio/holdings", get(holdings))
        .route("/api/portfolio/allocation", get(allocation))
        .route("/api/portfolio/trades", get(trades))
        .route("/api/portfolio/monthly", get(monthly))
}

#[derive(Debug, Default, Deserialize)]
pub struct TradeHistoryQuery {
    #[serde(rename = "type", default)]
    pub trade_type: TradeTypeFilter,
}

/// Dashboard payload: metrics, open positions and their allocation.
#[derive(Debug, Serialize)]
pub struct PortfolioOverview {
    pub metrics: PerformanceMetrics,
    pub holdings: Vec<Holding>,
    pub allocation: Vec<AllocationSlice>,
}

async fn load_notes(state: &AppState, auth: &AuthUser) -> Result<Vec<NoteWithTrades>, AppError> {
    NoteService::list_by_user(&state.pool, auth.user_id).await
}

/// GET /api/portfolio
async fn overview(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<PortfolioOverview>, AppError> {
    let notes = load_notes(&state, &auth).await?;
    let holdings = portfolio::holdings(&notes);

    Ok(Json(PortfolioOverview {
        metrics: portfolio::performance_metrics(&notes),
        allocation: portfolio::allocation(&holdings),
        holdings,
    }))
}

/// GET /api/portfolio/metrics
async fn metrics(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<PerformanceMetrics>, AppError> {
    let notes = load_notes(&state, &auth).await?;
    Ok(Json(portfolio::performance_metrics(&notes)))
}

/// GET /api/portfolio/holdings
async fn holdings(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<Holding>>, AppError> {
    let notes = load_notes(&state, &auth).await?;
    Ok(Json(portfolio::holdings(&notes)))
}

/// GET /api/portfolio/allocation
async fn allocation(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<AllocationSlice>>, AppError> {
    let notes = load_notes(&state, &auth).await?;
    Ok(Json(portfolio::allocation(&portfolio::holdings(&notes))))
}

/// GET /api/portfolio/trades?type=buy|sell|all
async fn trades(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<TradeHistoryQuery>,
) -> Result<Json<Vec<TradeEntry>>, AppError> {
    let notes = load_notes(&state, &auth).await?;
    Ok(Json(portfolio::trade_history(&notes, query.trade_type)))
}

/// GET /api/portfolio/monthly
async fn monthly(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<MonthlySummary>>, AppError> {
    let notes = load_notes(&state, &auth).await?;
    Ok(Json(portfolio::monthly_summary(&notes)))
}
