//! Note and trade-log routes for the signed-in user.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::json;
use uuid::Uuid;

use cin_common::error::AppError;
use cin_common::types::{Note, NoteWithTrades, Trade};
use cin_notes::filter::{NoteFilter, NoteSort};
use cin_notes::notes::{CreateNoteParams, NewTrade, NoteService, UpdateNoteParams};

use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/notes", post(create_note).get(list_notes))
        .route(
            "/api/notes/{id}",
            get(get_note).patch(update_note).delete(delete_note),
        )
        .route("/api/notes/{id}/like", post(like_note))
        .route("/api/notes/{id}/trades", post(add_trade))
        .route("/api/notes/{id}/trades/{trade_id}", delete(delete_trade))
}

/// POST /api/notes: Create a note, optionally with its first trades.
async fn create_note(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(params): ApiJson<CreateNoteParams>,
) -> Result<(StatusCode, Json<NoteWithTrades>), AppError> {
    let note = NoteService::create(&state.pool, auth.user_id, &params).await?;
    Ok((StatusCode::CREATED, Json(note)))
}

/// GET /api/notes: The caller's notes, filtered by `search`, `category` and `sort`.
async fn list_notes(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiQuery(filter): ApiQuery<NoteFilter>,
) -> Result<Json<Vec<NoteWithTrades>>, AppError> {
    let notes = NoteService::list_by_user(&state.pool, auth.user_id).await?;
    Ok(Json(filter.apply(notes, NoteSort::Updated)))
}

/// GET /api/notes/{id}: Own notes, or anyone's published note.
async fn get_note(
    State(state): State<AppState>,
    auth: Option<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<NoteWithTrades>, AppError> {
    let viewer = auth.map(|a| a.user_id);
    Ok(Json(NoteService::get_visible(&state.pool, id, viewer).await?))
}

/// PATCH /api/notes/{id}
async fn update_note(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(params): ApiJson<UpdateNoteParams>,
) -> Result<Json<NoteWithTrades>, AppError> {
    let note = NoteService::update(&state.pool, id, auth.user_id, &params).await?;
    Ok(Json(note))
}

/// DELETE /api/notes/{id}: Delete a note together with its trades.
async fn delete_note(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    if NoteService::delete(&state.pool, id, auth.user_id).await? {
        Ok(Json(json!({"deleted": true})))
    } else {
        Err(AppError::NotFound(format!("Note {} not found", id)))
    }
}

/// POST /api/notes/{id}/like
async fn like_note(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Note>, AppError> {
    Ok(Json(NoteService::like(&state.pool, id, auth.user_id).await?))
}

/// POST /api/notes/{id}/trades: Append a trade to an owned note.
async fn add_trade(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(trade): ApiJson<NewTrade>,
) -> Result<(StatusCode, Json<Trade>), AppError> {
    let trade = NoteService::add_trade(&state.pool, id, auth.user_id, &trade).await?;
    Ok((StatusCode::CREATED, Json(trade)))
}

/// DELETE /api/notes/{id}/trades/{trade_id}
async fn delete_trade(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath((id, trade_id)): ApiPath<(Uuid, Uuid)>,
) -> Result<Json<serde_json::Value>, AppError> {
    if NoteService::delete_trade(&state.pool, id, trade_id, auth.user_id).await? {
        Ok(Json(json!({"deleted": true})))
    } else {
        Err(AppError::NotFound(format!(
            "Trade {} not found on note {}",
            trade_id, id
        )))
    }
}
