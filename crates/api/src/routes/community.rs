//! Public community feed.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use uuid::Uuid;

use cin_common::error::AppError;
use cin_common::types::FeedNote;
use cin_notes::feed::{FeedQuery, FeedService, PublicNoteDetail};

use crate::extract::{ApiPath, ApiQuery};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/community/notes", get(list_feed))
        .route("/api/community/notes/{id}", get(open_note))
}

/// GET /api/community/notes: Published notes from all users.
async fn list_feed(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<FeedQuery>,
) -> Result<Json<Vec<FeedNote>>, AppError> {
    Ok(Json(FeedService::list(&state.pool, &query).await?))
}

/// GET /api/community/notes/{id}: Open a published note; counts as a view.
async fn open_note(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<PublicNoteDetail>, AppError> {
    Ok(Json(FeedService::open(&state.pool, id).await?))
}
