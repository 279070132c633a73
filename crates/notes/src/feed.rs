//! Community feed: published notes from every user.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use cin_common::error::AppError;
use cin_common::types::{FeedNote, Trade};

use crate::filter::{NoteFilter, NoteSort, like_pattern};
use crate::notes::NoteService;

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;

/// Query-string parameters for the feed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    pub sort: Option<NoteSort>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl FeedQuery {
    pub fn filter(&self) -> NoteFilter {
        NoteFilter {
            search: self.search.clone(),
            category: self.category.clone(),
            sort: self.sort,
        }
    }

    /// Page size clamped to `1..=100`, defaulting to 20.
    pub fn page_size(&self) -> i64 {
        self.limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    pub fn page_offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }

    pub fn sort(&self) -> NoteSort {
        self.sort.unwrap_or(NoteSort::Trending)
    }
}

/// A published note opened from the feed.
#[derive(Debug, Clone, Serialize)]
pub struct PublicNoteDetail {
    #[serde(flatten)]
    pub note: FeedNote,
    pub trades: Vec<Trade>,
}

/// Read-only service over published notes.
pub struct FeedService;

impl FeedService {
    /// List published notes, filtered and paginated.
    pub async fn list(pool: &PgPool, query: &FeedQuery) -> Result<Vec<FeedNote>, AppError> {
        let filter = query.filter();
        let search = filter.search_term().map(|t| like_pattern(&t));
        let category = filter.category_filter().map(str::to_string);

        let sql = format!(
            r#"
            SELECT n.*,
                   u.wallet_address AS author_wallet,
                   (SELECT COUNT(*) FROM trades t WHERE t.note_id = n.id) AS trade_count
            FROM notes n
            JOIN users u ON u.id = n.user_id
            WHERE n.is_public = true
              AND ($1::text IS NULL
                   OR n.title ILIKE $1
                   OR n.content ILIKE $1
                   OR EXISTS (SELECT 1 FROM unnest(n.tags) AS tag WHERE tag ILIKE $1))
              AND ($2::text IS NULL OR n.category = $2)
            ORDER BY {}
            LIMIT $3 OFFSET $4
            "#,
            query.sort().order_by_clause()
        );

        let notes: Vec<FeedNote> = sqlx::query_as(&sql)
            .bind(search)
            .bind(category)
            .bind(query.page_size())
            .bind(query.page_offset())
            .fetch_all(pool)
            .await?;

        tracing::debug!(count = notes.len(), "Community feed listed");
        Ok(notes)
    }

    /// Open a published note, counting the view.
    ///
    /// The view bump and the read are one statement, so a note unpublished or
    /// deleted meanwhile is reported as missing.
    pub async fn open(pool: &PgPool, note_id: Uuid) -> Result<PublicNoteDetail, AppError> {
        let note: FeedNote = sqlx::query_as(
            r#"
            WITH opened AS (
                UPDATE notes SET views = views + 1
                WHERE id = $1 AND is_public = true
                RETURNING *
            )
            SELECT n.*,
                   u.wallet_address AS author_wallet,
                   (SELECT COUNT(*) FROM trades t WHERE t.note_id = n.id) AS trade_count
            FROM opened n
            JOIN users u ON u.id = n.user_id
            "#,
        )
        .bind(note_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Note {} not found", note_id)))?;

        let trades = NoteService::trades_for(pool, note_id).await?;
        Ok(PublicNoteDetail { note, trades })
    }
}
