//! Note service: CRUD for investment notes and their embedded trade logs.
//!
//! Every mutating operation is scoped to the note's owner. A note is readable
//! by anyone only once it has been published (`is_public`).

use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use cin_common::error::AppError;
use cin_common::types::{
    DEFAULT_CATEGORY, NOTE_CATEGORIES, Note, NoteWithTrades, Trade, TradeType,
};

const MAX_TITLE_LEN: usize = 200;
const MAX_TAGS: usize = 20;

/// Service layer for note and trade CRUD operations.
pub struct NoteService;

/// A trade submitted together with a note, or appended to one.
#[derive(Debug, Clone, Deserialize)]
pub struct NewTrade {
    pub symbol: String,
    #[serde(rename = "type")]
    pub trade_type: TradeType,
    pub amount: f64,
    pub price: f64,
    #[serde(default, alias = "date")]
    pub trade_date: Option<NaiveDate>,
    #[serde(default, alias = "notes")]
    pub memo: Option<String>,
}

impl NewTrade {
    /// Check the trade and return it in stored form (upper-cased symbol, dated).
    pub fn validate(&self) -> Result<NewTrade, AppError> {
        let symbol = self.symbol.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(AppError::Validation("Trade symbol is required".to_string()));
        }
        if !self.amount.is_finite() || self.amount <= 0.0 {
            return Err(AppError::Validation(format!(
                "Trade amount must be a positive number, got {}",
                self.amount
            )));
        }
        if !self.price.is_finite() || self.price <= 0.0 {
            return Err(AppError::Validation(format!(
                "Trade price must be a positive number, got {}",
                self.price
            )));
        }

        Ok(NewTrade {
            symbol,
            trade_type: self.trade_type,
            amount: self.amount,
            price: self.price,
            trade_date: Some(self.trade_date.unwrap_or_else(|| Utc::now().date_naive())),
            memo: Some(self.memo.as_deref().unwrap_or_default().trim().to_string()),
        })
    }
}

/// Parameters for creating a new note.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateNoteParams {
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(alias = "isPublic")]
    pub is_public: Option<bool>,
    #[serde(default)]
    pub trades: Vec<NewTrade>,
}

/// Parameters for updating an existing note. Omitted fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateNoteParams {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    #[serde(alias = "isPublic")]
    pub is_public: Option<bool>,
}

impl NoteService {
    /// Create a note and its trades in one transaction.
    pub async fn create(
        pool: &PgPool,
        user_id: Uuid,
        params: &CreateNoteParams,
    ) -> Result<NoteWithTrades, AppError> {
        let title = validate_title(&params.title)?;
        let category = validate_category(params.category.as_deref())?;
        let tags = normalize_tags(&params.tags)?;
        let trades = params
            .trades
            .iter()
            .map(NewTrade::validate)
            .collect::<Result<Vec<_>, _>>()?;

        let mut tx = pool.begin().await?;

        let note: Note = sqlx::query_as(
            r#"
            INSERT INTO notes (id, user_id, title, content, category, tags, is_public, views, likes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, 0, 0)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(&title)
        .bind(&params.content)
        .bind(&category)
        .bind(&tags)
        .bind(params.is_public.unwrap_or(false))
        .fetch_one(&mut *tx)
        .await?;

        let mut inserted = Vec::with_capacity(trades.len());
        for trade in &trades {
            inserted.push(insert_trade(&mut *tx, note.id, trade).await?);
        }

        tx.commit().await?;

        tracing::info!(
            note_id = %note.id,
            user_id = %user_id,
            trades = inserted.len(),
            is_public = note.is_public,
            "Note created"
        );

        Ok(NoteWithTrades {
            note,
            trades: inserted,
        })
    }

    /// List all notes owned by a user, with trades, newest update first.
    pub async fn list_by_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<NoteWithTrades>, AppError> {
        let notes: Vec<Note> = sqlx::query_as(
            "SELECT * FROM notes WHERE user_id = $1 ORDER BY updated_at DESC",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Self::attach_trades(pool, notes).await
    }

    /// Get a single note by ID regardless of visibility.
    pub async fn get(pool: &PgPool, note_id: Uuid) -> Result<Note, AppError> {
        sqlx::query_as("SELECT * FROM notes WHERE id = $1")
            .bind(note_id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Note {} not found", note_id)))
    }

    /// Get a note with trades if `viewer` may see it.
    ///
    /// Private notes of other users are reported as missing.
    pub async fn get_visible(
        pool: &PgPool,
        note_id: Uuid,
        viewer: Option<Uuid>,
    ) -> Result<NoteWithTrades, AppError> {
        let note = Self::get(pool, note_id).await?;
        if !is_visible_to(&note, viewer) {
            return Err(AppError::NotFound(format!("Note {} not found", note_id)));
        }

        let trades = Self::trades_for(pool, note_id).await?;
        Ok(NoteWithTrades { note, trades })
    }

    /// Update a note's editable fields.
    pub async fn update(
        pool: &PgPool,
        note_id: Uuid,
        user_id: Uuid,
        params: &UpdateNoteParams,
    ) -> Result<NoteWithTrades, AppError> {
        let existing = Self::get_owned(pool, note_id, user_id).await?;

        let title = match &params.title {
            Some(title) => validate_title(title)?,
            None => existing.title,
        };
        let category = match &params.category {
            Some(category) => validate_category(Some(category))?,
            None => existing.category,
        };
        let tags = match &params.tags {
            Some(tags) => normalize_tags(tags)?,
            None => existing.tags,
        };
        let content = params.content.clone().unwrap_or(existing.content);
        let is_public = params.is_public.unwrap_or(existing.is_public);

        let note: Note = sqlx::query_as(
            r#"
            UPDATE notes
            SET title = $1, content = $2, category = $3, tags = $4, is_public = $5, updated_at = NOW()
            WHERE id = $6
            RETURNING *
            "#,
        )
        .bind(&title)
        .bind(&content)
        .bind(&category)
        .bind(&tags)
        .bind(is_public)
        .bind(note_id)
        .fetch_one(pool)
        .await?;

        if existing.is_public != is_public {
            tracing::info!(note_id = %note_id, is_public, "Note visibility changed");
        }
        tracing::info!(note_id = %note_id, "Note updated");

        let trades = Self::trades_for(pool, note_id).await?;
        Ok(NoteWithTrades { note, trades })
    }

    /// Delete a note and its trades. Returns true if it was deleted.
    pub async fn delete(pool: &PgPool, note_id: Uuid, user_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM notes WHERE id = $1 AND user_id = $2")
            .bind(note_id)
            .bind(user_id)
            .execute(pool)
            .await?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            tracing::info!(note_id = %note_id, "Note deleted");
        }

        Ok(deleted)
    }

    /// Append a trade to an owned note.
    pub async fn add_trade(
        pool: &PgPool,
        note_id: Uuid,
        user_id: Uuid,
        trade: &NewTrade,
    ) -> Result<Trade, AppError> {
        Self::get_owned(pool, note_id, user_id).await?;
        let trade = trade.validate()?;

        let mut tx = pool.begin().await?;
        let inserted = insert_trade(&mut *tx, note_id, &trade).await?;
        touch_note(&mut *tx, note_id).await?;
        tx.commit().await?;

        tracing::info!(
            note_id = %note_id,
            trade_id = %inserted.id,
            symbol = %inserted.symbol,
            trade_type = %inserted.trade_type,
            "Trade recorded"
        );

        Ok(inserted)
    }

    /// Remove a trade from an owned note. Returns true if it was deleted.
    pub async fn delete_trade(
        pool: &PgPool,
        note_id: Uuid,
        trade_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, AppError> {
        let mut tx = pool.begin().await?;
        let result = sqlx::query(
            r#"
            DELETE FROM trades t
            USING notes n
            WHERE t.id = $1 AND t.note_id = $2 AND n.id = t.note_id AND n.user_id = $3
            "#,
        )
        .bind(trade_id)
        .bind(note_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            touch_note(&mut *tx, note_id).await?;
        }
        tx.commit().await?;

        if deleted {
            tracing::info!(note_id = %note_id, trade_id = %trade_id, "Trade deleted");
        }

        Ok(deleted)
    }

    /// Increment the like counter of a note visible to `viewer`.
    pub async fn like(pool: &PgPool, note_id: Uuid, viewer: Uuid) -> Result<Note, AppError> {
        let note = Self::get(pool, note_id).await?;
        if !is_visible_to(&note, Some(viewer)) {
            return Err(AppError::NotFound(format!("Note {} not found", note_id)));
        }

        let note: Note =
            sqlx::query_as("UPDATE notes SET likes = likes + 1 WHERE id = $1 RETURNING *")
                .bind(note_id)
                .fetch_one(pool)
                .await?;

        tracing::debug!(note_id = %note_id, likes = note.likes, "Note liked");
        Ok(note)
    }

    /// Trades of one note, newest trade date first.
    pub async fn trades_for(pool: &PgPool, note_id: Uuid) -> Result<Vec<Trade>, AppError> {
        let trades: Vec<Trade> = sqlx::query_as(
            "SELECT * FROM trades WHERE note_id = $1 ORDER BY trade_date DESC, created_at DESC",
        )
        .bind(note_id)
        .fetch_all(pool)
        .await?;

        Ok(trades)
    }

    /// Load the trades of many notes with one query and pair them up.
    pub async fn attach_trades(pool: &PgPool, notes: Vec<Note>) -> Result<Vec<NoteWithTrades>, AppError> {
        if notes.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = notes.iter().map(|n| n.id).collect();
        let trades: Vec<Trade> = sqlx::query_as(
            "SELECT * FROM trades WHERE note_id = ANY($1) ORDER BY trade_date DESC, created_at DESC",
        )
        .bind(&ids)
        .fetch_all(pool)
        .await?;

        Ok(group_trades(notes, trades))
    }

    async fn get_owned(pool: &PgPool, note_id: Uuid, user_id: Uuid) -> Result<Note, AppError> {
        let note = Self::get(pool, note_id).await?;
        if note.user_id != user_id {
            return Err(AppError::Forbidden(
                "Not authorized to modify this note".to_string(),
            ));
        }
        Ok(note)
    }
}

async fn insert_trade<'e, E>(executor: E, note_id: Uuid, trade: &NewTrade) -> Result<Trade, AppError>
where
    E: PgExecutor<'e>,
{
    let trade: Trade = sqlx::query_as(
        r#"
        INSERT INTO trades (id, note_id, symbol, trade_type, amount, price, trade_date, memo)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(note_id)
    .bind(&trade.symbol)
    .bind(trade.trade_type)
    .bind(trade.amount)
    .bind(trade.price)
    .bind(trade.trade_date.unwrap_or_else(|| Utc::now().date_naive()))
    .bind(trade.memo.as_deref().unwrap_or_default())
    .fetch_one(executor)
    .await?;

    Ok(trade)
}

/// Mark a note as edited after its trade log changed.
async fn touch_note<'e, E>(executor: E, note_id: Uuid) -> Result<(), AppError>
where
    E: PgExecutor<'e>,
{
    sqlx::query("UPDATE notes SET updated_at = NOW() WHERE id = $1")
        .bind(note_id)
        .execute(executor)
        .await?;
    Ok(())
}

fn is_visible_to(note: &Note, viewer: Option<Uuid>) -> bool {
    note.is_public || viewer == Some(note.user_id)
}

/// Pair notes with their trades, keeping note order and per-note trade order.
fn group_trades(notes: Vec<Note>, trades: Vec<Trade>) -> Vec<NoteWithTrades> {
    let mut by_note: HashMap<Uuid, Vec<Trade>> = HashMap::new();
    for trade in trades {
        by_note.entry(trade.note_id).or_default().push(trade);
    }

    notes
        .into_iter()
        .map(|note| {
            let trades = by_note.remove(&note.id).unwrap_or_default();
            NoteWithTrades { note, trades }
        })
        .collect()
}

fn validate_title(title: &str) -> Result<String, AppError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(AppError::Validation("Note title is required".to_string()));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(AppError::Validation(format!(
            "Note title must be at most {} characters",
            MAX_TITLE_LEN
        )));
    }
    Ok(title.to_string())
}

fn validate_category(category: Option<&str>) -> Result<String, AppError> {
    let category = category.map(str::trim).filter(|c| !c.is_empty());
    match category {
        None => Ok(DEFAULT_CATEGORY.to_string()),
        Some(c) if NOTE_CATEGORIES.contains(&c) => Ok(c.to_string()),
        Some(c) => Err(AppError::Validation(format!(
            "Invalid category '{}'. Valid categories: {}",
            c,
            NOTE_CATEGORIES.join(", ")
        ))),
    }
}

/// Trim tags, drop empties and duplicates (first occurrence wins).
fn normalize_tags(tags: &[String]) -> Result<Vec<String>, AppError> {
    let mut normalized: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !normalized.iter().any(|t| t == tag) {
            normalized.push(tag.to_string());
        }
    }

    if normalized.len() > MAX_TAGS {
        return Err(AppError::Validation(format!(
            "A note can carry at most {} tags",
            MAX_TAGS
        )));
    }

    Ok(normalized)
}
