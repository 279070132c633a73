use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// Note categories offered by the editor. Anything else is rejected.
pub const NOTE_CATEGORIES: &[&str] = &[
    "Technical Analysis",
    "Fundamental Analysis",
    "Trading Strategy",
    "Market Trends",
    "Portfolio Management",
    "Risk Management",
    "DeFi",
    "NFT",
    "Other",
];

/// Category assigned when a note is created without one.
pub const DEFAULT_CATEGORY: &str = "Other";

/// Direction of a recorded trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TradeType {
    Buy,
    Sell,
}

impl std::fmt::Display for TradeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradeType::Buy => write!(f, "buy"),
            TradeType::Sell => write!(f, "sell"),
        }
    }
}

/// A user in the system, keyed by wallet address.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub wallet_address: String,
    pub email: Option<String>,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An investment note.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Note {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub content: String,
    pub category: String,
    pub tags: Vec<String>,
    pub is_public: bool,
    pub views: i64,
    pub likes: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A trade record embedded in a note.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Trade {
    pub id: Uuid,
    pub note_id: Uuid,
    pub symbol: String,
    #[serde(rename = "type")]
    pub trade_type: TradeType,
    pub amount: f64,
    pub price: f64,
    pub trade_date: NaiveDate,
    pub memo: String,
    pub created_at: DateTime<Utc>,
}

impl Trade {
    /// Notional value of the trade (amount x price).
    ///
    /// Returns `None` when either side is not a finite number.
    pub fn volume(&self) -> Option<f64> {
        if self.amount.is_finite() && self.price.is_finite() {
            Some(self.amount * self.price)
        } else {
            None
        }
    }
}

/// A note together with its trade log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteWithTrades {
    #[serde(flatten)]
    pub note: Note,
    pub trades: Vec<Trade>,
}

/// A public note as shown in the community feed.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct FeedNote {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub note: Note,
    pub author_wallet: String,
    pub trade_count: i64,
}

/// Normalize a wallet address to its lower-case `0x`-prefixed form.
///
/// Accepts any letter case; rejects anything that is not 20 hex-encoded bytes.
pub fn normalize_wallet_address(address: &str) -> Result<String, AppError> {
    let trimmed = address.trim();
    let hex = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .ok_or_else(|| AppError::Validation("Wallet address must start with 0x".to_string()))?;

    if hex.len() != 40 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(AppError::Validation(format!(
            "Invalid wallet address '{}'",
            trimmed
        )));
    }

    Ok(format!("0x{}", hex.to_ascii_lowercase()))
}
