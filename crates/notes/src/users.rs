//! User service: wallet-keyed accounts.

use sqlx::PgPool;
use uuid::Uuid;

use cin_common::error::AppError;
use cin_common::types::{User, normalize_wallet_address};

/// Service layer for user lookups and registration.
pub struct UserService;

impl UserService {
    /// Look a user up by wallet address, creating the account on first sight.
    ///
    /// Returns the user and whether it was newly created.
    pub async fn find_or_create(pool: &PgPool, wallet_address: &str) -> Result<(User, bool), AppError> {
        let wallet = normalize_wallet_address(wallet_address)?;

        if let Some(user) = Self::find_by_wallet(pool, &wallet).await? {
            tracing::debug!(user_id = %user.id, wallet = %wallet, "Existing user logged in");
            return Ok((user, false));
        }

        let user = Self::upsert(pool, &wallet).await?;
        tracing::info!(user_id = %user.id, wallet = %wallet, "New user signed up");
        Ok((user, true))
    }

    /// Insert the user if missing, otherwise touch `updated_at`.
    pub async fn upsert(pool: &PgPool, wallet_address: &str) -> Result<User, AppError> {
        let wallet = normalize_wallet_address(wallet_address)?;

        let user: User = sqlx::query_as(
            r#"
            INSERT INTO users (wallet_address)
            VALUES ($1)
            ON CONFLICT (wallet_address) DO UPDATE SET updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(&wallet)
        .fetch_one(pool)
        .await?;

        Ok(user)
    }

    pub async fn find_by_wallet(pool: &PgPool, wallet_address: &str) -> Result<Option<User>, AppError> {
        let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE wallet_address = $1")
            .bind(wallet_address)
            .fetch_optional(pool)
            .await?;

        Ok(user)
    }

    pub async fn get(pool: &PgPool, user_id: Uuid) -> Result<User, AppError> {
        sqlx::query_as("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))
    }

    /// Resolve an API key to its owner.
    pub async fn find_by_api_key(pool: &PgPool, api_key: &str) -> Result<Option<Uuid>, AppError> {
        let row: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE api_key = $1")
            .bind(api_key)
            .fetch_optional(pool)
            .await?;

        Ok(row.map(|(id,)| id))
    }

    /// Store a freshly generated API key, replacing any previous one.
    pub async fn set_api_key(pool: &PgPool, user_id: Uuid, api_key: &str) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE users SET api_key = $1, updated_at = NOW() WHERE id = $2")
            .bind(api_key)
            .bind(user_id)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User {} not found", user_id)));
        }

        tracing::info!(user_id = %user_id, "API key generated");
        Ok(())
    }
}
