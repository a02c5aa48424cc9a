//! Refresh token storage.
//!
//! Rows are never deleted: a redeemed token stays behind with `used = 1`
//! and logout flips `invalidated`, so replays can be told apart from
//! unknown tokens.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePool;

use crate::identity::{RefreshToken, RefreshTokenStore, StoreError};

#[derive(Clone)]
pub struct TokenStore {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct TokenRow {
    token: String,
    jwt_id: String,
    user_id: String,
    creation_date: i64,
    expiry_date: i64,
    used: bool,
    invalidated: bool,
}

impl From<TokenRow> for RefreshToken {
    fn from(row: TokenRow) -> Self {
        Self {
            token: row.token,
            jwt_id: row.jwt_id,
            user_id: row.user_id,
            creation_date: from_timestamp(row.creation_date),
            expiry_date: from_timestamp(row.expiry_date),
            used: row.used,
            invalidated: row.invalidated,
        }
    }
}

/// Out-of-range values can only come from manual edits; treat them as the epoch,
/// which makes the token expired.
fn from_timestamp(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or(DateTime::UNIX_EPOCH)
}

impl TokenStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// List all refresh tokens of a user, newest first.
    pub async fn list_by_user(&self, user_id: &str) -> Result<Vec<RefreshToken>, sqlx::Error> {
        let rows: Vec<TokenRow> = sqlx::query_as(
            "SELECT token, jwt_id, user_id, creation_date, expiry_date, used, invalidated
             FROM refresh_tokens WHERE user_id = ? ORDER BY creation_date DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(RefreshToken::from).collect())
    }
}

async fn insert<'e, E>(executor: E, token: &RefreshToken) -> Result<(), sqlx::Error>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    sqlx::query(
        "INSERT INTO refresh_tokens (token, jwt_id, user_id, creation_date, expiry_date, used, invalidated)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&token.token)
    .bind(&token.jwt_id)
    .bind(&token.user_id)
    .bind(token.creation_date.timestamp())
    .bind(token.expiry_date.timestamp())
    .bind(token.used)
    .bind(token.invalidated)
    .execute(executor)
    .await?;
    Ok(())
}

impl RefreshTokenStore for TokenStore {
    async fn add(&self, token: &RefreshToken) -> Result<(), StoreError> {
        insert(&self.pool, token).await?;
        Ok(())
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<RefreshToken>, StoreError> {
        let row: Option<TokenRow> = sqlx::query_as(
            "SELECT token, jwt_id, user_id, creation_date, expiry_date, used, invalidated
             FROM refresh_tokens WHERE token = ?",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(RefreshToken::from))
    }

    async fn update(&self, token: &RefreshToken) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE refresh_tokens
             SET jwt_id = ?, user_id = ?, creation_date = ?, expiry_date = ?, used = ?, invalidated = ?
             WHERE token = ?",
        )
        .bind(&token.jwt_id)
        .bind(&token.user_id)
        .bind(token.creation_date.timestamp())
        .bind(token.expiry_date.timestamp())
        .bind(token.used)
        .bind(token.invalidated)
        .bind(&token.token)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn rotate(&self, token: &str, replacement: &RefreshToken) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE refresh_tokens SET used = 1 WHERE token = ? AND used = 0 AND invalidated = 0",
        )
        .bind(token)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() != 1 {
            tx.rollback().await?;
            return Ok(false);
        }

        insert(&mut *tx, replacement).await?;
        tx.commit().await?;
        Ok(true)
    }

    async fn invalidate_for_user(&self, user_id: &str) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET invalidated = 1 WHERE user_id = ? AND used = 0 AND invalidated = 0",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
