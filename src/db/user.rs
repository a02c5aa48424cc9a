//! User accounts and their claims.

use sqlx::sqlite::SqlitePool;
use tracing::warn;

use crate::claims::{ClaimKind, UserClaim};
use crate::identity::{CredentialStore, StoreError, User};
use crate::password;

#[derive(Clone)]
pub struct UserStore {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: String,
    email: String,
    password_hash: String,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            password_hash: row.password_hash,
        }
    }
}

impl UserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Number of registered users with this email (case-insensitive).
    pub async fn count_by_email(&self, email: &str) -> Result<i64, sqlx::Error> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE email = ?")
            .bind(email)
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0)
    }
}

impl CredentialStore for UserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let row: Option<UserRow> =
            sqlx::query_as("SELECT id, email, password_hash FROM users WHERE email = ?")
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(User::from))
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, StoreError> {
        let row: Option<UserRow> =
            sqlx::query_as("SELECT id, email, password_hash FROM users WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(User::from))
    }

    async fn create_user(
        &self,
        email: &str,
        password: &str,
        claims: &[UserClaim],
    ) -> Result<Option<User>, StoreError> {
        let plain = password.to_string();
        let password_hash = tokio::task::spawn_blocking(move || password::hash_password(&plain))
            .await
            .map_err(|e| StoreError::Hashing(e.to_string()))?
            .map_err(StoreError::Hashing)?;

        let id = uuid::Uuid::new_v4().to_string();

        // Dropping the transaction on any early return rolls it back
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("INSERT INTO users (id, email, password_hash) VALUES (?, ?, ?)")
            .bind(&id)
            .bind(email)
            .bind(&password_hash)
            .execute(&mut *tx)
            .await;

        match result {
            Ok(_) => {}
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => return Ok(None),
            Err(e) => return Err(e.into()),
        }

        for claim in claims {
            sqlx::query("INSERT INTO user_claims (user_id, claim_type, claim_value) VALUES (?, ?, ?)")
                .bind(&id)
                .bind(claim.kind.as_str())
                .bind(&claim.value)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        Ok(Some(User {
            id,
            email: email.to_string(),
            password_hash,
        }))
    }

    async fn check_password(&self, user: &User, password: &str) -> Result<bool, StoreError> {
        let plain = password.to_string();
        let hash = user.password_hash.clone();

        let verified =
            tokio::task::spawn_blocking(move || password::verify_password(&plain, &hash))
                .await
                .map_err(|e| StoreError::Hashing(e.to_string()))?;

        match verified {
            Ok(valid) => Ok(valid),
            Err(e) => {
                // A corrupt hash can never match
                warn!(user_id = %user.id, error = %e, "Stored password hash is malformed");
                Ok(false)
            }
        }
    }

    async fn get_claims(&self, user_id: &str) -> Result<Vec<UserClaim>, StoreError> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            "SELECT claim_type, claim_value FROM user_claims WHERE user_id = ? ORDER BY claim_type",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(claim_type, value)| match ClaimKind::parse(&claim_type) {
                Some(kind) => Some(UserClaim::new(kind, value)),
                None => {
                    warn!(user_id = %user_id, claim_type = %claim_type, "Ignoring unknown claim");
                    None
                }
            })
            .collect())
    }

    async fn add_claim(&self, user_id: &str, claim: &UserClaim) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO user_claims (user_id, claim_type, claim_value) VALUES (?, ?, ?)
             ON CONFLICT(user_id, claim_type) DO UPDATE SET claim_value = excluded.claim_value",
        )
        .bind(user_id)
        .bind(claim.kind.as_str())
        .bind(&claim.value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
