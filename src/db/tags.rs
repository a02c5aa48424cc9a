use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePool;

/// A tag as listed by the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct TagStore {
    pool: SqlitePool,
}

impl TagStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// List all tags, alphabetically.
    pub async fn list(&self) -> Result<Vec<Tag>, sqlx::Error> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT name, created_at FROM tags ORDER BY name COLLATE NOCASE")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows
            .into_iter()
            .map(|(name, created_at)| Tag {
                name,
                created_at: DateTime::from_timestamp(created_at, 0).unwrap_or(DateTime::UNIX_EPOCH),
            })
            .collect())
    }

    /// Create a tag. Returns false if a tag with that name already exists.
    ///
    /// Called for `--tag` at startup; posts are the other writer of tags and
    /// live outside this service.
    pub async fn create(&self, name: &str, creator_id: Option<&str>) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO tags (name, creator_id, created_at) VALUES (?, ?, ?)
             ON CONFLICT(name) DO NOTHING",
        )
        .bind(name)
        .bind(creator_id)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
