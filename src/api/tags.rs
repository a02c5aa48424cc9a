//! Tag API endpoints.
//!
//! - GET `/` - List all tags (requires the `tags.view` claim)

use axum::{Json, Router, extract::State, response::IntoResponse, routing::get};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use super::error::{ApiError, ResultExt};
use crate::auth::{Authorized, HasAuthBackend, TagViewer};
use crate::db::{Database, Tag};
use crate::jwt::JwtConfig;

#[derive(Clone)]
pub struct TagsState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
}

impl HasAuthBackend for TagsState {
    fn jwt(&self) -> &JwtConfig {
        &self.jwt
    }
}

pub fn router(state: TagsState) -> Router {
    Router::new().route("/", get(list_tags)).with_state(state)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TagResponse {
    name: String,
    created_at: DateTime<Utc>,
}

impl From<Tag> for TagResponse {
    fn from(tag: Tag) -> Self {
        Self {
            name: tag.name,
            created_at: tag.created_at,
        }
    }
}

async fn list_tags(
    State(state): State<TagsState>,
    Authorized { user, .. }: Authorized<TagViewer>,
) -> Result<impl IntoResponse, ApiError> {
    let tags = state.db.tags().list().await.db_err("Failed to list tags")?;
    debug!(user_id = %user.user_id(), count = tags.len(), "Listed tags");

    Ok(Json(
        tags.into_iter()
            .map(TagResponse::from)
            .collect::<Vec<_>>(),
    ))
}
