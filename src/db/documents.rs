/// SQLite-backed document source for the pipeline interpreter.
///
/// Rows are serialised through their camelCase model form, so pipeline
/// documents look exactly like API output (credentials already stripped).
use crate::{
    db::models::{Subscription, User, Video},
    error::{ApiError, ApiResult},
    pipeline::{executor::DocumentSource, Collection},
};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use sqlx::SqlitePool;

pub struct SqliteDocuments {
    db: SqlitePool,
}

impl SqliteDocuments {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}

fn to_documents<T: Serialize>(rows: Vec<T>) -> ApiResult<Vec<Value>> {
    rows.into_iter()
        .map(|row| {
            serde_json::to_value(row)
                .map_err(|e| ApiError::Internal(format!("Failed to encode document: {}", e)))
        })
        .collect()
}

#[async_trait]
impl DocumentSource for SqliteDocuments {
    async fn scan(&self, collection: Collection) -> ApiResult<Vec<Value>> {
        match collection {
            Collection::Users => {
                let rows = sqlx::query_as::<_, User>(
                    "SELECT id, username, email, full_name, avatar, cover_image, password_hash,
                            refresh_token, watch_history, created_at, updated_at
                     FROM users",
                )
                .fetch_all(&self.db)
                .await
                .map_err(ApiError::Database)?;
                to_documents(rows)
            }
            Collection::Videos => {
                let rows = sqlx::query_as::<_, Video>(
                    "SELECT id, title, description, owner_id, video_file, thumbnail, duration,
                            is_published, views, created_at, updated_at
                     FROM videos",
                )
                .fetch_all(&self.db)
                .await
                .map_err(ApiError::Database)?;
                to_documents(rows)
            }
            Collection::Subscriptions => {
                let rows = sqlx::query_as::<_, Subscription>(
                    "SELECT id, subscriber_id, channel_id, created_at FROM subscriptions",
                )
                .fetch_all(&self.db)
                .await
                .map_err(ApiError::Database)?;
                to_documents(rows)
            }
        }
    }
}
