/// Playlist CRUD with set-semantics membership
use crate::{
    db::models::Playlist,
    error::{ApiError, ApiResult},
    mutators::{ensure_owner, OwnerSummary},
};
use chrono::Utc;
use serde::Serialize;
use sqlx::SqlitePool;
use uuid::Uuid;

/// A playlist with its owner joined as a public object
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistDetail {
    #[serde(flatten)]
    pub playlist: Playlist,
    pub owner: OwnerSummary,
}

pub struct PlaylistManager {
    db: SqlitePool,
}

impl PlaylistManager {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Create a playlist; name and description must be non-empty
    pub async fn create(
        &self,
        owner_id: &str,
        name: &str,
        description: &str,
    ) -> ApiResult<Playlist> {
        let name = name.trim();
        let description = description.trim();
        if name.is_empty() || description.is_empty() {
            return Err(ApiError::Validation("All fields are required".to_string()));
        }

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO playlists (id, name, description, owner_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
        )
        .bind(&id)
        .bind(name)
        .bind(description)
        .bind(owner_id)
        .bind(now)
        .execute(&self.db)
        .await
        .map_err(ApiError::Database)?;

        self.get(&id).await
    }

    /// Fetch a playlist with its membership populated
    pub async fn get(&self, playlist_id: &str) -> ApiResult<Playlist> {
        let mut playlist = sqlx::query_as::<_, Playlist>(
            "SELECT id, name, description, owner_id, created_at, updated_at
             FROM playlists WHERE id = ?1",
        )
        .bind(playlist_id.trim())
        .fetch_optional(&self.db)
        .await
        .map_err(ApiError::Database)?
        .ok_or_else(|| ApiError::NotFound("Playlist does not exist".to_string()))?;

        playlist.videos = sqlx::query_scalar(
            "SELECT video_id FROM playlist_videos WHERE playlist_id = ?1 ORDER BY added_at, video_id",
        )
        .bind(&playlist.id)
        .fetch_all(&self.db)
        .await
        .map_err(ApiError::Database)?;

        Ok(playlist)
    }

    /// Fetch a playlist with its owner joined
    pub async fn get_detail(&self, playlist_id: &str) -> ApiResult<PlaylistDetail> {
        let playlist = self.get(playlist_id).await?;
        let owner = sqlx::query_as::<_, OwnerSummary>(
            "SELECT id, full_name, username, avatar FROM users WHERE id = ?1",
        )
        .bind(&playlist.owner_id)
        .fetch_optional(&self.db)
        .await
        .map_err(ApiError::Database)?
        .ok_or_else(|| ApiError::NotFound("User does not exist".to_string()))?;

        Ok(PlaylistDetail { playlist, owner })
    }

    /// Rename/redescribe a playlist
    pub async fn update(
        &self,
        requester_id: &str,
        playlist_id: &str,
        name: Option<&str>,
        description: Option<&str>,
    ) -> ApiResult<Playlist> {
        let playlist = self.get(playlist_id).await?;
        ensure_owner(&playlist.owner_id, requester_id)?;

        let name = match name.map(str::trim) {
            Some("") => return Err(ApiError::Validation("Name cannot be empty".to_string())),
            Some(n) => n.to_string(),
            None => playlist.name.clone(),
        };
        let description = match description.map(str::trim) {
            Some(d) => d.to_string(),
            None => playlist.description.clone(),
        };

        sqlx::query(
            "UPDATE playlists SET name = ?1, description = ?2, updated_at = ?3 WHERE id = ?4",
        )
        .bind(&name)
        .bind(&description)
        .bind(Utc::now())
        .bind(&playlist.id)
        .execute(&self.db)
        .await
        .map_err(ApiError::Database)?;

        self.get(&playlist.id).await
    }

    /// Delete a playlist and its membership rows
    pub async fn delete(&self, requester_id: &str, playlist_id: &str) -> ApiResult<()> {
        let playlist = self.get(playlist_id).await?;
        ensure_owner(&playlist.owner_id, requester_id)?;

        sqlx::query("DELETE FROM playlist_videos WHERE playlist_id = ?1")
            .bind(&playlist.id)
            .execute(&self.db)
            .await
            .map_err(ApiError::Database)?;
        sqlx::query("DELETE FROM playlists WHERE id = ?1")
            .bind(&playlist.id)
            .execute(&self.db)
            .await
            .map_err(ApiError::Database)?;

        Ok(())
    }

    /// Add a video to a playlist. Set semantics: adding an existing member
    /// is a no-op, handled by the store's conflict clause.
    pub async fn add_video(
        &self,
        requester_id: &str,
        playlist_id: &str,
        video_id: &str,
    ) -> ApiResult<Playlist> {
        let playlist = self.get(playlist_id).await?;
        ensure_owner(&playlist.owner_id, requester_id)?;

        let exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM videos WHERE id = ?1")
            .bind(video_id)
            .fetch_one(&self.db)
            .await
            .map_err(ApiError::Database)?;
        if exists == 0 {
            return Err(ApiError::NotFound("Video does not exist".to_string()));
        }

        sqlx::query(
            "INSERT OR IGNORE INTO playlist_videos (playlist_id, video_id, added_at) VALUES (?1, ?2, ?3)",
        )
        .bind(&playlist.id)
        .bind(video_id)
        .bind(Utc::now())
        .execute(&self.db)
        .await
        .map_err(ApiError::Database)?;

        self.get(&playlist.id).await
    }

    /// Remove a video from a playlist; removing a non-member is a no-op
    pub async fn remove_video(
        &self,
        requester_id: &str,
        playlist_id: &str,
        video_id: &str,
    ) -> ApiResult<Playlist> {
        let playlist = self.get(playlist_id).await?;
        ensure_owner(&playlist.owner_id, requester_id)?;

        sqlx::query("DELETE FROM playlist_videos WHERE playlist_id = ?1 AND video_id = ?2")
            .bind(&playlist.id)
            .bind(video_id)
            .execute(&self.db)
            .await
            .map_err(ApiError::Database)?;

        self.get(&playlist.id).await
    }
}
