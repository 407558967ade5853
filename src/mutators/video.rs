/// Video publishing and mutation
use crate::{
    db::models::Video,
    error::{ApiError, ApiResult},
    media::{self, MediaStore},
    mutators::{ensure_owner, OwnerSummary},
};
use chrono::Utc;
use serde::Serialize;
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

const VIDEO_COLUMNS: &str = "id, title, description, owner_id, video_file, thumbnail, duration, \
     is_published, views, created_at, updated_at";

/// A video with its owner joined as a public object
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoDetail {
    #[serde(flatten)]
    pub video: Video,
    pub owner: OwnerSummary,
}

/// Optional fields of a video update
#[derive(Debug, Default)]
pub struct VideoUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub thumbnail_path: Option<PathBuf>,
    pub video_path: Option<PathBuf>,
}

impl VideoUpdate {
    fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.thumbnail_path.is_none()
            && self.video_path.is_none()
    }
}

pub struct VideoManager {
    db: SqlitePool,
    media: Arc<dyn MediaStore>,
}

impl VideoManager {
    pub fn new(db: SqlitePool, media: Arc<dyn MediaStore>) -> Self {
        Self { db, media }
    }

    /// Publish a new video: upload both assets, then create the record.
    /// Duration comes from the uploaded video asset.
    pub async fn publish(
        &self,
        owner_id: &str,
        title: &str,
        description: &str,
        video_path: &Path,
        thumbnail_path: &Path,
    ) -> ApiResult<Video> {
        let title = title.trim();
        let description = description.trim();
        if title.is_empty() || description.is_empty() {
            return Err(ApiError::Validation("All fields are required".to_string()));
        }
        if video_path == thumbnail_path {
            return Err(ApiError::Validation(
                "Video and thumbnail must be different files".to_string(),
            ));
        }

        let video_asset = self.media.upload(video_path).await?;
        let thumbnail_asset = self.media.upload(thumbnail_path).await?;

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO videos (id, title, description, owner_id, video_file, thumbnail, duration, is_published, views, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, TRUE, 0, ?8, ?8)",
        )
        .bind(&id)
        .bind(title)
        .bind(description)
        .bind(owner_id)
        .bind(&video_asset.url)
        .bind(&thumbnail_asset.url)
        .bind(video_asset.duration_seconds)
        .bind(now)
        .execute(&self.db)
        .await
        .map_err(ApiError::Database)?;

        self.get(&id).await
    }

    /// Fetch a video by id
    pub async fn get(&self, video_id: &str) -> ApiResult<Video> {
        sqlx::query_as::<_, Video>(&format!("SELECT {VIDEO_COLUMNS} FROM videos WHERE id = ?1"))
            .bind(video_id.trim())
            .fetch_optional(&self.db)
            .await
            .map_err(ApiError::Database)?
            .ok_or_else(|| ApiError::NotFound("Video does not exist".to_string()))
    }

    /// Fetch a video with its owner joined
    pub async fn get_detail(&self, video_id: &str) -> ApiResult<VideoDetail> {
        let video = self.get(video_id).await?;
        let owner = sqlx::query_as::<_, OwnerSummary>(
            "SELECT id, full_name, username, avatar FROM users WHERE id = ?1",
        )
        .bind(&video.owner_id)
        .fetch_optional(&self.db)
        .await
        .map_err(ApiError::Database)?
        .ok_or_else(|| ApiError::NotFound("User does not exist".to_string()))?;

        Ok(VideoDetail { video, owner })
    }

    /// Update title/description/assets. Replaced assets have their old blobs
    /// removed before the new upload; no rollback on partial failure.
    pub async fn update(
        &self,
        requester_id: &str,
        video_id: &str,
        update: VideoUpdate,
    ) -> ApiResult<Video> {
        let video = self.get(video_id).await?;
        ensure_owner(&video.owner_id, requester_id)?;

        if update.is_empty() {
            return Err(ApiError::Validation("Nothing to update".to_string()));
        }

        let mut title = video.title.clone();
        if let Some(new_title) = update.title {
            let new_title = new_title.trim().to_string();
            if new_title.is_empty() {
                return Err(ApiError::Validation("Title cannot be empty".to_string()));
            }
            title = new_title;
        }
        let mut description = video.description.clone();
        if let Some(new_description) = update.description {
            let new_description = new_description.trim().to_string();
            if new_description.is_empty() {
                return Err(ApiError::Validation(
                    "Description cannot be empty".to_string(),
                ));
            }
            description = new_description;
        }

        let mut thumbnail = video.thumbnail.clone();
        if let Some(path) = update.thumbnail_path {
            let asset = media::replace(self.media.as_ref(), Some(&video.thumbnail), &path).await?;
            thumbnail = asset.url;
        }
        let mut video_file = video.video_file.clone();
        let mut duration = video.duration;
        if let Some(path) = update.video_path {
            let asset = media::replace(self.media.as_ref(), Some(&video.video_file), &path).await?;
            video_file = asset.url;
            duration = asset.duration_seconds;
        }

        sqlx::query(
            "UPDATE videos SET title = ?1, description = ?2, thumbnail = ?3, video_file = ?4, duration = ?5, updated_at = ?6
             WHERE id = ?7 AND owner_id = ?8",
        )
        .bind(&title)
        .bind(&description)
        .bind(&thumbnail)
        .bind(&video_file)
        .bind(duration)
        .bind(Utc::now())
        .bind(&video.id)
        .bind(requester_id)
        .execute(&self.db)
        .await
        .map_err(ApiError::Database)?;

        self.get(&video.id).await
    }

    /// Delete a video and its stored media.
    ///
    /// Record first, then blobs; a blob-store failure after the record delete
    /// leaves orphaned blobs (no rollback in scope).
    pub async fn delete(&self, requester_id: &str, video_id: &str) -> ApiResult<Video> {
        let video = self.get(video_id).await?;
        ensure_owner(&video.owner_id, requester_id)?;

        sqlx::query("DELETE FROM videos WHERE id = ?1")
            .bind(&video.id)
            .execute(&self.db)
            .await
            .map_err(ApiError::Database)?;

        self.media.remove(&video.thumbnail).await?;
        self.media.remove(&video.video_file).await?;

        Ok(video)
    }

    /// Count a view. The increment happens in the store, so concurrent
    /// views never lose updates.
    pub async fn record_view(&self, video_id: &str) -> ApiResult<()> {
        sqlx::query("UPDATE videos SET views = views + 1 WHERE id = ?1")
            .bind(video_id)
            .execute(&self.db)
            .await
            .map_err(ApiError::Database)?;

        Ok(())
    }

    /// Flip the publish flag. The negation happens in the store, so
    /// concurrent toggles never read a stale value.
    pub async fn toggle_publish(&self, requester_id: &str, video_id: &str) -> ApiResult<Video> {
        let video = self.get(video_id).await?;
        ensure_owner(&video.owner_id, requester_id)?;

        sqlx::query(
            "UPDATE videos SET is_published = NOT is_published, updated_at = ?1
             WHERE id = ?2 AND owner_id = ?3",
        )
        .bind(Utc::now())
        .bind(&video.id)
        .bind(requester_id)
        .execute(&self.db)
        .await
        .map_err(ApiError::Database)?;

        self.get(&video.id).await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::db::memory_pool;
    use crate::media::UploadedAsset;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Media store double that mints fake URLs and records removals
    pub(crate) struct FakeMedia {
        counter: AtomicU32,
        pub removed: Mutex<Vec<String>>,
    }

    impl FakeMedia {
        pub fn new() -> Self {
            Self {
                counter: AtomicU32::new(0),
                removed: Mutex::new(Vec::new()),
            }
        }

        pub fn uploads(&self) -> u32 {
            self.counter.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl MediaStore for FakeMedia {
        async fn upload(&self, local_path: &Path) -> ApiResult<UploadedAsset> {
            let n = self.counter.fetch_add(1, Ordering::SeqCst);
            Ok(UploadedAsset {
                url: format!("http://cdn.test/{}-{}", n, local_path.display()),
                duration_seconds: 42.0,
            })
        }

        async fn remove(&self, url: &str) -> ApiResult<()> {
            self.removed.lock().unwrap().push(url.to_string());
            Ok(())
        }
    }

    pub(crate) async fn insert_user(db: &SqlitePool, id: &str, username: &str) {
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO users (id, username, email, full_name, avatar, password_hash, watch_history, created_at, updated_at)
             VALUES (?1, ?2, ?3, 'Test', 'http://cdn/a.png', 'hash', '[]', ?4, ?4)",
        )
        .bind(id)
        .bind(username)
        .bind(format!("{}@x.com", username))
        .bind(now)
        .execute(db)
        .await
        .unwrap();
    }

    async fn manager() -> (VideoManager, Arc<FakeMedia>, SqlitePool) {
        let db = memory_pool().await;
        insert_user(&db, "u1", "ana").await;
        insert_user(&db, "u2", "bo").await;
        let media = Arc::new(FakeMedia::new());
        (
            VideoManager::new(db.clone(), media.clone()),
            media,
            db,
        )
    }

    #[tokio::test]
    async fn test_publish_requires_fields_and_distinct_paths() {
        let (videos, _media, _db) = manager().await;

        let err = videos
            .publish("u1", "  ", "desc", Path::new("a.mp4"), Path::new("b.png"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        let err = videos
            .publish("u1", "t", "d", Path::new("same.mp4"), Path::new("same.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn test_publish_takes_duration_from_upload() {
        let (videos, _media, _db) = manager().await;
        let video = videos
            .publish("u1", "Title", "Desc", Path::new("clip.mp4"), Path::new("thumb.png"))
            .await
            .unwrap();

        assert_eq!(video.duration, 42.0);
        assert!(video.is_published);
        assert!(video.video_file.starts_with("http://cdn.test/"));

        let detail = videos.get_detail(&video.id).await.unwrap();
        assert_eq!(detail.owner.username, "ana");
    }

    #[tokio::test]
    async fn test_only_owner_can_mutate() {
        let (videos, _media, _db) = manager().await;
        let video = videos
            .publish("u1", "Title", "Desc", Path::new("clip.mp4"), Path::new("thumb.png"))
            .await
            .unwrap();

        let update = VideoUpdate {
            title: Some("New".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            videos.update("u2", &video.id, update).await.unwrap_err(),
            ApiError::Authorization(_)
        ));
        assert!(matches!(
            videos.delete("u2", &video.id).await.unwrap_err(),
            ApiError::Authorization(_)
        ));
        assert!(matches!(
            videos.toggle_publish("u2", &video.id).await.unwrap_err(),
            ApiError::Authorization(_)
        ));
    }

    #[tokio::test]
    async fn test_toggle_publish_flips() {
        let (videos, _media, _db) = manager().await;
        let video = videos
            .publish("u1", "Title", "Desc", Path::new("clip.mp4"), Path::new("thumb.png"))
            .await
            .unwrap();
        assert!(video.is_published);

        let video = videos.toggle_publish("u1", &video.id).await.unwrap();
        assert!(!video.is_published);
        let video = videos.toggle_publish("u1", &video.id).await.unwrap();
        assert!(video.is_published);
    }

    #[tokio::test]
    async fn test_update_replaces_thumbnail_blob() {
        let (videos, media, _db) = manager().await;
        let video = videos
            .publish("u1", "Title", "Desc", Path::new("clip.mp4"), Path::new("thumb.png"))
            .await
            .unwrap();

        let update = VideoUpdate {
            thumbnail_path: Some(PathBuf::from("thumb2.png")),
            ..Default::default()
        };
        let updated = videos.update("u1", &video.id, update).await.unwrap();

        assert_ne!(updated.thumbnail, video.thumbnail);
        // Old thumbnail removed before the new upload
        assert_eq!(*media.removed.lock().unwrap(), vec![video.thumbnail.clone()]);

        // Empty update set is rejected
        assert!(matches!(
            videos
                .update("u1", &video.id, VideoUpdate::default())
                .await
                .unwrap_err(),
            ApiError::Validation(_)
        ));
    }

    #[tokio::test]
    async fn test_record_view_increments() {
        let (videos, _media, _db) = manager().await;
        let video = videos
            .publish("u1", "Title", "Desc", Path::new("clip.mp4"), Path::new("thumb.png"))
            .await
            .unwrap();
        assert_eq!(video.views, 0);

        videos.record_view(&video.id).await.unwrap();
        videos.record_view(&video.id).await.unwrap();
        assert_eq!(videos.get(&video.id).await.unwrap().views, 2);
    }

    #[tokio::test]
    async fn test_delete_removes_record_then_blobs() {
        let (videos, media, _db) = manager().await;
        let video = videos
            .publish("u1", "Title", "Desc", Path::new("clip.mp4"), Path::new("thumb.png"))
            .await
            .unwrap();

        videos.delete("u1", &video.id).await.unwrap();

        assert!(matches!(
            videos.get(&video.id).await.unwrap_err(),
            ApiError::NotFound(_)
        ));
        let removed = media.removed.lock().unwrap();
        assert!(removed.contains(&video.thumbnail));
        assert!(removed.contains(&video.video_file));
    }
}
