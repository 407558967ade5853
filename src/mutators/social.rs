/// Social edges: subscriptions, likes and tweets.
///
/// Toggles are delete-if-present / insert-otherwise. The UNIQUE constraints
/// on the edge tables back up the precheck against concurrent toggles.
use crate::{
    db::models::{Like, LikeTarget, Tweet},
    error::{ApiError, ApiResult},
    mutators::ensure_owner,
};
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

/// Outcome of a toggle, reported back to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleState {
    Added,
    Removed,
}

impl ToggleState {
    pub fn is_active(self) -> bool {
        matches!(self, ToggleState::Added)
    }
}

pub struct SocialManager {
    db: SqlitePool,
}

impl SocialManager {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Subscribe/unsubscribe `subscriber_id` to `channel_id`
    pub async fn toggle_subscription(
        &self,
        subscriber_id: &str,
        channel_id: &str,
    ) -> ApiResult<ToggleState> {
        if subscriber_id == channel_id {
            return Err(ApiError::Validation(
                "Cannot subscribe to your own channel".to_string(),
            ));
        }

        let channel_exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE id = ?1")
            .bind(channel_id)
            .fetch_one(&self.db)
            .await
            .map_err(ApiError::Database)?;
        if channel_exists == 0 {
            return Err(ApiError::NotFound("Channel does not exist".to_string()));
        }

        let deleted = sqlx::query(
            "DELETE FROM subscriptions WHERE subscriber_id = ?1 AND channel_id = ?2",
        )
        .bind(subscriber_id)
        .bind(channel_id)
        .execute(&self.db)
        .await
        .map_err(ApiError::Database)?;

        if deleted.rows_affected() > 0 {
            return Ok(ToggleState::Removed);
        }

        sqlx::query(
            "INSERT INTO subscriptions (id, subscriber_id, channel_id, created_at) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(subscriber_id)
        .bind(channel_id)
        .bind(Utc::now())
        .execute(&self.db)
        .await
        .map_err(ApiError::Database)?;

        Ok(ToggleState::Added)
    }

    /// Toggle a like on a video, comment or tweet
    pub async fn toggle_like(&self, user_id: &str, target: &LikeTarget) -> ApiResult<ToggleState> {
        let deleted = sqlx::query(
            "DELETE FROM likes WHERE liked_by = ?1 AND target_kind = ?2 AND target_id = ?3",
        )
        .bind(user_id)
        .bind(target.kind())
        .bind(target.id())
        .execute(&self.db)
        .await
        .map_err(ApiError::Database)?;

        if deleted.rows_affected() > 0 {
            return Ok(ToggleState::Removed);
        }

        sqlx::query(
            "INSERT INTO likes (id, liked_by, target_kind, target_id, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(user_id)
        .bind(target.kind())
        .bind(target.id())
        .bind(Utc::now())
        .execute(&self.db)
        .await
        .map_err(ApiError::Database)?;

        Ok(ToggleState::Added)
    }

    /// Like edges a user has placed on videos, newest first
    pub async fn liked_videos(&self, user_id: &str) -> ApiResult<Vec<Like>> {
        sqlx::query_as::<_, Like>(
            "SELECT id, liked_by, target_kind, target_id, created_at
             FROM likes WHERE liked_by = ?1 AND target_kind = 'video'
             ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await
        .map_err(ApiError::Database)
    }

    /// Post a tweet; content must be non-empty
    pub async fn create_tweet(&self, owner_id: &str, content: &str) -> ApiResult<Tweet> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ApiError::Validation("Content is required".to_string()));
        }

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO tweets (id, owner_id, content, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?4)",
        )
        .bind(&id)
        .bind(owner_id)
        .bind(content)
        .bind(now)
        .execute(&self.db)
        .await
        .map_err(ApiError::Database)?;

        self.get_tweet(&id).await
    }

    pub async fn get_tweet(&self, tweet_id: &str) -> ApiResult<Tweet> {
        sqlx::query_as::<_, Tweet>(
            "SELECT id, owner_id, content, created_at, updated_at FROM tweets WHERE id = ?1",
        )
        .bind(tweet_id)
        .fetch_optional(&self.db)
        .await
        .map_err(ApiError::Database)?
        .ok_or_else(|| ApiError::NotFound("Tweet does not exist".to_string()))
    }

    /// Edit a tweet's content, owner only
    pub async fn update_tweet(
        &self,
        requester_id: &str,
        tweet_id: &str,
        content: &str,
    ) -> ApiResult<Tweet> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ApiError::Validation("Content is required".to_string()));
        }

        let tweet = self.get_tweet(tweet_id).await?;
        ensure_owner(&tweet.owner_id, requester_id)?;

        sqlx::query("UPDATE tweets SET content = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(content)
            .bind(Utc::now())
            .bind(&tweet.id)
            .execute(&self.db)
            .await
            .map_err(ApiError::Database)?;

        self.get_tweet(&tweet.id).await
    }

    /// Delete a tweet, owner only
    pub async fn delete_tweet(&self, requester_id: &str, tweet_id: &str) -> ApiResult<()> {
        let tweet = self.get_tweet(tweet_id).await?;
        ensure_owner(&tweet.owner_id, requester_id)?;

        sqlx::query("DELETE FROM tweets WHERE id = ?1")
            .bind(&tweet.id)
            .execute(&self.db)
            .await
            .map_err(ApiError::Database)?;

        Ok(())
    }

    /// All tweets by a user, newest first
    pub async fn user_tweets(&self, owner_id: &str) -> ApiResult<Vec<Tweet>> {
        sqlx::query_as::<_, Tweet>(
            "SELECT id, owner_id, content, created_at, updated_at
             FROM tweets WHERE owner_id = ?1 ORDER BY created_at DESC",
        )
        .bind(owner_id)
        .fetch_all(&self.db)
        .await
        .map_err(ApiError::Database)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_pool;
    use crate::mutators::video::tests::insert_user;

    async fn manager() -> (SocialManager, SqlitePool) {
        let db = memory_pool().await;
        insert_user(&db, "u1", "ana").await;
        insert_user(&db, "u2", "bo").await;
        (SocialManager::new(db.clone()), db)
    }

    #[tokio::test]
    async fn test_subscription_toggles_round_trip() {
        let (social, db) = manager().await;

        let first = social.toggle_subscription("u1", "u2").await.unwrap();
        assert_eq!(first, ToggleState::Added);

        let second = social.toggle_subscription("u1", "u2").await.unwrap();
        assert_eq!(second, ToggleState::Removed);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM subscriptions")
            .fetch_one(&db)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_self_subscription_rejected() {
        let (social, _db) = manager().await;
        assert!(matches!(
            social.toggle_subscription("u1", "u1").await.unwrap_err(),
            ApiError::Validation(_)
        ));
    }

    #[tokio::test]
    async fn test_unknown_channel_rejected() {
        let (social, _db) = manager().await;
        assert!(matches!(
            social.toggle_subscription("u1", "ghost").await.unwrap_err(),
            ApiError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_like_toggle_is_per_target() {
        let (social, db) = manager().await;

        let video = LikeTarget::Video("v1".to_string());
        let tweet = LikeTarget::Tweet("v1".to_string());

        assert!(social.toggle_like("u1", &video).await.unwrap().is_active());
        // Same id, different kind: separate edge
        assert!(social.toggle_like("u1", &tweet).await.unwrap().is_active());

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM likes")
            .fetch_one(&db)
            .await
            .unwrap();
        assert_eq!(count, 2);

        assert!(!social.toggle_like("u1", &video).await.unwrap().is_active());
    }

    #[tokio::test]
    async fn test_liked_videos_filters_kind() {
        let (social, _db) = manager().await;

        social
            .toggle_like("u1", &LikeTarget::Video("v1".to_string()))
            .await
            .unwrap();
        social
            .toggle_like("u1", &LikeTarget::Tweet("t1".to_string()))
            .await
            .unwrap();

        let liked = social.liked_videos("u1").await.unwrap();
        assert_eq!(liked.len(), 1);
        assert_eq!(liked[0].target_id, "v1");
        assert_eq!(liked[0].target_kind, "video");
    }

    #[tokio::test]
    async fn test_tweet_lifecycle() {
        let (social, _db) = manager().await;

        let tweet = social.create_tweet("u1", "  hello  ").await.unwrap();
        assert_eq!(tweet.content, "hello");

        let updated = social
            .update_tweet("u1", &tweet.id, "edited")
            .await
            .unwrap();
        assert_eq!(updated.content, "edited");

        assert!(matches!(
            social
                .update_tweet("u2", &tweet.id, "hijack")
                .await
                .unwrap_err(),
            ApiError::Authorization(_)
        ));

        social.delete_tweet("u1", &tweet.id).await.unwrap();
        assert!(matches!(
            social.get_tweet(&tweet.id).await.unwrap_err(),
            ApiError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_empty_tweet_rejected() {
        let (social, _db) = manager().await;
        assert!(matches!(
            social.create_tweet("u1", "   ").await.unwrap_err(),
            ApiError::Validation(_)
        ));
    }
}
