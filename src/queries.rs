/// Aggregation query service.
///
/// Entry points for the three pipeline-backed reads, bridging the pure
/// builders and the interpreter over whatever document source is injected.
use crate::{
    error::{ApiError, ApiResult},
    pipeline::{
        builders,
        executor::{self, DocumentSource},
        Collection, Page, PageRequest,
    },
};
use serde_json::Value;
use std::sync::Arc;

pub struct QueryService {
    source: Arc<dyn DocumentSource>,
}

impl QueryService {
    pub fn new(source: Arc<dyn DocumentSource>) -> Self {
        Self { source }
    }

    /// Channel profile for a username as seen by an optional viewer
    pub async fn channel_profile(
        &self,
        username: &str,
        viewer_id: Option<&str>,
    ) -> ApiResult<Value> {
        if username.trim().is_empty() {
            return Err(ApiError::Validation("Username missing".to_string()));
        }

        let stages = builders::channel_profile(username, viewer_id);
        let mut docs = executor::aggregate(self.source.as_ref(), Collection::Users, &stages).await?;

        docs.pop()
            .ok_or_else(|| ApiError::NotFound("Channel does not exist".to_string()))
    }

    /// Ordered watch history for a user; empty history is an empty sequence
    pub async fn watch_history(&self, user_id: &str) -> ApiResult<Vec<Value>> {
        let stages = builders::watch_history(user_id);
        let mut docs = executor::aggregate(self.source.as_ref(), Collection::Users, &stages).await?;

        let user = docs
            .pop()
            .ok_or_else(|| ApiError::NotFound("User does not exist".to_string()))?;

        match user.get("watchHistory") {
            Some(Value::Array(videos)) => Ok(videos.clone()),
            _ => Ok(Vec::new()),
        }
    }

    /// Paged video listing with optional search, owner filter and sort
    pub async fn list_videos(
        &self,
        search: Option<&str>,
        owner_id: Option<&str>,
        sort_by: Option<&str>,
        sort_type: Option<&str>,
        page: PageRequest,
    ) -> ApiResult<Page<Value>> {
        let stages = builders::video_listing(search, owner_id, sort_by, sort_type)?;
        executor::aggregate_paginate(self.source.as_ref(), Collection::Videos, &stages, &page).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;

    struct OneUserSource;

    #[async_trait]
    impl DocumentSource for OneUserSource {
        async fn scan(&self, collection: Collection) -> ApiResult<Vec<Value>> {
            Ok(match collection {
                Collection::Users => vec![json!({
                    "id": "u1", "username": "ana", "email": "a@x.com", "fullName": "Ana",
                    "avatar": "http://cdn/a.png", "coverImage": null, "watchHistory": [],
                })],
                _ => Vec::new(),
            })
        }
    }

    #[tokio::test]
    async fn test_unknown_channel_is_not_found() {
        let service = QueryService::new(Arc::new(OneUserSource));
        let err = service.channel_profile("nobody", None).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_blank_username_is_rejected() {
        let service = QueryService::new(Arc::new(OneUserSource));
        let err = service.channel_profile("   ", None).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn test_channel_profile_found() {
        let service = QueryService::new(Arc::new(OneUserSource));
        let channel = service.channel_profile("ANA", None).await.unwrap();
        assert_eq!(channel["username"], "ana");
        assert_eq!(channel["subscribersCount"], 0);
        assert_eq!(channel["isSubscribed"], false);
    }

    #[tokio::test]
    async fn test_empty_watch_history_is_empty() {
        let service = QueryService::new(Arc::new(OneUserSource));
        let history = service.watch_history("u1").await.unwrap();
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn test_listing_rejects_bad_page() {
        assert!(PageRequest::new(0, 10).is_err());
        let service = QueryService::new(Arc::new(OneUserSource));
        let err = service
            .list_videos(None, None, Some("title"), Some("up"), PageRequest::new(1, 10).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }
}
