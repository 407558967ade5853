/// Social API endpoints: subscriptions, likes and tweets
use crate::{
    auth::CurrentUser,
    context::AppContext,
    db::models::{Like, LikeTarget, Tweet},
    error::{ApiError, ApiResult},
    response::ApiResponse,
};
use axum::{
    extract::{Path, State},
    routing::{get, patch, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route(
            "/api/v1/subscriptions/toggle/:channelId",
            post(toggle_subscription),
        )
        .route("/api/v1/likes/toggle", post(toggle_like))
        .route("/api/v1/likes/videos", get(liked_videos))
        .route("/api/v1/tweets", post(create_tweet))
        .route("/api/v1/tweets/user/:userId", get(user_tweets))
        .route("/api/v1/tweets/:id", patch(update_tweet).delete(delete_tweet))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleResponse {
    pub active: bool,
}

async fn toggle_subscription(
    State(ctx): State<AppContext>,
    current: CurrentUser,
    Path(channel_id): Path<String>,
) -> ApiResult<ApiResponse<ToggleResponse>> {
    let state = ctx
        .social
        .toggle_subscription(current.id(), &channel_id)
        .await?;

    Ok(ApiResponse::ok(
        ToggleResponse {
            active: state.is_active(),
        },
        "Subscription toggled",
    ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleLikeRequest {
    /// One of "video", "comment", "tweet"
    pub target_type: String,
    pub target_id: String,
}

async fn toggle_like(
    State(ctx): State<AppContext>,
    current: CurrentUser,
    Json(req): Json<ToggleLikeRequest>,
) -> ApiResult<ApiResponse<ToggleResponse>> {
    let target = match req.target_type.as_str() {
        "video" => LikeTarget::Video(req.target_id),
        "comment" => LikeTarget::Comment(req.target_id),
        "tweet" => LikeTarget::Tweet(req.target_id),
        other => {
            return Err(ApiError::Validation(format!(
                "Unknown like target: {}",
                other
            )))
        }
    };

    let state = ctx.social.toggle_like(current.id(), &target).await?;

    Ok(ApiResponse::ok(
        ToggleResponse {
            active: state.is_active(),
        },
        "Like toggled",
    ))
}

async fn liked_videos(
    State(ctx): State<AppContext>,
    current: CurrentUser,
) -> ApiResult<ApiResponse<Vec<Like>>> {
    let liked = ctx.social.liked_videos(current.id()).await?;

    Ok(ApiResponse::ok(liked, "Liked videos fetched successfully"))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TweetRequest {
    pub content: String,
}

async fn create_tweet(
    State(ctx): State<AppContext>,
    current: CurrentUser,
    Json(req): Json<TweetRequest>,
) -> ApiResult<ApiResponse<Tweet>> {
    let tweet = ctx.social.create_tweet(current.id(), &req.content).await?;

    Ok(ApiResponse::created(tweet, "Tweet created successfully"))
}

async fn user_tweets(
    State(ctx): State<AppContext>,
    Path(user_id): Path<String>,
) -> ApiResult<ApiResponse<Vec<Tweet>>> {
    let tweets = ctx.social.user_tweets(&user_id).await?;

    Ok(ApiResponse::ok(tweets, "Tweets fetched successfully"))
}

async fn update_tweet(
    State(ctx): State<AppContext>,
    current: CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<TweetRequest>,
) -> ApiResult<ApiResponse<Tweet>> {
    let tweet = ctx
        .social
        .update_tweet(current.id(), &id, &req.content)
        .await?;

    Ok(ApiResponse::ok(tweet, "Tweet updated successfully"))
}

async fn delete_tweet(
    State(ctx): State<AppContext>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<Value>> {
    ctx.social.delete_tweet(current.id(), &id).await?;

    Ok(ApiResponse::ok(Value::Null, "Tweet deleted successfully"))
}
