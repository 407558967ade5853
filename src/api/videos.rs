/// Video API endpoints
use crate::{
    auth::{CurrentUser, OptionalUser},
    context::AppContext,
    db::models::Video,
    error::ApiResult,
    mutators::video::{VideoDetail, VideoUpdate},
    pipeline::{Page, PageRequest},
    response::ApiResponse,
};
use axum::{
    extract::{Path, Query, State},
    routing::{get, patch},
    Json, Router,
};
use serde::Deserialize;
use serde_json::Value;
use std::path::PathBuf;

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/v1/videos", get(list_videos).post(publish_video))
        .route(
            "/api/v1/videos/:id",
            get(get_video).patch(update_video).delete(delete_video),
        )
        .route("/api/v1/videos/toggle/publish/:id", patch(toggle_publish))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    /// Free-text search over title and description
    pub query: Option<String>,
    pub sort_by: Option<String>,
    pub sort_type: Option<String>,
    pub user_id: Option<String>,
}

async fn list_videos(
    State(ctx): State<AppContext>,
    Query(params): Query<ListingParams>,
) -> ApiResult<ApiResponse<Page<Value>>> {
    let page = PageRequest::parse(params.page.as_deref(), params.limit.as_deref())?;

    let videos = ctx
        .queries
        .list_videos(
            params.query.as_deref(),
            params.user_id.as_deref(),
            params.sort_by.as_deref(),
            params.sort_type.as_deref(),
            page,
        )
        .await?;

    Ok(ApiResponse::ok(videos, "Videos fetched successfully"))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishRequest {
    pub title: String,
    pub description: String,
    /// Staged upload paths of the video and thumbnail files
    pub video_path: PathBuf,
    pub thumbnail_path: PathBuf,
}

async fn publish_video(
    State(ctx): State<AppContext>,
    current: CurrentUser,
    Json(req): Json<PublishRequest>,
) -> ApiResult<ApiResponse<Video>> {
    let video = ctx
        .videos
        .publish(
            current.id(),
            &req.title,
            &req.description,
            &req.video_path,
            &req.thumbnail_path,
        )
        .await?;

    Ok(ApiResponse::created(video, "Video published successfully"))
}

async fn get_video(
    State(ctx): State<AppContext>,
    viewer: OptionalUser,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<VideoDetail>> {
    let video = ctx.videos.get_detail(&id).await?;

    // An identified viewer counts as a view and lands in their history
    if let Some(viewer_id) = viewer.id() {
        ctx.videos.record_view(&video.video.id).await?;
        ctx.identity
            .record_watch(viewer_id, &video.video.id)
            .await?;
    }

    Ok(ApiResponse::ok(video, "Video fetched successfully"))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub thumbnail_path: Option<PathBuf>,
    pub video_path: Option<PathBuf>,
}

async fn update_video(
    State(ctx): State<AppContext>,
    current: CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<UpdateRequest>,
) -> ApiResult<ApiResponse<Video>> {
    let video = ctx
        .videos
        .update(
            current.id(),
            &id,
            VideoUpdate {
                title: req.title,
                description: req.description,
                thumbnail_path: req.thumbnail_path,
                video_path: req.video_path,
            },
        )
        .await?;

    Ok(ApiResponse::ok(video, "Video updated successfully"))
}

async fn delete_video(
    State(ctx): State<AppContext>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<Value>> {
    ctx.videos.delete(current.id(), &id).await?;

    Ok(ApiResponse::ok(Value::Null, "Video deleted successfully"))
}

async fn toggle_publish(
    State(ctx): State<AppContext>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<Video>> {
    let video = ctx.videos.toggle_publish(current.id(), &id).await?;

    Ok(ApiResponse::ok(video, "Publish status toggled"))
}
