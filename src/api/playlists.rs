/// Playlist API endpoints
use crate::{
    auth::CurrentUser,
    context::AppContext,
    db::models::Playlist,
    error::ApiResult,
    mutators::playlist::PlaylistDetail,
    response::ApiResponse,
};
use axum::{
    extract::{Path, State},
    routing::{patch, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::Value;

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/v1/playlists", post(create_playlist))
        .route(
            "/api/v1/playlists/:id",
            patch(update_playlist)
                .get(get_playlist)
                .delete(delete_playlist),
        )
        .route(
            "/api/v1/playlists/add/:videoId/:playlistId",
            patch(add_video),
        )
        .route(
            "/api/v1/playlists/remove/:videoId/:playlistId",
            patch(remove_video),
        )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePlaylistRequest {
    pub name: String,
    pub description: String,
}

async fn create_playlist(
    State(ctx): State<AppContext>,
    current: CurrentUser,
    Json(req): Json<CreatePlaylistRequest>,
) -> ApiResult<ApiResponse<Playlist>> {
    let playlist = ctx
        .playlists
        .create(current.id(), &req.name, &req.description)
        .await?;

    Ok(ApiResponse::created(
        playlist,
        "Playlist created successfully",
    ))
}

async fn get_playlist(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<PlaylistDetail>> {
    let playlist = ctx.playlists.get_detail(&id).await?;

    Ok(ApiResponse::ok(playlist, "Playlist fetched successfully"))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePlaylistRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

async fn update_playlist(
    State(ctx): State<AppContext>,
    current: CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<UpdatePlaylistRequest>,
) -> ApiResult<ApiResponse<Playlist>> {
    let playlist = ctx
        .playlists
        .update(current.id(), &id, req.name.as_deref(), req.description.as_deref())
        .await?;

    Ok(ApiResponse::ok(playlist, "Playlist updated successfully"))
}

async fn delete_playlist(
    State(ctx): State<AppContext>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<Value>> {
    ctx.playlists.delete(current.id(), &id).await?;

    Ok(ApiResponse::ok(
        Value::Null,
        "Playlist deleted successfully",
    ))
}

async fn add_video(
    State(ctx): State<AppContext>,
    current: CurrentUser,
    Path((video_id, playlist_id)): Path<(String, String)>,
) -> ApiResult<ApiResponse<Playlist>> {
    let playlist = ctx
        .playlists
        .add_video(current.id(), &playlist_id, &video_id)
        .await?;

    Ok(ApiResponse::ok(
        playlist,
        "Video added to playlist successfully",
    ))
}

async fn remove_video(
    State(ctx): State<AppContext>,
    current: CurrentUser,
    Path((video_id, playlist_id)): Path<(String, String)>,
) -> ApiResult<ApiResponse<Playlist>> {
    let playlist = ctx
        .playlists
        .remove_video(current.id(), &playlist_id, &video_id)
        .await?;

    Ok(ApiResponse::ok(
        playlist,
        "Video removed from playlist successfully",
    ))
}
