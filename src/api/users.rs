/// User API endpoints: registration, sessions and profile management
use crate::{
    auth::{CurrentUser, OptionalUser},
    context::AppContext,
    credential::TokenPair,
    db::models::User,
    error::{ApiError, ApiResult},
    identity::{NewUser, UpdateDetails},
    media,
    response::ApiResponse,
};
use axum::{
    extract::{Path, State},
    routing::{get, patch, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;

const ACCESS_COOKIE: &str = "accessToken";
const REFRESH_COOKIE: &str = "refreshToken";

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/v1/users/register", post(register))
        .route("/api/v1/users/login", post(login))
        .route("/api/v1/users/refresh-token", post(refresh_token))
        .route("/api/v1/users/logout", post(logout))
        .route("/api/v1/users/me", get(me))
        .route("/api/v1/users/channel/:username", get(channel_profile))
        .route("/api/v1/users/watch-history", get(watch_history))
        .route("/api/v1/users/profile", patch(update_profile))
        .route("/api/v1/users/profile/avatar", patch(update_avatar))
        .route(
            "/api/v1/users/profile/cover-image",
            patch(update_cover_image).delete(remove_cover_image),
        )
        .route(
            "/api/v1/users/profile/change-password",
            patch(change_password),
        )
}

fn session_cookie(name: &'static str, value: String) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Strict)
        .build()
}

fn set_session(jar: CookieJar, pair: &TokenPair) -> CookieJar {
    jar.add(session_cookie(ACCESS_COOKIE, pair.access_token.clone()))
        .add(session_cookie(REFRESH_COOKIE, pair.refresh_token.clone()))
}

fn clear_session(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build((ACCESS_COOKIE, "")).path("/").build())
        .remove(Cookie::build((REFRESH_COOKIE, "")).path("/").build())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password: String,
    /// Staged upload path of the avatar image
    pub avatar_path: PathBuf,
    pub cover_image_path: Option<PathBuf>,
}

async fn register(
    State(ctx): State<AppContext>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<ApiResponse<User>> {
    // Reject bad fields and duplicates before touching the media store,
    // so a failed registration leaves no orphaned blobs behind.
    ctx.identity
        .check_registration(&req.username, &req.email, &req.full_name, &req.password)
        .await?;

    let avatar = ctx.media.upload(&req.avatar_path).await?;
    let cover_image = match &req.cover_image_path {
        Some(path) => Some(ctx.media.upload(path).await?.url),
        None => None,
    };

    let user = ctx
        .identity
        .create_user(NewUser {
            username: req.username,
            email: req.email,
            full_name: req.full_name,
            password: req.password,
            avatar: avatar.url,
            cover_image,
        })
        .await?;

    Ok(ApiResponse::created(user, "User registered successfully"))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    /// Username or email
    pub identifier: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub user: User,
    pub access_token: String,
    pub refresh_token: String,
}

async fn login(
    State(ctx): State<AppContext>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> ApiResult<(CookieJar, ApiResponse<SessionResponse>)> {
    if req.identifier.trim().is_empty() || req.password.is_empty() {
        return Err(ApiError::Validation(
            "Username or email is required".to_string(),
        ));
    }

    let user = ctx
        .identity
        .find_by_credential(&req.identifier)
        .await?
        .ok_or_else(|| ApiError::NotFound("User does not exist".to_string()))?;

    if !ctx.identity.verify_password(&user, &req.password)? {
        return Err(ApiError::Authentication(
            "Invalid user credentials".to_string(),
        ));
    }

    let pair = ctx.credentials.issue_pair(&user.id).await?;
    let jar = set_session(jar, &pair);

    Ok((
        jar,
        ApiResponse::ok(
            SessionResponse {
                user,
                access_token: pair.access_token,
                refresh_token: pair.refresh_token,
            },
            "User logged in successfully",
        ),
    ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

async fn refresh_token(
    State(ctx): State<AppContext>,
    jar: CookieJar,
    body: Option<Json<RefreshRequest>>,
) -> ApiResult<(CookieJar, ApiResponse<TokenPair>)> {
    // Cookie first, request body as the fallback transport
    let presented = jar
        .get(REFRESH_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .or_else(|| body.and_then(|Json(req)| req.refresh_token))
        .ok_or_else(|| ApiError::Authentication("Refresh token missing".to_string()))?;

    let pair = ctx.credentials.rotate_refresh(&presented).await?;
    let jar = set_session(jar, &pair);

    Ok((jar, ApiResponse::ok(pair, "Access token refreshed")))
}

async fn logout(
    State(ctx): State<AppContext>,
    current: CurrentUser,
    jar: CookieJar,
) -> ApiResult<(CookieJar, ApiResponse<Value>)> {
    ctx.credentials.revoke(current.id()).await?;
    let jar = clear_session(jar);

    Ok((
        jar,
        ApiResponse::ok(Value::Null, "User logged out successfully"),
    ))
}

async fn me(current: CurrentUser) -> ApiResponse<User> {
    ApiResponse::ok(current.user, "Current user fetched successfully")
}

async fn channel_profile(
    State(ctx): State<AppContext>,
    viewer: OptionalUser,
    Path(username): Path<String>,
) -> ApiResult<ApiResponse<Value>> {
    let channel = ctx.queries.channel_profile(&username, viewer.id()).await?;

    Ok(ApiResponse::ok(channel, "Channel fetched successfully"))
}

async fn watch_history(
    State(ctx): State<AppContext>,
    current: CurrentUser,
) -> ApiResult<ApiResponse<Vec<Value>>> {
    let history = ctx.queries.watch_history(current.id()).await?;

    Ok(ApiResponse::ok(
        history,
        "Watch history fetched successfully",
    ))
}

async fn update_profile(
    State(ctx): State<AppContext>,
    current: CurrentUser,
    Json(details): Json<UpdateDetails>,
) -> ApiResult<ApiResponse<User>> {
    let user = ctx.identity.update_details(current.id(), details).await?;

    Ok(ApiResponse::ok(user, "Account details updated successfully"))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRequest {
    /// Staged upload path of the new image
    pub image_path: PathBuf,
}

async fn update_avatar(
    State(ctx): State<AppContext>,
    current: CurrentUser,
    Json(req): Json<ImageRequest>,
) -> ApiResult<ApiResponse<User>> {
    let asset = media::replace(
        ctx.media.as_ref(),
        Some(&current.user.avatar),
        &req.image_path,
    )
    .await?;
    let user = ctx.identity.set_avatar(current.id(), &asset.url).await?;

    Ok(ApiResponse::ok(user, "Avatar updated successfully"))
}

async fn update_cover_image(
    State(ctx): State<AppContext>,
    current: CurrentUser,
    Json(req): Json<ImageRequest>,
) -> ApiResult<ApiResponse<User>> {
    let asset = media::replace(
        ctx.media.as_ref(),
        current.user.cover_image.as_deref(),
        &req.image_path,
    )
    .await?;
    let user = ctx
        .identity
        .set_cover_image(current.id(), Some(&asset.url))
        .await?;

    Ok(ApiResponse::ok(user, "Cover image updated successfully"))
}

async fn remove_cover_image(
    State(ctx): State<AppContext>,
    current: CurrentUser,
) -> ApiResult<ApiResponse<User>> {
    if let Some(url) = &current.user.cover_image {
        ctx.media.remove(url).await?;
    }
    let user = ctx.identity.set_cover_image(current.id(), None).await?;

    Ok(ApiResponse::ok(user, "Cover image removed successfully"))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

async fn change_password(
    State(ctx): State<AppContext>,
    current: CurrentUser,
    Json(req): Json<ChangePasswordRequest>,
) -> ApiResult<ApiResponse<Value>> {
    ctx.identity
        .change_password(current.id(), &req.old_password, &req.new_password)
        .await?;

    Ok(ApiResponse::ok(
        Value::Null,
        "Password changed successfully",
    ))
}
