/// Authentication extractors
use crate::{context::AppContext, db::models::User, error::ApiError};
use axum::{async_trait, extract::FromRequestParts, http::header, http::request::Parts};
use axum_extra::extract::cookie::CookieJar;

const ACCESS_COOKIE: &str = "accessToken";

/// Pull the access token from the cookie jar, falling back to a bearer
/// Authorization header.
fn extract_access_token(parts: &Parts) -> Option<String> {
    let jar = CookieJar::from_headers(&parts.headers);
    if let Some(cookie) = jar.get(ACCESS_COOKIE) {
        return Some(cookie.value().to_string());
    }

    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|v| v.trim().to_string())
}

/// Authenticated request context - the verified caller, loaded fresh
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
}

impl CurrentUser {
    pub fn id(&self) -> &str {
        &self.user.id
    }
}

#[async_trait]
impl FromRequestParts<AppContext> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_access_token(parts)
            .ok_or_else(|| ApiError::Authentication("Unauthorized request".to_string()))?;

        let claims = state.credentials.verify_access(&token)?;

        // The account may have been deleted since the token was issued;
        // store failures are not the caller's fault and stay 500.
        let user = match state.identity.get_user(&claims.sub).await {
            Ok(user) => user,
            Err(ApiError::NotFound(_)) => {
                return Err(ApiError::Authentication("Invalid access token".to_string()))
            }
            Err(e) => return Err(e),
        };

        Ok(CurrentUser { user })
    }
}

/// Optional authentication - identifies the viewer when credentials are
/// present, stays anonymous otherwise
#[derive(Debug, Clone)]
pub struct OptionalUser(pub Option<CurrentUser>);

impl OptionalUser {
    pub fn id(&self) -> Option<&str> {
        self.0.as_ref().map(|current| current.id())
    }
}

#[async_trait]
impl FromRequestParts<AppContext> for OptionalUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let current = CurrentUser::from_request_parts(parts, state).await.ok();
        Ok(OptionalUser(current))
    }
}
