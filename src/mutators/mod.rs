/// Resource mutators
///
/// Owner-checked CRUD over videos, playlists and the social edges. The
/// ownership rule is one predicate shared by every mutating operation.

pub mod playlist;
pub mod social;
pub mod video;

pub use playlist::PlaylistManager;
pub use social::SocialManager;
pub use video::VideoManager;

use crate::error::{ApiError, ApiResult};
use serde::Serialize;
use sqlx::FromRow;

/// Authorization predicate: only the owner may mutate a resource
pub fn ensure_owner(owner_id: &str, requester_id: &str) -> ApiResult<()> {
    if owner_id != requester_id {
        return Err(ApiError::Authorization(
            "Only the owner can modify this resource".to_string(),
        ));
    }
    Ok(())
}

/// Public owner subset joined into fetched resources
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerSummary {
    pub id: String,
    pub full_name: String,
    pub username: String,
    pub avatar: String,
}
