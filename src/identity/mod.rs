/// Identity store
///
/// User records, password hashing/verification, and profile mutations.
/// Usernames and emails are lowercase-normalised at write time; read paths
/// never expose the password hash or refresh token (see `db::models::User`).

mod store;

pub use store::IdentityStore;

use serde::Deserialize;

/// Registration fields
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password: String,
    pub avatar: String,
    pub cover_image: Option<String>,
}

/// Profile detail update
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDetails {
    pub full_name: String,
    pub email: String,
}
