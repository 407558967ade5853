/// Credential service
///
/// Issues and validates the dual-token credentials: a short-lived access
/// token and a long-lived refresh token, rotated on every use. One refresh
/// token per user; a presented token that does not exactly match the stored
/// one is treated as stolen and forces re-authentication.

mod service;

pub use service::CredentialService;

use serde::{Deserialize, Serialize};

/// A freshly minted access/refresh pair
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Claims embedded in an access token
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessClaims {
    /// User id
    pub sub: String,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub iat: i64,
    pub exp: i64,
}

/// Claims embedded in a refresh token: the user reference only.
///
/// `jti` keeps two tokens minted within the same second distinct, so
/// rotation always invalidates the previous value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: String,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}
