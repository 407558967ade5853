/// Media asset storage
///
/// Uploaded video files, thumbnails and profile images live in an external
/// blob store addressed by URL. The [`MediaStore`] trait is the boundary;
/// [`disk::DiskMediaStore`] is the bundled backend.

pub mod disk;

pub use disk::DiskMediaStore;

use crate::error::ApiResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Result of a successful upload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedAsset {
    /// Public URL of the stored asset
    pub url: String,
    /// Media duration where the provider can derive it, otherwise 0
    pub duration_seconds: f64,
}

/// Media storage backend trait
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Store the file at `local_path` and return its public URL
    async fn upload(&self, local_path: &Path) -> ApiResult<UploadedAsset>;

    /// Remove a stored asset by URL.
    ///
    /// Unknown or malformed URLs are a no-op; only provider failures error.
    async fn remove(&self, url: &str) -> ApiResult<()>;
}

/// Replace an asset: the old blob is removed before the new one is uploaded,
/// accepting a brief window with no valid asset if the upload then fails.
pub async fn replace(
    store: &dyn MediaStore,
    old_url: Option<&str>,
    new_path: &Path,
) -> ApiResult<UploadedAsset> {
    if let Some(url) = old_url {
        store.remove(url).await?;
    }
    store.upload(new_path).await
}
