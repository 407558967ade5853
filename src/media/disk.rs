/// Disk-based media storage backend
use crate::{
    error::{ApiError, ApiResult},
    media::{MediaStore, UploadedAsset},
};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

/// Stores media under a local directory and mints URLs from a base URL.
///
/// Cannot probe media duration, so uploads report 0 seconds; a CDN-backed
/// implementation would fill it in from the provider response.
#[derive(Clone)]
pub struct DiskMediaStore {
    directory: PathBuf,
    base_url: String,
}

impl DiskMediaStore {
    pub fn new(directory: PathBuf, base_url: String) -> Self {
        Self {
            directory,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// File path for an asset URL, when the URL belongs to this store
    fn asset_path(&self, url: &str) -> Option<PathBuf> {
        let name = url.strip_prefix(&self.base_url)?.strip_prefix('/')?;
        // URLs are minted from a uuid + extension; anything with a path
        // separator is not ours.
        if name.is_empty() || name.contains('/') {
            return None;
        }
        Some(self.directory.join(name))
    }
}

#[async_trait]
impl MediaStore for DiskMediaStore {
    async fn upload(&self, local_path: &Path) -> ApiResult<UploadedAsset> {
        fs::create_dir_all(&self.directory).await.map_err(|e| {
            ApiError::Upstream(format!("Failed to create media directory: {}", e))
        })?;

        let extension = local_path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{}", ext))
            .unwrap_or_default();
        let name = format!("{}{}", Uuid::new_v4(), extension);
        let destination = self.directory.join(&name);

        fs::copy(local_path, &destination)
            .await
            .map_err(|e| ApiError::Upstream(format!("Failed to store media file: {}", e)))?;

        // The local temp file is consumed by the upload
        if let Err(e) = fs::remove_file(local_path).await {
            tracing::warn!("failed to clean up upload temp file {:?}: {}", local_path, e);
        }

        Ok(UploadedAsset {
            url: format!("{}/{}", self.base_url, name),
            duration_seconds: 0.0,
        })
    }

    async fn remove(&self, url: &str) -> ApiResult<()> {
        let Some(path) = self.asset_path(url) else {
            // Not one of our URLs; removal is a no-op
            return Ok(());
        };

        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ApiError::Upstream(format!(
                "Failed to delete media {}: {}",
                url, e
            ))),
        }
    }
}
