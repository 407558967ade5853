/// Application context and dependency injection
use crate::{
    config::ServerConfig,
    credential::CredentialService,
    db::{self, documents::SqliteDocuments},
    error::ApiResult,
    identity::IdentityStore,
    media::{DiskMediaStore, MediaStore},
    mutators::{PlaylistManager, SocialManager, VideoManager},
    queries::QueryService,
};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub db: SqlitePool,
    pub identity: Arc<IdentityStore>,
    pub credentials: Arc<CredentialService>,
    pub queries: Arc<QueryService>,
    pub videos: Arc<VideoManager>,
    pub playlists: Arc<PlaylistManager>,
    pub social: Arc<SocialManager>,
    pub media: Arc<dyn MediaStore>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> ApiResult<Self> {
        config.validate()?;

        Self::ensure_directories(&config).await?;

        let db = db::create_pool(&config.storage.database, db::DatabaseOptions::default()).await?;
        db::run_migrations(&db).await?;
        db::test_connection(&db).await?;

        let config = Arc::new(config);

        let media: Arc<dyn MediaStore> = Arc::new(DiskMediaStore::new(
            config.media.directory.clone(),
            config.media.base_url.clone(),
        ));

        let identity = Arc::new(IdentityStore::new(db.clone()));
        let credentials = Arc::new(CredentialService::new(db.clone(), config.clone()));
        let queries = Arc::new(QueryService::new(Arc::new(SqliteDocuments::new(
            db.clone(),
        ))));
        let videos = Arc::new(VideoManager::new(db.clone(), media.clone()));
        let playlists = Arc::new(PlaylistManager::new(db.clone()));
        let social = Arc::new(SocialManager::new(db.clone()));

        Ok(Self {
            config,
            db,
            identity,
            credentials,
            queries,
            videos,
            playlists,
            social,
            media,
        })
    }

    /// Ensure required directories exist
    async fn ensure_directories(config: &ServerConfig) -> ApiResult<()> {
        let dirs = [&config.storage.data_directory, &config.media.directory];

        for dir in dirs {
            if !dir.exists() {
                tokio::fs::create_dir_all(dir).await?;
            }
        }

        Ok(())
    }

    /// Get service URL
    pub fn service_url(&self) -> String {
        format!(
            "http://{}:{}",
            self.config.service.hostname, self.config.service.port
        )
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::{AuthConfig, LoggingConfig, MediaConfig, ServiceConfig, StorageConfig};
    use crate::db::memory_pool;
    use crate::mutators::video::tests::FakeMedia;

    fn test_config() -> Arc<ServerConfig> {
        Arc::new(ServerConfig {
            service: ServiceConfig {
                hostname: "localhost".to_string(),
                port: 8000,
            },
            storage: StorageConfig {
                data_directory: "./data".into(),
                database: ":memory:".into(),
            },
            auth: AuthConfig {
                access_token_secret: "access-secret-access-secret-1234".to_string(),
                refresh_token_secret: "refresh-secret-refresh-secret-12".to_string(),
                access_token_ttl_minutes: 15,
                refresh_token_ttl_days: 10,
            },
            media: MediaConfig {
                directory: "./data/media".into(),
                base_url: "http://cdn.test".to_string(),
                upload_limit: 1024,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        })
    }

    /// Full context over an in-memory database and a fake media store
    pub(crate) async fn memory_context() -> (AppContext, Arc<FakeMedia>) {
        let db = memory_pool().await;
        let config = test_config();
        let fake_media = Arc::new(FakeMedia::new());
        let media: Arc<dyn MediaStore> = fake_media.clone();

        let ctx = AppContext {
            config: config.clone(),
            db: db.clone(),
            identity: Arc::new(IdentityStore::new(db.clone())),
            credentials: Arc::new(CredentialService::new(db.clone(), config)),
            queries: Arc::new(QueryService::new(Arc::new(SqliteDocuments::new(
                db.clone(),
            )))),
            videos: Arc::new(VideoManager::new(db.clone(), media.clone())),
            playlists: Arc::new(PlaylistManager::new(db.clone())),
            social: Arc::new(SocialManager::new(db.clone())),
            media,
        };
        (ctx, fake_media)
    }
}
