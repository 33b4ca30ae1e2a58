/// Application context and dependency injection
use crate::{
    account::AccountManager,
    blob_store::{BlobStore, DiskBlobStore},
    config::ServerConfig,
    db,
    error::ApiResult,
    guest::GuestStore,
    images::ImageService,
    items::ItemManager,
    lists::ListManager,
};
use chrono::Duration;
use sqlx::SqlitePool;
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub db: SqlitePool,
    pub accounts: Arc<AccountManager>,
    pub lists: Arc<ListManager>,
    pub items: Arc<ItemManager>,
    pub images: Arc<ImageService>,
    pub guest: Arc<GuestStore>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> ApiResult<Self> {
        config.validate()?;

        // Create data directories if they don't exist
        tokio::fs::create_dir_all(&config.storage.data_directory).await?;
        tokio::fs::create_dir_all(&config.storage.uploads_directory).await?;

        // Initialize the database
        let db = db::create_pool(&config.storage.database, db::DatabaseOptions::default()).await?;
        db::run_migrations(&db).await?;
        db::test_connection(&db).await?;

        let accounts = Arc::new(AccountManager::new(
            db.clone(),
            Duration::hours(config.auth.session_ttl_hours),
        ));

        let lists = Arc::new(ListManager::new(db.clone()));
        let items = Arc::new(ItemManager::new(db.clone(), Arc::clone(&lists)));

        let blobs: Arc<dyn BlobStore> = Arc::new(DiskBlobStore::new(
            config.storage.uploads_directory.clone(),
        ));
        let images = Arc::new(ImageService::new(db.clone(), blobs));

        let guest = Arc::new(GuestStore::new());

        Ok(Self {
            config: Arc::new(config),
            db,
            accounts,
            lists,
            items,
            images,
            guest,
        })
    }
}
