use std::sync::Arc;

use sqlx::SqlitePool;

use crate::config::Config;
use crate::database::schema_repo;
use crate::services::auth_service::AuthClient;
use crate::services::issue_cache_service::IssueCache;
use crate::services::realtime_service::{self, RefreshChannel, RefreshSubscription};
use crate::services::storage_service::PhotoStorage;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Arc<Config>,
    pub auth: AuthClient,
    pub storage: PhotoStorage,
    pub refresh: RefreshChannel,
    pub cache: IssueCache,
    _listener: Arc<RefreshSubscription>,
}

impl AppState {
    /// Creates the schema, primes the issue cache and subscribes it to the
    /// refresh channel. The subscription ends when the last clone is dropped.
    pub async fn new(pool: SqlitePool, config: Config) -> sqlx::Result<Self> {
        schema_repo::ensure_schema(&pool).await?;

        let cache = IssueCache::default();
        cache.fetch_issues(&pool).await;

        let refresh = RefreshChannel::default();
        let listener = realtime_service::spawn_refresh_listener(&refresh, cache.clone(), pool.clone());

        Ok(Self {
            auth: AuthClient::new(
                &config.auth_url,
                &config.auth_anon_key,
                &config.auth_jwt_secret,
            ),
            storage: PhotoStorage::new(config.storage_dir.clone(), &config.public_base_url),
            config: Arc::new(config),
            pool,
            refresh,
            cache,
            _listener: Arc::new(listener),
        })
    }
}
