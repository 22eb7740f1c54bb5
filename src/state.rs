use std::sync::Arc;

use crate::config::AppConfig;
use crate::images::services::UploadHandler;
use crate::storage;
use crate::users::{
    memory::InMemoryUserRepository,
    password::CredentialHasher,
    repo::{PgUserRepository, UserRepository},
    services::UserService,
};

#[derive(Clone)]
pub struct AppState {
    pub users: UserService,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let repo: Arc<dyn UserRepository> = match &config.database_url {
            Some(url) => Arc::new(PgUserRepository::new(crate::db::connect(&config, url).await?)),
            None => {
                tracing::warn!("DATABASE_URL not set; users are kept in memory only");
                Arc::new(InMemoryUserRepository::new())
            }
        };

        let storage = storage::from_config(&config.storage).await?;
        let hasher = CredentialHasher::new(&config.hash)?;

        Ok(Self::from_parts(
            config,
            UserService::new(repo, hasher, UploadHandler::new(storage)),
        ))
    }

    pub fn from_parts(config: Arc<AppConfig>, users: UserService) -> Self {
        Self { users, config }
    }
}

#[cfg(test)]
impl AppState {
    pub fn fake_with_storage(storage: Arc<dyn storage::StorageClient>) -> Self {
        use crate::config::{HashConfig, StorageConfig};

        let config = Arc::new(AppConfig {
            host: "127.0.0.1".into(),
            port: 0,
            database_url: None,
            db_max_connections: 1,
            storage: StorageConfig::Local { dir: "fake".into() },
            hash: HashConfig {
                memory_kib: 1024,
                iterations: 1,
                parallelism: 1,
            },
            max_upload_bytes: 1024 * 1024,
        });

        let hasher = CredentialHasher::new(&config.hash).expect("cheap params ok");
        let users = UserService::new(
            Arc::new(InMemoryUserRepository::new()),
            hasher,
            UploadHandler::new(storage),
        );
        Self::from_parts(config, users)
    }

    pub fn fake() -> Self {
        Self::fake_with_storage(Arc::new(
            crate::images::services::tests::FakeStorage::default(),
        ))
    }
}
