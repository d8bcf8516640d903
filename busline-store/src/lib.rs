pub mod app_config;
pub mod memory;
pub mod redis_repo;
pub mod database;
pub mod events;

use std::sync::Arc;
use tracing::info;

use busline_core::{KvStore, StoreError};

pub use memory::MemoryStore;
pub use redis_repo::RedisStore;
pub use database::{DbClient, PostgresStore};
pub use events::{BookingEvent, BookingEventKind, EventBus};

use app_config::{StoreBackend, StoreConfig};

/// Builds the configured backend.
pub async fn connect(config: &StoreConfig) -> Result<Arc<dyn KvStore>, StoreError> {
    match config.backend {
        StoreBackend::Memory => {
            info!("Using in-memory store; bookings are lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Redis => {
            let url = config
                .redis_url
                .as_deref()
                .ok_or_else(|| StoreError::Backend("store.redis_url is not set".to_string()))?;
            Ok(Arc::new(RedisStore::new(url, &config.key_prefix).await?))
        }
        StoreBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .ok_or_else(|| StoreError::Backend("store.database_url is not set".to_string()))?;
            let db = DbClient::new(url)
                .await
                .map_err(|e| StoreError::Backend(e.to_string()))?;
            db.migrate()
                .await
                .map_err(|e| StoreError::Backend(e.to_string()))?;
            Ok(Arc::new(PostgresStore::new(db)))
        }
    }
}
