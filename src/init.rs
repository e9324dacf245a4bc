use crate::{
    config::{Config, StorageBackend},
    database::{MemoryStore, OkrStore, SqliteDatabase},
    error::Result,
    okr::OkrService,
    permissions::{gate_from_config, PermissionGate},
};
use std::sync::Arc;

pub struct AppServices {
    pub store: Arc<dyn OkrStore>,
    pub gate: Arc<dyn PermissionGate>,
    pub okr_service: Arc<OkrService>,
}

impl AppServices {
    pub async fn initialize(config: &Config) -> Result<Self> {
        let store: Arc<dyn OkrStore> = match config.database.backend {
            StorageBackend::Sqlite => match SqliteDatabase::new(&config.database).await {
                Ok(db) => {
                    tracing::info!("SQLite database initialized successfully");
                    Arc::new(db)
                }
                Err(e) => {
                    tracing::error!("Failed to initialize SQLite database: {}", e);
                    return Err(e);
                }
            },
            StorageBackend::Memory => {
                tracing::info!("Using in-memory store, nothing will be persisted");
                Arc::new(MemoryStore::new())
            }
        };

        let gate = gate_from_config(&config.permissions);
        tracing::debug!("Permission mode: {:?}", config.permissions.mode);

        let okr_service = Arc::new(OkrService::new(store.clone(), gate.clone()));

        Ok(Self {
            store,
            gate,
            okr_service,
        })
    }
}
