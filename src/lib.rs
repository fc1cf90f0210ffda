// IQPass - paywall and premium entitlement core
// Core library

pub mod checkout;
pub mod commands;
pub mod config;
pub mod entitlement;
pub mod error;
pub mod guard;
pub mod metrics;
pub mod observability;
pub mod storage;

use std::sync::Arc;

use tracing::info;

use checkout::CheckoutService;
use config::{AppConfig, StorageBackend};
use entitlement::{EntitlementStore, Plan};
use guard::RouteGuard;
use storage::{FileStore, KeyValueStore, KeyringStore, MemoryStore};

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<EntitlementStore>,
    pub checkout: CheckoutService,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let backend: Box<dyn KeyValueStore> = match config.storage {
            StorageBackend::Memory => Box::new(MemoryStore::new()),
            StorageBackend::File => Box::new(FileStore::new(&config.data_dir)),
            StorageBackend::Keyring => Box::new(KeyringStore::new(config.keyring_service.clone())),
        };
        info!(storage = ?config.storage, "Entitlement store ready");

        let store = Arc::new(EntitlementStore::new(backend));
        let checkout = CheckoutService::from_config(Arc::clone(&store), &config);

        Self {
            config,
            store,
            checkout,
        }
    }

    /// A guard for a page that needs `required`, using the configured routes
    /// and poll interval.
    pub fn guard(&self, required: Plan) -> RouteGuard {
        RouteGuard::from_config(Arc::clone(&self.store), required, &self.config)
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(AppConfig::default())
    }
}

/// Loads configuration, installs logging and builds the shared state.
pub fn init() -> SharedState {
    let config = AppConfig::load();
    observability::init_tracing(&config);
    Arc::new(AppState::new(config))
}
