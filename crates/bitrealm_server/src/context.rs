//! Shared state handed to every opcode handler.

use crate::config::ServerConfig;
use bitrealm_engine::{bounded, BattleTable, DocumentStore, StoreError, WorldCatalog};
use bitrealm_protocol::DeliveryCache;
use std::future::Future;
use std::sync::Arc;

/// Components shared by all connections.
///
/// Cloning is cheap: every component sits behind an `Arc`.
#[derive(Clone)]
pub struct ServerContext {
    config: Arc<ServerConfig>,
    store: Arc<dyn DocumentStore>,
    catalog: Arc<WorldCatalog>,
    battles: Arc<BattleTable>,
    deliveries: Arc<DeliveryCache>,
}

impl ServerContext {
    pub fn new(
        config: ServerConfig,
        store: Arc<dyn DocumentStore>,
        catalog: Arc<WorldCatalog>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            store,
            catalog,
            battles: Arc::new(BattleTable::new()),
            deliveries: Arc::new(DeliveryCache::new()),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn store(&self) -> &dyn DocumentStore {
        self.store.as_ref()
    }

    pub fn catalog(&self) -> &WorldCatalog {
        &self.catalog
    }

    pub fn battles(&self) -> &BattleTable {
        &self.battles
    }

    pub fn deliveries(&self) -> &DeliveryCache {
        &self.deliveries
    }

    /// Runs a store call under the configured store timeout.
    pub async fn store_call<T, F>(&self, operation: &'static str, call: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        bounded(self.config.store_timeout, operation, call).await
    }
}
