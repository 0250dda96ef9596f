//! Test environment setup.

use std::sync::Arc;

use axum::Router;

use api::AppState;
use ingest::CoordinatorConfig;
use registry::StaticRegistry;
use rollup_store::{MemoryStore, Store};

use crate::fixtures;

/// A fully wired engine over an in-memory store with one registered asset.
pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub registry: StaticRegistry,
    pub router: Router,
}

impl TestContext {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let registry = StaticRegistry::with_assets([fixtures::asset_x()]);

        let state = AppState::new(
            store.clone(),
            Arc::new(registry.clone()),
            CoordinatorConfig::default(),
        );

        Self {
            store,
            registry,
            router: api::router(state),
        }
    }

    /// Runs aggregation until the dirty queue is empty. Returns the number of
    /// ranges processed.
    pub async fn drain(&self) -> usize {
        let store: Arc<dyn Store> = self.store.clone();
        worker::drain(store).await.expect("drain failed")
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}
