//! Application state shared across handlers.

use std::sync::Arc;

use ingest::{IngestionCoordinator, QueryService};
use registry::AssetRegistry;
use rollup_store::Store;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<IngestionCoordinator>,
    pub query: Arc<QueryService>,
    pub store: Arc<dyn Store>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        registry: Arc<dyn AssetRegistry>,
        config: ingest::CoordinatorConfig,
    ) -> Self {
        let coordinator = Arc::new(IngestionCoordinator::new(
            store.clone(),
            registry.clone(),
            config,
        ));
        let query = Arc::new(QueryService::new(store.clone(), registry));
        Self {
            coordinator,
            query,
            store,
        }
    }
}
