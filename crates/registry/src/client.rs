//! Registry lookup: trait, HTTP client with caching, and a static variant
//! for tests and development.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use parking_lot::RwLock;
use tracing::{debug, warn};

use rollup_core::{AssetId, Error, Result};

/// Cache TTL for existence lookups.
const LOOKUP_CACHE_TTL: Duration = Duration::from_secs(30);

/// Maximum cached lookups.
const LOOKUP_CACHE_MAX_CAPACITY: u64 = 100_000;

/// Authoritative asset existence check.
#[async_trait]
pub trait AssetRegistry: Send + Sync {
    /// Whether the asset is registered. Transient registry failures surface
    /// as a storage error so the caller can retry the batch.
    async fn asset_exists(&self, asset_id: AssetId) -> Result<bool>;
}

/// HTTP-backed registry client.
///
/// Calls `GET {base_url}/assets/{id}` and caches answers for a short TTL.
/// With an empty or `"mock"` base URL every asset exists, mirroring
/// development setups without a registry service.
pub struct HttpAssetRegistry {
    base_url: String,
    http_client: reqwest::Client,
    cache: Cache<AssetId, bool>,
    mock_mode: bool,
}

impl HttpAssetRegistry {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        let mock_mode = base_url.is_empty() || base_url == "mock";

        Self {
            base_url,
            http_client: reqwest::Client::builder()
                .timeout(Duration::from_secs(5))
                .build()
                .expect("Failed to create HTTP client"),
            cache: Cache::builder()
                .max_capacity(LOOKUP_CACHE_MAX_CAPACITY)
                .time_to_live(LOOKUP_CACHE_TTL)
                .build(),
            mock_mode,
        }
    }

    /// Probe the registry service. Used for the startup health check.
    pub async fn check_connection(&self) -> bool {
        if self.mock_mode {
            return true;
        }
        let url = format!("{}/health", self.base_url);
        match self.http_client.get(&url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                warn!(error = %e, "Registry health probe failed");
                false
            }
        }
    }

    async fn remote_lookup(&self, asset_id: AssetId) -> Result<bool> {
        let url = format!("{}/assets/{}", self.base_url, asset_id);
        debug!(url = %url, "Registry lookup");

        let response = self.http_client.get(&url).send().await.map_err(|e| {
            warn!(error = %e, "Registry request failed");
            Error::storage(format!("registry unavailable: {}", e))
        })?;

        match response.status().as_u16() {
            200 => Ok(true),
            404 => Ok(false),
            status => {
                warn!(status = status, "Registry returned unexpected status");
                Err(Error::storage(format!(
                    "registry returned status {}",
                    status
                )))
            }
        }
    }
}

#[async_trait]
impl AssetRegistry for HttpAssetRegistry {
    async fn asset_exists(&self, asset_id: AssetId) -> Result<bool> {
        if self.mock_mode {
            return Ok(true);
        }

        if let Some(cached) = self.cache.get(&asset_id).await {
            debug!(asset_id = %asset_id, "Registry cache hit");
            return Ok(cached);
        }

        let exists = self.remote_lookup(asset_id).await?;
        // Negative answers are cached too; the TTL bounds how long a freshly
        // registered asset stays invisible.
        self.cache.insert(asset_id, exists).await;
        Ok(exists)
    }
}

/// Fixed in-memory registry for tests and single-process development.
#[derive(Default, Clone)]
pub struct StaticRegistry {
    assets: Arc<RwLock<HashSet<AssetId>>>,
}

impl StaticRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_assets(assets: impl IntoIterator<Item = AssetId>) -> Self {
        Self {
            assets: Arc::new(RwLock::new(assets.into_iter().collect())),
        }
    }

    pub fn register(&self, asset_id: AssetId) {
        self.assets.write().insert(asset_id);
    }
}

#[async_trait]
impl AssetRegistry for StaticRegistry {
    async fn asset_exists(&self, asset_id: AssetId) -> Result<bool> {
        Ok(self.assets.read().contains(&asset_id))
    }
}
