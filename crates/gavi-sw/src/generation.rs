//! Cache generation manager: precache on install, purge on activate.

use std::sync::Arc;

use futures::future::{join_all, try_join_all};
use tracing::{debug, info, warn};

use crate::cache::{CacheEntry, CacheStore};
use crate::config::WorkerConfig;
use crate::host::Network;
use crate::net::fetch_bounded;
use crate::request::Request;
use crate::ServiceWorkerError;

/// Outcome of the activation cleanup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivationReport {
    /// Stale generations removed.
    pub deleted: Vec<String>,
    /// Stale generations whose deletion failed.
    pub failed: Vec<String>,
}

/// Owns the mapping from cache class to generation name.
pub struct GenerationManager {
    config: Arc<WorkerConfig>,
    caches: Arc<dyn CacheStore>,
    network: Arc<dyn Network>,
}

impl GenerationManager {
    pub fn new(
        config: Arc<WorkerConfig>,
        caches: Arc<dyn CacheStore>,
        network: Arc<dyn Network>,
    ) -> Self {
        Self {
            config,
            caches,
            network,
        }
    }

    /// Open the static generation and fill it with the precache manifest.
    ///
    /// All or nothing: one failed or non-2xx fetch fails the install and
    /// nothing is written.
    pub async fn install(&self) -> Result<usize, ServiceWorkerError> {
        let static_cache = &self.config.cache_names.static_cache;
        self.caches.open(static_cache).await?;

        let urls = self.config.precache_urls()?;
        let timeout = self.config.network_timeout();
        let fetches = urls.into_iter().map(|url| async move {
            let request = Request::get(url);
            let response = fetch_bounded(self.network.as_ref(), &request, timeout)
                .await
                .map_err(|e| ServiceWorkerError::InstallFailed {
                    url: request.url.to_string(),
                    reason: e.to_string(),
                })?;
            if !response.ok() {
                return Err(ServiceWorkerError::InstallFailed {
                    url: request.url.to_string(),
                    reason: format!("status {}", response.status),
                });
            }
            Ok(CacheEntry::from_response(&request.url, &response))
        });

        let entries = try_join_all(fetches).await?;
        let count = entries.len();
        self.caches.put_all(static_cache, entries).await?;

        info!(cache = %static_cache, count, "Precached static assets");
        Ok(count)
    }

    /// Delete every cache that is not a current generation.
    ///
    /// Deletions run independently; one failure does not stop the others.
    pub async fn activate(&self) -> Result<ActivationReport, ServiceWorkerError> {
        let names = self.caches.keys().await?;
        let stale: Vec<String> = names
            .into_iter()
            .filter(|name| !self.config.cache_names.is_current(name))
            .collect();

        let results = join_all(stale.iter().map(|name| async move {
            (name, self.caches.delete(name).await)
        }))
        .await;

        let mut report = ActivationReport::default();
        for (name, result) in results {
            match result {
                Ok(true) => {
                    info!(cache = %name, "Deleted stale cache generation");
                    report.deleted.push(name.clone());
                }
                Ok(false) => debug!(cache = %name, "Stale cache already gone"),
                Err(e) => {
                    warn!(cache = %name, error = %e, "Failed to delete stale cache");
                    report.failed.push(name.clone());
                }
            }
        }

        Ok(report)
    }
}
