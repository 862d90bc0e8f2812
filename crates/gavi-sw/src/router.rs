//! Request router: classify a fetch, then run that class's strategy.
//!
//! Classification is a pure function over the request and config. Each
//! strategy resolves to exactly one `Result`: a response, or the error the
//! page sees when every fallback is exhausted.

use std::sync::Arc;

use http::StatusCode;
use tracing::{debug, trace, warn};

use crate::cache::{CacheEntry, CacheStore};
use crate::config::WorkerConfig;
use crate::freshness::{Freshness, FreshnessGate};
use crate::host::Network;
use crate::net::fetch_bounded;
use crate::request::{Request, RequestDestination, RequestMode, Response};
use crate::tasks::BackgroundTasks;
use crate::{now_millis, ServiceWorkerError};

/// Request class. First match wins, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestClass {
    /// API path or backend host. Network first, never written to a cache.
    ApiLive,
    /// Images and the manifest. Cache first with background fill.
    StaticAsset,
    /// Navigations, documents, scripts, styles. Network first, TTL-gated fallback.
    Navigable,
    /// Network first, any cache as fallback, no write-back.
    Other,
}

impl RequestClass {
    pub fn classify(request: &Request, config: &WorkerConfig) -> Self {
        let path = request.url.path();

        if config.is_live_data(&request.url) {
            RequestClass::ApiLive
        } else if request.destination == RequestDestination::Image
            || path.contains(&config.images_marker)
            || path == config.manifest_path
        {
            RequestClass::StaticAsset
        } else if request.mode == RequestMode::Navigate
            || matches!(
                request.destination,
                RequestDestination::Document
                    | RequestDestination::Script
                    | RequestDestination::Style
            )
        {
            RequestClass::Navigable
        } else {
            RequestClass::Other
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestClass::ApiLive => "api-live",
            RequestClass::StaticAsset => "static-asset",
            RequestClass::Navigable => "navigable",
            RequestClass::Other => "other",
        }
    }
}

/// Fetch-event router.
pub struct RequestRouter {
    config: Arc<WorkerConfig>,
    caches: Arc<dyn CacheStore>,
    network: Arc<dyn Network>,
    gate: FreshnessGate,
    background: BackgroundTasks,
}

impl RequestRouter {
    pub fn new(
        config: Arc<WorkerConfig>,
        caches: Arc<dyn CacheStore>,
        network: Arc<dyn Network>,
        background: BackgroundTasks,
    ) -> Self {
        let gate = FreshnessGate::new(config.dynamic_ttl());
        Self {
            config,
            caches,
            network,
            gate,
            background,
        }
    }

    /// Produce the response the page will see.
    pub async fn route(&self, request: &Request) -> Result<Response, ServiceWorkerError> {
        let class = RequestClass::classify(request, &self.config);
        debug!(url = %request.url, strategy = class.as_str(), "Routing fetch");

        match class {
            RequestClass::ApiLive | RequestClass::Other => {
                self.network_first(request, class).await
            }
            RequestClass::StaticAsset => self.cache_first(request).await,
            RequestClass::Navigable => self.network_first_ttl(request).await,
        }
    }

    /// Network, falling back to any cached copy of this exact request.
    pub async fn network_first(
        &self,
        request: &Request,
        class: RequestClass,
    ) -> Result<Response, ServiceWorkerError> {
        match self.fetch_network(request).await {
            Ok(response) => Ok(response),
            Err(e) => {
                debug!(url = %request.url, strategy = class.as_str(), error = %e, "Network failed, trying caches");
                match self.lookup_any(request).await {
                    Some(entry) => Ok(Response::from_cache(&entry)),
                    None => Err(e),
                }
            }
        }
    }

    /// Cached copy if any, else network with a background write to the
    /// static generation.
    pub async fn cache_first(&self, request: &Request) -> Result<Response, ServiceWorkerError> {
        if let Some(entry) = self.lookup_any(request).await {
            trace!(url = %request.url, "Static cache hit");
            return Ok(Response::from_cache(&entry));
        }

        let response = self.fetch_network(request).await?;
        if request.is_cacheable() && response.ok() {
            let entry = CacheEntry::from_response(&request.url, &response);
            self.store_in_background(self.config.cache_names.static_cache.clone(), entry)
                .await;
        }
        Ok(response)
    }

    /// Network with a timestamped write to the dynamic generation; offline,
    /// a fresh dynamic entry or else the cached app shell root.
    pub async fn network_first_ttl(
        &self,
        request: &Request,
    ) -> Result<Response, ServiceWorkerError> {
        let error = match self.fetch_network(request).await {
            Ok(response) => {
                if request.is_cacheable() && response.status == StatusCode::OK {
                    let entry =
                        CacheEntry::from_response(&request.url, &response).stamped(now_millis());
                    self.store_in_background(self.config.cache_names.dynamic_cache.clone(), entry)
                        .await;
                }
                return Ok(response);
            }
            Err(e) => e,
        };

        debug!(url = %request.url, error = %error, "Network failed, trying dynamic cache");
        if let Some(entry) = self.lookup_dynamic(request).await {
            match self.gate.check(&entry, now_millis()) {
                Freshness::Fresh => return Ok(Response::from_cache(&entry)),
                Freshness::Stale => {
                    debug!(url = %request.url, "Dynamic entry stale, serving root document")
                }
            }
        }

        self.root_fallback(error).await
    }

    async fn fetch_network(&self, request: &Request) -> Result<Response, ServiceWorkerError> {
        fetch_bounded(self.network.as_ref(), request, self.config.network_timeout()).await
    }

    async fn root_fallback(&self, error: ServiceWorkerError) -> Result<Response, ServiceWorkerError> {
        let root = match self.config.root_url() {
            Ok(root) => root,
            Err(e) => {
                warn!(error = %e, "Root document URL does not resolve");
                return Err(error);
            }
        };

        match self.caches.match_any(root.as_str()).await {
            Ok(Some(entry)) => Ok(Response::from_cache(&entry)),
            Ok(None) => Err(error),
            Err(e) => {
                warn!(error = %e, "Root document lookup failed");
                Err(error)
            }
        }
    }

    async fn lookup_any(&self, request: &Request) -> Option<CacheEntry> {
        if !request.is_cacheable() {
            return None;
        }
        self.caches
            .match_any(request.cache_key())
            .await
            .unwrap_or_else(|e| {
                warn!(url = %request.url, error = %e, "Cache lookup failed");
                None
            })
    }

    async fn lookup_dynamic(&self, request: &Request) -> Option<CacheEntry> {
        if !request.is_cacheable() {
            return None;
        }
        self.caches
            .match_in(&self.config.cache_names.dynamic_cache, request.cache_key())
            .await
            .unwrap_or_else(|e| {
                warn!(url = %request.url, error = %e, "Dynamic cache lookup failed");
                None
            })
    }

    async fn store_in_background(&self, cache: String, entry: CacheEntry) {
        let caches = Arc::clone(&self.caches);
        self.background
            .spawn("cache-put", async move { caches.put(&cache, entry).await })
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn classify(request: Request) -> RequestClass {
        RequestClass::classify(&request, &WorkerConfig::default())
    }

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_api_wins_over_navigation() {
        let request = Request::navigate(url("https://gavi.store/api/orders"));
        assert_eq!(classify(request), RequestClass::ApiLive);
    }

    #[test]
    fn test_backend_host_is_live() {
        let request = Request::get(url("https://xyz.supabase.co/storage/v1/object/public/p.png"))
            .destination(RequestDestination::Image);
        assert_eq!(classify(request), RequestClass::ApiLive);
    }

    #[test]
    fn test_static_assets() {
        let image = Request::get(url("https://cdn.example/banner.webp"))
            .destination(RequestDestination::Image);
        let folder = Request::get(url("https://gavi.store/images/logo.png"));
        let manifest = Request::get(url("https://gavi.store/manifest.json"));

        assert_eq!(classify(image), RequestClass::StaticAsset);
        assert_eq!(classify(folder), RequestClass::StaticAsset);
        assert_eq!(classify(manifest), RequestClass::StaticAsset);
    }

    #[test]
    fn test_navigable() {
        let page = Request::navigate(url("https://gavi.store/products/7"));
        let script = Request::get(url("https://gavi.store/assets/index.js"))
            .destination(RequestDestination::Script);
        let style = Request::get(url("https://gavi.store/assets/index.css"))
            .destination(RequestDestination::Style);

        assert_eq!(classify(page), RequestClass::Navigable);
        assert_eq!(classify(script), RequestClass::Navigable);
        assert_eq!(classify(style), RequestClass::Navigable);
    }

    #[test]
    fn test_everything_else() {
        let font = Request::get(url("https://gavi.store/fonts/inter.woff2"))
            .destination(RequestDestination::Font);
        assert_eq!(classify(font), RequestClass::Other);
    }

    #[test]
    fn test_manifest_path_must_match_exactly() {
        let nested = Request::get(url("https://gavi.store/docs/manifest.json"));
        assert_eq!(classify(nested), RequestClass::Other);
    }
}
