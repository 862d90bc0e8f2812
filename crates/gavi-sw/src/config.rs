//! Worker configuration, resolved once at startup.

use std::time::Duration;

use gavi_common::{GaviError, ResultExt};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::ServiceWorkerError;

/// Version-tagged cache generation names.
///
/// Bumping a tag is the only way to invalidate an old generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheNames {
    /// App shell, icons and images.
    pub static_cache: String,
    /// Navigations, scripts and styles, TTL-gated.
    pub dynamic_cache: String,
    /// Catch-all name kept through the migration window.
    pub legacy: String,
}

impl Default for CacheNames {
    fn default() -> Self {
        Self {
            static_cache: "gavi-static-v3".to_string(),
            dynamic_cache: "gavi-dynamic-v3".to_string(),
            legacy: "gavi-cache-v3".to_string(),
        }
    }
}

impl CacheNames {
    /// Whether `name` is one of the current generations.
    pub fn is_current(&self, name: &str) -> bool {
        name == self.static_cache || name == self.dynamic_cache || name == self.legacy
    }
}

/// Values substituted for absent push payload fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationDefaults {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub url: String,
    pub tag: String,
    /// Vibration pattern in ms.
    pub vibrate: Vec<u32>,
}

impl Default for NotificationDefaults {
    fn default() -> Self {
        Self {
            title: "Gavi".to_string(),
            body: "There is something new at Gavi".to_string(),
            icon: "/icons/icon-192x192.png".to_string(),
            badge: "/icons/icon-192x192.png".to_string(),
            url: "/".to_string(),
            tag: "default".to_string(),
            vibrate: vec![100, 50, 100],
        }
    }
}

/// Worker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Origin the worker is registered on. Checked by [`WorkerConfig::validate`].
    pub origin: String,

    /// Cache generation tags.
    pub cache_names: CacheNames,

    /// Assets fetched into the static cache at install. All or nothing.
    pub precache: Vec<String>,

    /// Path segment marking live-data requests.
    pub api_marker: String,

    /// Hostname of the hosted backend (data, auth, storage).
    pub backend_host: Option<String>,

    /// Path segment marking image folders.
    pub images_marker: String,

    /// Web-app manifest path.
    pub manifest_path: String,

    /// App shell root, served when a navigation has nothing better offline.
    pub root_path: String,

    /// Max age of a dynamic entry served offline.
    pub dynamic_ttl_ms: u64,

    /// Bound on every network attempt. `None` waits forever.
    pub network_timeout_ms: Option<u64>,

    /// Query parameter carrying shared content for `SHARE_TARGET`.
    pub share_param: String,

    pub notifications: NotificationDefaults,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            origin: "https://gavi.store/".to_string(),
            cache_names: CacheNames::default(),
            precache: vec![
                "/".to_string(),
                "/manifest.json".to_string(),
                "/icons/icon-192x192.png".to_string(),
                "/icons/icon-512x512.png".to_string(),
            ],
            api_marker: "/api/".to_string(),
            backend_host: Some("supabase.co".to_string()),
            images_marker: "/images/".to_string(),
            manifest_path: "/manifest.json".to_string(),
            root_path: "/".to_string(),
            dynamic_ttl_ms: 5 * 60 * 1000,
            network_timeout_ms: Some(10_000),
            share_param: "shared".to_string(),
            notifications: NotificationDefaults::default(),
        }
    }
}

impl WorkerConfig {
    /// Load a JSON document over the defaults.
    pub fn from_json(json: &str) -> gavi_common::Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| GaviError::config_with_source("invalid worker config", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the origin and that every configured path resolves against it.
    pub fn validate(&self) -> gavi_common::Result<()> {
        let origin = Url::parse(&self.origin).map_err(|e| {
            GaviError::config_with_source(format!("invalid origin {}", self.origin), e)
        })?;
        if !matches!(origin.scheme(), "http" | "https") {
            return Err(GaviError::config(format!(
                "origin must be http(s), got {origin}"
            )));
        }
        if self.notifications.title.is_empty() || self.notifications.body.is_empty() {
            return Err(GaviError::config(
                "notification title and body defaults must be non-empty",
            ));
        }
        if self.dynamic_ttl_ms == 0 {
            return Err(GaviError::config("dynamic_ttl_ms must be positive"));
        }
        for path in self
            .precache
            .iter()
            .chain([&self.root_path, &self.notifications.url])
        {
            origin.join(path).context(format!("resolving {path}"))?;
        }
        Ok(())
    }

    pub fn dynamic_ttl(&self) -> Duration {
        Duration::from_millis(self.dynamic_ttl_ms)
    }

    pub fn network_timeout(&self) -> Option<Duration> {
        self.network_timeout_ms.map(Duration::from_millis)
    }

    /// Parsed origin.
    pub fn origin_url(&self) -> Result<Url, ServiceWorkerError> {
        Url::parse(&self.origin)
            .map_err(|e| ServiceWorkerError::InvalidUrl(format!("{}: {e}", self.origin)))
    }

    /// Resolve a path or URL against the origin.
    pub fn resolve(&self, path: &str) -> Result<Url, ServiceWorkerError> {
        self.origin_url()?
            .join(path)
            .map_err(|e| ServiceWorkerError::InvalidUrl(format!("{path}: {e}")))
    }

    /// Fully-qualified app shell root.
    pub fn root_url(&self) -> Result<Url, ServiceWorkerError> {
        self.resolve(&self.root_path)
    }

    /// Fully-qualified precache manifest.
    pub fn precache_urls(&self) -> Result<Vec<Url>, ServiceWorkerError> {
        self.precache.iter().map(|p| self.resolve(p)).collect()
    }

    /// Whether `url` points at live data: API marker in the path, or the
    /// backend host (or a subdomain of it).
    pub fn is_live_data(&self, url: &Url) -> bool {
        if url.path().contains(&self.api_marker) {
            return true;
        }
        match (url.host_str(), self.backend_host.as_deref()) {
            (Some(host), Some(backend)) => {
                host == backend
                    || host
                        .strip_suffix(backend)
                        .is_some_and(|prefix| prefix.ends_with('.'))
            }
            _ => false,
        }
    }
}
