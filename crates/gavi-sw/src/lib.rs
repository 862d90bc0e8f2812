//! # Gavi Service Worker
//!
//! Offline caching and push notification worker for the Gavi storefront.
//!
//! ## Features
//!
//! - **Cache generations**: precache on install, purge stale tags on activate
//! - **Request routing**: network-first, cache-first and TTL-gated fallbacks
//! - **Push**: payload decoding and notification rendering
//! - **Clicks**: focus an open window or open a new one
//!
//! ## Architecture
//!
//! ```text
//! ServiceWorker (event dispatch, lifecycle state)
//!     │
//!     ├── GenerationManager ── CacheStore, Network
//!     ├── RequestRouter ────── CacheStore, Network, FreshnessGate
//!     │       └── BackgroundTasks (detached cache writes)
//!     ├── NotificationDescriptor ── WorkerHost::show_notification
//!     └── ClickRouter ──────── WorkerHost clients API
//! ```

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use gavi_common::GaviError;
use thiserror::Error;

pub mod cache;
pub mod click;
pub mod config;
pub mod freshness;
pub mod generation;
pub mod host;
pub mod message;
pub mod net;
pub mod push;
pub mod request;
pub mod router;
pub mod tasks;
pub mod worker;

pub use cache::{Cache, CacheEntry, CacheStorage, CacheStore};
pub use click::{ClickOutcome, ClickRouter, ClickedNotification, NotificationClick};
pub use config::{CacheNames, NotificationDefaults, WorkerConfig};
pub use freshness::{Freshness, FreshnessGate, FETCHED_AT_HEADER};
pub use generation::{ActivationReport, GenerationManager};
pub use host::{Client, ClientMatchOptions, ClientType, Network, WorkerHost};
pub use message::WorkerMessage;
pub use net::{HttpConfig, HttpNetwork};
pub use push::{NotificationDescriptor, NotificationOptions, PushEvent};
pub use request::{Request, RequestDestination, RequestMode, Response};
pub use router::{RequestClass, RequestRouter};
pub use tasks::BackgroundTasks;
pub use worker::{EventOutcome, ExtendableEvent, ServiceWorker, ServiceWorkerState};

/// Errors that can occur in service worker operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceWorkerError {
    #[error("Install failed fetching {url}: {reason}")]
    InstallFailed { url: String, reason: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Network timed out after {0:?}")]
    Timeout(Duration),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<GaviError> for ServiceWorkerError {
    fn from(err: GaviError) -> Self {
        match err {
            GaviError::Timeout(limit) => Self::Timeout(limit),
            GaviError::Network {
                message,
                source: Some(source),
            } => Self::Network(format!("{message}: {source}")),
            GaviError::Network { message, .. } => Self::Network(message),
            GaviError::Config { .. } => Self::Config(err.to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}

/// Wall-clock milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
