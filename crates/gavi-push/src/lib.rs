//! # Gavi Push
//!
//! Page-side push subscription lifecycle: permission, subscribe, unsubscribe.
//!
//! The platform (`Notification`, `PushManager`) and the persistence
//! collaborator sit behind [`PushPlatform`] and [`SubscriptionStore`].
//! Unsupported platforms and denied permission are ordinary outcomes, not
//! errors; persistence failures are logged and never undo a platform
//! subscription.

use std::sync::Arc;

use async_trait::async_trait;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use gavi_common::{retry_with_backoff, RetryConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Length of an uncompressed P-256 public key.
const SERVER_KEY_LEN: usize = 65;

/// Base64url, padding optional.
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Errors from the push client.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PushError {
    #[error("Invalid application server key: {0}")]
    InvalidKey(String),

    #[error("Push platform error: {0}")]
    Platform(String),

    #[error("Subscription persistence failed: {0}")]
    Persistence(String),
}

/// Notification permission state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Granted,
    Denied,
    /// Not asked yet.
    Default,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionKeys {
    pub p256dh: String,
    pub auth: String,
}

/// A browser-issued push subscription (`PushSubscription.toJSON()`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushSubscription {
    pub endpoint: String,
    #[serde(default)]
    pub expiration_time: Option<u64>,
    pub keys: SubscriptionKeys,
}

/// Row handed to the persistence collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    pub endpoint: String,
    pub p256dh: String,
    pub auth: String,
    pub user_agent: String,
}

impl SubscriptionRecord {
    pub fn new(subscription: &PushSubscription, user_agent: &str) -> Self {
        Self {
            endpoint: subscription.endpoint.clone(),
            p256dh: subscription.keys.p256dh.clone(),
            auth: subscription.keys.auth.clone(),
            user_agent: user_agent.to_string(),
        }
    }
}

/// Browser push and permission APIs.
#[async_trait]
pub trait PushPlatform: Send + Sync {
    /// `'serviceWorker' in navigator && 'PushManager' in window`.
    fn supports_push(&self) -> bool;

    /// Whether an active worker registration exists.
    async fn has_registration(&self) -> bool;

    /// `Notification.permission`.
    fn permission(&self) -> Permission;

    /// `Notification.requestPermission()`.
    async fn request_permission(&self) -> Permission;

    /// `pushManager.getSubscription()`.
    async fn get_subscription(&self) -> Result<Option<PushSubscription>, PushError>;

    /// `pushManager.subscribe({ userVisibleOnly: true, applicationServerKey })`.
    async fn subscribe(&self, application_server_key: &[u8]) -> Result<PushSubscription, PushError>;

    /// `subscription.unsubscribe()`.
    async fn unsubscribe(&self, subscription: &PushSubscription) -> Result<bool, PushError>;
}

/// External persistence of subscriptions.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    async fn insert(&self, record: &SubscriptionRecord) -> Result<(), PushError>;
    async fn delete(&self, endpoint: &str) -> Result<(), PushError>;
}

/// Push client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// VAPID public key, base64url.
    pub application_server_key: String,
    /// Stored alongside each subscription.
    pub user_agent: String,
    /// Retries for insert/delete on the store.
    pub persistence_retry: RetryConfig,
}

impl ClientConfig {
    pub fn new(application_server_key: impl Into<String>, user_agent: impl Into<String>) -> Self {
        Self {
            application_server_key: application_server_key.into(),
            user_agent: user_agent.into(),
            persistence_retry: RetryConfig::default(),
        }
    }
}

/// Decode a base64url VAPID public key into its raw point.
pub fn decode_application_server_key(key: &str) -> Result<Vec<u8>, PushError> {
    let bytes = URL_SAFE_LENIENT
        .decode(key.trim())
        .map_err(|e| PushError::InvalidKey(e.to_string()))?;

    if bytes.len() != SERVER_KEY_LEN || bytes[0] != 0x04 {
        return Err(PushError::InvalidKey(format!(
            "expected {SERVER_KEY_LEN}-byte uncompressed P-256 point, got {} bytes",
            bytes.len()
        )));
    }
    Ok(bytes)
}

/// Subscription lifecycle client.
pub struct PushClient {
    platform: Arc<dyn PushPlatform>,
    store: Arc<dyn SubscriptionStore>,
    server_key: Vec<u8>,
    config: ClientConfig,
}

impl PushClient {
    pub fn new(
        config: ClientConfig,
        platform: Arc<dyn PushPlatform>,
        store: Arc<dyn SubscriptionStore>,
    ) -> Result<Self, PushError> {
        let server_key = decode_application_server_key(&config.application_server_key)?;
        Ok(Self {
            platform,
            store,
            server_key,
            config,
        })
    }

    /// Current permission if already decided, otherwise prompt.
    pub async fn request_permission(&self) -> Permission {
        match self.platform.permission() {
            Permission::Default => {
                let choice = self.platform.request_permission().await;
                info!(?choice, "Notification permission prompt answered");
                choice
            }
            decided => decided,
        }
    }

    /// Subscribe this device, reusing an existing subscription.
    ///
    /// `Ok(None)` when push is unsupported, no worker is registered, or
    /// permission is not granted.
    pub async fn subscribe(&self) -> Result<Option<PushSubscription>, PushError> {
        if !self.platform.supports_push() {
            info!("Push not supported on this platform");
            return Ok(None);
        }
        if !self.platform.has_registration().await {
            info!("No active worker registration");
            return Ok(None);
        }

        if let Some(existing) = self.platform.get_subscription().await? {
            debug!(endpoint = %existing.endpoint, "Already subscribed");
            return Ok(Some(existing));
        }

        if self.request_permission().await != Permission::Granted {
            info!("Notification permission not granted");
            return Ok(None);
        }

        let subscription = self.platform.subscribe(&self.server_key).await?;
        info!(endpoint = %subscription.endpoint, "Subscribed to push");

        let record = SubscriptionRecord::new(&subscription, &self.config.user_agent);
        let stored = retry_with_backoff(&self.config.persistence_retry, || {
            self.store.insert(&record)
        })
        .await;
        if let Err(e) = stored {
            warn!(endpoint = %record.endpoint, error = %e, "Subscription kept locally without a stored record");
        }

        Ok(Some(subscription))
    }

    /// Cancel the subscription and drop its record. Returns whether one existed.
    pub async fn unsubscribe(&self) -> Result<bool, PushError> {
        if !self.platform.supports_push() {
            return Ok(false);
        }
        let Some(subscription) = self.platform.get_subscription().await? else {
            return Ok(false);
        };

        self.platform.unsubscribe(&subscription).await?;
        info!(endpoint = %subscription.endpoint, "Unsubscribed from push");

        let endpoint = subscription.endpoint.as_str();
        let removed = retry_with_backoff(&self.config.persistence_retry, || {
            self.store.delete(endpoint)
        })
        .await;
        if let Err(e) = removed {
            warn!(endpoint, error = %e, "Failed to remove stored subscription");
        }

        Ok(true)
    }

    /// Whether a platform subscription currently exists.
    pub async fn is_subscribed(&self) -> Result<bool, PushError> {
        if !self.platform.supports_push() {
            return Ok(false);
        }
        Ok(self.platform.get_subscription().await?.is_some())
    }
}
