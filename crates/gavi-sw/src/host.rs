//! Host boundary: the surfaces the browser exposes to the worker.

use async_trait::async_trait;
use url::Url;

use crate::push::NotificationOptions;
use crate::request::{Request, Response};
use crate::ServiceWorkerError;

/// Outbound network (`fetch()` from inside the worker).
#[async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: &Request) -> Result<Response, ServiceWorkerError>;
}

/// Client type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClientType {
    #[default]
    Window,
    Worker,
    SharedWorker,
    All,
}

/// A client (page or worker) visible to the service worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Client {
    pub id: String,
    pub url: Url,
    pub client_type: ClientType,
    pub focused: bool,
}

/// Options for `clients.matchAll()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClientMatchOptions {
    pub include_uncontrolled: bool,
    pub client_type: ClientType,
}

/// Worker-global host APIs: lifecycle hand-offs, notifications and clients.
#[async_trait]
pub trait WorkerHost: Send + Sync {
    /// `self.skipWaiting()`.
    async fn skip_waiting(&self) -> Result<(), ServiceWorkerError>;

    /// `clients.claim()`.
    async fn claim_clients(&self) -> Result<(), ServiceWorkerError>;

    /// `registration.showNotification()`.
    async fn show_notification(
        &self,
        title: &str,
        options: &NotificationOptions,
    ) -> Result<(), ServiceWorkerError>;

    /// `notification.close()` for the notification carrying `tag`.
    async fn close_notification(&self, tag: &str);

    /// `clients.matchAll()`.
    async fn match_clients(
        &self,
        options: ClientMatchOptions,
    ) -> Result<Vec<Client>, ServiceWorkerError>;

    /// `client.focus()`.
    async fn focus_client(&self, id: &str) -> Result<(), ServiceWorkerError>;

    /// `clients.openWindow()`.
    async fn open_window(&self, url: &Url) -> Result<(), ServiceWorkerError>;
}
