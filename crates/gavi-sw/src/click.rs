//! Notification click routing.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::host::{Client, ClientMatchOptions, ClientType, WorkerHost};
use crate::push::{NotificationData, ACTION_CLOSE};
use crate::ServiceWorkerError;

/// The notification that was clicked, as the host reports it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClickedNotification {
    pub tag: String,
    pub data: Option<NotificationData>,
}

/// A `notificationclick` event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationClick {
    /// Action id; empty when the body was clicked.
    pub action: String,
    pub notification: ClickedNotification,
}

/// What the click router did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    Dismissed,
    Focused { client_id: String },
    Opened { url: Url },
}

/// Routes clicks to an existing window or a new one.
#[derive(Debug, Clone)]
pub struct ClickRouter {
    origin: Url,
    default_url: String,
}

impl ClickRouter {
    pub fn new(origin: Url, default_url: impl Into<String>) -> Self {
        Self {
            origin,
            default_url: default_url.into(),
        }
    }

    /// Fully-qualified target of a click.
    pub fn target_url(&self, notification: &ClickedNotification) -> Url {
        let raw = notification
            .data
            .as_ref()
            .map(|d| d.url.as_str())
            .filter(|u| !u.is_empty())
            .unwrap_or(&self.default_url);

        match self.origin.join(raw) {
            Ok(url) => url,
            Err(e) => {
                warn!(url = raw, error = %e, "Notification target does not resolve, using origin");
                self.origin.clone()
            }
        }
    }

    /// The window client whose URL equals `target` exactly.
    pub fn find_window<'a>(clients: &'a [Client], target: &Url) -> Option<&'a Client> {
        clients
            .iter()
            .find(|c| c.client_type == ClientType::Window && c.url == *target)
    }

    /// Dismiss, then focus a matching window or open a new one.
    pub async fn route(
        &self,
        host: &dyn WorkerHost,
        click: &NotificationClick,
    ) -> Result<ClickOutcome, ServiceWorkerError> {
        host.close_notification(&click.notification.tag).await;

        if click.action == ACTION_CLOSE {
            debug!(tag = %click.notification.tag, "Notification dismissed");
            return Ok(ClickOutcome::Dismissed);
        }

        let target = self.target_url(&click.notification);
        let clients = host
            .match_clients(ClientMatchOptions {
                include_uncontrolled: true,
                client_type: ClientType::Window,
            })
            .await?;

        if let Some(client) = Self::find_window(&clients, &target) {
            debug!(client = %client.id, url = %target, "Focusing existing window");
            host.focus_client(&client.id).await?;
            return Ok(ClickOutcome::Focused {
                client_id: client.id.clone(),
            });
        }

        debug!(url = %target, "Opening new window");
        host.open_window(&target).await?;
        Ok(ClickOutcome::Opened { url: target })
    }
}
