//! Push decoding and notification rendering.
//!
//! Payloads are untrusted. A JSON object contributes the fields it carries;
//! anything that is not JSON becomes the body; every absent or empty field
//! falls back to [`NotificationDefaults`].

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::config::NotificationDefaults;

/// Action id that opens the target URL.
pub const ACTION_VIEW: &str = "view";
/// Action id that only dismisses.
pub const ACTION_CLOSE: &str = "close";

/// A `push` event.
#[derive(Debug, Clone, Default)]
pub struct PushEvent {
    pub data: Option<Bytes>,
}

impl PushEvent {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: Some(data.into()),
        }
    }

    pub fn empty() -> Self {
        Self { data: None }
    }
}

/// Normalized notification, built from a push payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationDescriptor {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub image: Option<String>,
    pub target_url: String,
    pub tag: String,
    pub require_interaction: bool,
}

impl NotificationDescriptor {
    /// All defaults.
    pub fn defaults(defaults: &NotificationDefaults) -> Self {
        Self {
            title: defaults.title.clone(),
            body: defaults.body.clone(),
            icon: defaults.icon.clone(),
            badge: defaults.badge.clone(),
            image: None,
            target_url: defaults.url.clone(),
            tag: defaults.tag.clone(),
            require_interaction: false,
        }
    }

    /// Decode a push payload.
    pub fn decode(payload: Option<&[u8]>, defaults: &NotificationDefaults) -> Self {
        let mut descriptor = Self::defaults(defaults);
        let Some(payload) = payload else {
            return descriptor;
        };

        match serde_json::from_slice::<Value>(payload) {
            Ok(Value::Object(fields)) => descriptor.apply(&fields),
            Ok(other) => {
                debug!(kind = json_kind(&other), "Push payload is JSON but not an object");
            }
            Err(_) => {
                let text = String::from_utf8_lossy(payload);
                if !text.is_empty() {
                    descriptor.body = text.into_owned();
                }
            }
        }
        descriptor
    }

    fn apply(&mut self, fields: &Map<String, Value>) {
        let text = |keys: &[&str]| {
            keys.iter()
                .find_map(|k| fields.get(*k).and_then(Value::as_str))
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        if let Some(title) = text(&["title"]) {
            self.title = title;
        }
        if let Some(body) = text(&["body", "message"]) {
            self.body = body;
        }
        if let Some(icon) = text(&["icon"]) {
            self.icon = icon;
        }
        if let Some(badge) = text(&["badge"]) {
            self.badge = badge;
        }
        self.image = text(&["image", "productImage"]);
        if let Some(url) = text(&["url", "link"]) {
            self.target_url = url;
        }
        if let Some(tag) = text(&["tag"]) {
            self.tag = tag;
        }
        self.require_interaction = fields
            .get("requireInteraction")
            .and_then(Value::as_bool)
            .unwrap_or(false);
    }

    /// Options bag for `showNotification`.
    pub fn to_options(&self, vibrate: &[u32], arrived_at_ms: u64) -> NotificationOptions {
        NotificationOptions {
            body: self.body.clone(),
            icon: self.icon.clone(),
            badge: self.badge.clone(),
            image: self.image.clone(),
            vibrate: vibrate.to_vec(),
            tag: self.tag.clone(),
            require_interaction: self.require_interaction,
            data: NotificationData {
                url: self.target_url.clone(),
                date_of_arrival: arrived_at_ms,
            },
            actions: vec![
                NotificationAction::new(ACTION_VIEW, "View"),
                NotificationAction::new(ACTION_CLOSE, "Close"),
            ],
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Data carried by a shown notification, read back on click.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationData {
    pub url: String,
    pub date_of_arrival: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
}

impl NotificationAction {
    pub fn new(action: &str, title: &str) -> Self {
        Self {
            action: action.to_string(),
            title: title.to_string(),
        }
    }
}

/// `NotificationOptions` as passed to the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationOptions {
    pub body: String,
    pub icon: String,
    pub badge: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub vibrate: Vec<u32>,
    pub tag: String,
    pub require_interaction: bool,
    pub data: NotificationData,
    pub actions: Vec<NotificationAction>,
}
