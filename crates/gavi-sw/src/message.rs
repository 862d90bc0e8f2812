//! Commands a page can post to the worker.

use serde::Deserialize;
use serde_json::Value;
use url::Url;

/// A recognized `message` event payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerMessage {
    /// Activate a waiting worker now.
    SkipWaiting,
    /// Content shared into the app from the OS share sheet.
    ShareTarget {
        #[serde(default)]
        url: Option<String>,
        #[serde(default)]
        text: Option<String>,
    },
}

impl WorkerMessage {
    /// Parse a posted value; `None` for shapes the worker does not handle.
    pub fn parse(value: &Value) -> Option<Self> {
        Self::deserialize(value).ok()
    }

    /// Shared content, URL preferred over text.
    pub fn shared_content(&self) -> Option<&str> {
        match self {
            WorkerMessage::ShareTarget { url, text } => url
                .as_deref()
                .filter(|s| !s.is_empty())
                .or(text.as_deref().filter(|s| !s.is_empty())),
            WorkerMessage::SkipWaiting => None,
        }
    }
}

/// `<origin>/?<param>=<content>`, with `content` form-encoded.
pub fn share_url(origin: &Url, param: &str, content: &str) -> Url {
    let mut url = origin.clone();
    url.set_path("/");
    url.set_fragment(None);
    url.query_pairs_mut().clear().append_pair(param, content);
    url
}
