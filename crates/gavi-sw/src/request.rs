//! Request and response model seen by the fetch handler.

use bytes::Bytes;
use hashbrown::HashMap;
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use url::Url;

use crate::cache::CacheEntry;

/// Request mode (`Request.mode`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestMode {
    /// Top-level or frame navigation.
    Navigate,
    SameOrigin,
    #[default]
    NoCors,
    Cors,
}

/// Request destination (`Request.destination`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestDestination {
    Document,
    Script,
    Style,
    Image,
    Font,
    Manifest,
    /// `fetch()` / XHR.
    #[default]
    Empty,
    Other,
}

/// An intercepted request.
#[derive(Debug, Clone)]
pub struct Request {
    pub url: Url,
    pub method: Method,
    pub headers: HeaderMap,
    pub mode: RequestMode,
    pub destination: RequestDestination,
}

impl Request {
    /// Create a GET request.
    pub fn get(url: Url) -> Self {
        Self {
            url,
            method: Method::GET,
            headers: HeaderMap::new(),
            mode: RequestMode::default(),
            destination: RequestDestination::default(),
        }
    }

    /// Create a navigation request for a document.
    pub fn navigate(url: Url) -> Self {
        Self {
            mode: RequestMode::Navigate,
            destination: RequestDestination::Document,
            ..Self::get(url)
        }
    }

    /// Set the destination.
    pub fn destination(mut self, destination: RequestDestination) -> Self {
        self.destination = destination;
        self
    }

    /// Set the mode.
    pub fn mode(mut self, mode: RequestMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the method.
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Add a header.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Key used for cache lookups and writes.
    pub fn cache_key(&self) -> &str {
        self.url.as_str()
    }

    /// Whether the Cache API accepts this request (GET only).
    pub fn is_cacheable(&self) -> bool {
        self.method == Method::GET
    }
}

/// A response handed back to the page.
#[derive(Debug, Clone)]
pub struct Response {
    pub url: Url,
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// Whether this came out of a cache rather than the network.
    pub from_cache: bool,
}

impl Response {
    /// Create a network response.
    pub fn new(url: Url, status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            url,
            status,
            headers,
            body,
            from_cache: false,
        }
    }

    /// Check if the response was successful (2xx).
    pub fn ok(&self) -> bool {
        self.status.is_success()
    }

    /// Create a response from a cache entry.
    pub fn from_cache(entry: &CacheEntry) -> Self {
        let mut headers = HeaderMap::new();
        for (name, value) in &entry.headers {
            if let (Ok(n), Ok(v)) = (
                HeaderName::try_from(name.as_str()),
                HeaderValue::try_from(value.as_str()),
            ) {
                headers.insert(n, v);
            }
        }

        Self {
            url: entry.url.clone(),
            status: StatusCode::from_u16(entry.status).unwrap_or(StatusCode::OK),
            headers,
            body: Bytes::from(entry.body.clone()),
            from_cache: true,
        }
    }

    /// Flatten headers into the string map stored in cache entries.
    pub(crate) fn header_strings(&self) -> HashMap<String, String> {
        self.headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect()
    }
}
