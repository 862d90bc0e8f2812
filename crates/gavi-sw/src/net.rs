//! Network access: the reqwest-backed [`Network`] and the timeout policy.

use std::time::Duration;

use async_trait::async_trait;
use gavi_common::{with_timeout, GaviError};
use reqwest::Client;
use tracing::{debug, trace};

use crate::host::Network;
use crate::request::{Request, Response};
use crate::ServiceWorkerError;

/// HTTP network configuration.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub user_agent: String,
    pub max_redirects: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("gavi-sw/{}", env!("CARGO_PKG_VERSION")),
            max_redirects: 10,
        }
    }
}

/// [`Network`] over a reqwest client.
///
/// Timeouts are applied by the caller, see [`fetch_bounded`].
pub struct HttpNetwork {
    client: Client,
}

impl HttpNetwork {
    pub fn new(config: HttpConfig) -> Result<Self, ServiceWorkerError> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()
            .map_err(|e| GaviError::network_with_source("building HTTP client", e))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, ServiceWorkerError> {
        trace!(url = %request.url, method = %request.method, "Network fetch");

        let response = self
            .client
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone())
            .send()
            .await
            .map_err(|e| GaviError::network_with_source(format!("fetching {}", request.url), e))?;

        let status = response.status();
        let headers = response.headers().clone();
        let url = response.url().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| GaviError::network_with_source(format!("reading body of {url}"), e))?;

        trace!(url = %url, status = %status, body_len = body.len(), "Network response");

        Ok(Response::new(url, status, headers, body))
    }
}

/// Fetch through `network`, bounded by `timeout` when one is configured.
///
/// A timeout surfaces as [`ServiceWorkerError::Timeout`] and is handled like
/// any other network failure.
pub async fn fetch_bounded(
    network: &dyn Network,
    request: &Request,
    timeout: Option<Duration>,
) -> Result<Response, ServiceWorkerError> {
    match timeout {
        Some(limit) => {
            let result = with_timeout(limit, || network.fetch(request)).await;
            match result {
                Ok(inner) => inner,
                Err(e) => {
                    debug!(url = %request.url, ?limit, "Network attempt timed out");
                    Err(e.into())
                }
            }
        }
        None => network.fetch(request).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct Hanging;

    #[async_trait]
    impl Network for Hanging {
        async fn fetch(&self, _request: &Request) -> Result<Response, ServiceWorkerError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Err(ServiceWorkerError::Network("unreachable".into()))
        }
    }

    #[tokio::test]
    async fn test_http_network_fetches_body_and_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/manifest.json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/manifest+json")
                    .set_body_string(r#"{"name":"Gavi"}"#),
            )
            .mount(&server)
            .await;

        let network = HttpNetwork::new(HttpConfig::default()).unwrap();
        let url = Url::parse(&format!("{}/manifest.json", server.uri())).unwrap();
        let response = network.fetch(&Request::get(url)).await.unwrap();

        assert!(response.ok());
        assert!(!response.from_cache);
        assert_eq!(
            response.headers.get("content-type").unwrap(),
            "application/manifest+json"
        );
        assert_eq!(&response.body[..], br#"{"name":"Gavi"}"#);
    }

    #[tokio::test]
    async fn test_http_network_passes_error_statuses_through() {
        let server = MockServer::start().await;
        Mock::given(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let network = HttpNetwork::new(HttpConfig::default()).unwrap();
        let url = Url::parse(&format!("{}/missing", server.uri())).unwrap();
        let response = network.fetch(&Request::get(url)).await.unwrap();

        assert_eq!(response.status.as_u16(), 404);
        assert!(!response.ok());
    }

    #[tokio::test]
    async fn test_http_network_reports_unreachable_host() {
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let url = Url::parse(&format!("http://127.0.0.1:{port}/")).unwrap();

        let network = HttpNetwork::new(HttpConfig::default()).unwrap();
        let err = network.fetch(&Request::get(url.clone())).await.unwrap_err();

        match err {
            ServiceWorkerError::Network(message) => {
                assert!(message.starts_with(&format!("fetching {url}")))
            }
            other => panic!("expected network error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_bounded_times_out() {
        let url = Url::parse("https://gavi.store/").unwrap();
        let result = fetch_bounded(&Hanging, &Request::get(url), Some(Duration::from_millis(10))).await;
        assert!(matches!(result, Err(ServiceWorkerError::Timeout(_))));
    }
}
