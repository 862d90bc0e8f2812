//! In-memory host fakes shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use gavi_common::{try_init_logging, LogConfig};
use gavi_sw::{
    CacheEntry, CacheStorage, CacheStore, Client, ClientMatchOptions, ClientType, Network,
    NotificationOptions, Request, Response, ServiceWorker, ServiceWorkerError, WorkerConfig,
    WorkerHost,
};
use http::{HeaderMap, StatusCode};
use url::Url;

pub const ORIGIN: &str = "https://gavi.store/";

pub fn init_logging() {
    let _ = try_init_logging(LogConfig::test().with_filter("gavi_sw=debug"));
}

pub fn url(path: &str) -> Url {
    Url::parse(ORIGIN).unwrap().join(path).unwrap()
}

/// Network that serves canned responses and records every request.
#[derive(Default)]
pub struct FakeNetwork {
    routes: Mutex<HashMap<String, (u16, String)>>,
    offline: Mutex<bool>,
    calls: Mutex<Vec<String>>,
}

impl FakeNetwork {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn serve(&self, path: &str, status: u16, body: &str) {
        self.routes
            .lock()
            .unwrap()
            .insert(url(path).to_string(), (status, body.to_string()));
    }

    pub fn set_offline(&self, offline: bool) {
        *self.offline.lock().unwrap() = offline;
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Network for FakeNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, ServiceWorkerError> {
        self.calls.lock().unwrap().push(request.url.to_string());
        if *self.offline.lock().unwrap() {
            return Err(ServiceWorkerError::Network("offline".into()));
        }
        let route = self.routes.lock().unwrap().get(request.url.as_str()).cloned();
        match route {
            Some((status, body)) => Ok(Response::new(
                request.url.clone(),
                StatusCode::from_u16(status).unwrap(),
                HeaderMap::new(),
                Bytes::from(body),
            )),
            None => Err(ServiceWorkerError::Network(format!("no route for {}", request.url))),
        }
    }
}

/// Network that never answers.
pub struct HangingNetwork;

#[async_trait]
impl Network for HangingNetwork {
    async fn fetch(&self, _request: &Request) -> Result<Response, ServiceWorkerError> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Err(ServiceWorkerError::Network("unreachable".into()))
    }
}

/// Worker over an arbitrary network, with fresh caches and host.
pub fn worker_over(
    config: WorkerConfig,
    network: Arc<dyn Network>,
) -> (ServiceWorker, Arc<CacheStorage>) {
    init_logging();
    let caches = Arc::new(CacheStorage::new());
    let worker = ServiceWorker::new(config, caches.clone(), network, FakeHost::new()).unwrap();
    (worker, caches)
}

/// Host call log entry.
#[derive(Debug, Clone, PartialEq)]
pub enum HostCall {
    SkipWaiting,
    Claim,
    Show { title: String, options: NotificationOptions },
    Close { tag: String },
    Focus { id: String },
    Open { url: String },
}

#[derive(Default)]
pub struct FakeHost {
    pub clients: Mutex<Vec<Client>>,
    calls: Mutex<Vec<HostCall>>,
}

impl FakeHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_window(&self, id: &str, url: &str) {
        self.clients.lock().unwrap().push(Client {
            id: id.to_string(),
            url: Url::parse(url).unwrap(),
            client_type: ClientType::Window,
            focused: false,
        });
    }

    pub fn calls(&self) -> Vec<HostCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: HostCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl WorkerHost for FakeHost {
    async fn skip_waiting(&self) -> Result<(), ServiceWorkerError> {
        self.record(HostCall::SkipWaiting);
        Ok(())
    }

    async fn claim_clients(&self) -> Result<(), ServiceWorkerError> {
        self.record(HostCall::Claim);
        Ok(())
    }

    async fn show_notification(
        &self,
        title: &str,
        options: &NotificationOptions,
    ) -> Result<(), ServiceWorkerError> {
        self.record(HostCall::Show {
            title: title.to_string(),
            options: options.clone(),
        });
        Ok(())
    }

    async fn close_notification(&self, tag: &str) {
        self.record(HostCall::Close {
            tag: tag.to_string(),
        });
    }

    async fn match_clients(
        &self,
        options: ClientMatchOptions,
    ) -> Result<Vec<Client>, ServiceWorkerError> {
        Ok(self
            .clients
            .lock()
            .unwrap()
            .iter()
            .filter(|c| options.client_type == ClientType::All || c.client_type == options.client_type)
            .cloned()
            .collect())
    }

    async fn focus_client(&self, id: &str) -> Result<(), ServiceWorkerError> {
        self.record(HostCall::Focus { id: id.to_string() });
        Ok(())
    }

    async fn open_window(&self, url: &Url) -> Result<(), ServiceWorkerError> {
        self.record(HostCall::Open {
            url: url.to_string(),
        });
        Ok(())
    }
}

/// Cache store whose `delete` fails for one cache name.
pub struct FlakyDeletes {
    pub inner: CacheStorage,
    pub failing: String,
}

#[async_trait]
impl CacheStore for FlakyDeletes {
    async fn open(&self, cache: &str) -> Result<(), ServiceWorkerError> {
        self.inner.open(cache).await
    }

    async fn keys(&self) -> Result<Vec<String>, ServiceWorkerError> {
        self.inner.keys().await
    }

    async fn delete(&self, cache: &str) -> Result<bool, ServiceWorkerError> {
        if cache == self.failing {
            return Err(ServiceWorkerError::Cache(format!("cannot delete {cache}")));
        }
        self.inner.delete(cache).await
    }

    async fn match_in(
        &self,
        cache: &str,
        key: &str,
    ) -> Result<Option<CacheEntry>, ServiceWorkerError> {
        self.inner.match_in(cache, key).await
    }

    async fn match_any(&self, key: &str) -> Result<Option<CacheEntry>, ServiceWorkerError> {
        self.inner.match_any(key).await
    }

    async fn put(&self, cache: &str, entry: CacheEntry) -> Result<(), ServiceWorkerError> {
        self.inner.put(cache, entry).await
    }
}

/// Worker wired to fresh fakes with the default config.
pub struct Harness {
    pub worker: ServiceWorker,
    pub caches: Arc<CacheStorage>,
    pub network: Arc<FakeNetwork>,
    pub host: Arc<FakeHost>,
}

impl Harness {
    pub fn new() -> Self {
        init_logging();
        let caches = Arc::new(CacheStorage::new());
        let network = FakeNetwork::new();
        let host = FakeHost::new();
        let worker = ServiceWorker::new(
            WorkerConfig::default(),
            caches.clone(),
            network.clone(),
            host.clone(),
        )
        .unwrap();

        Self {
            worker,
            caches,
            network,
            host,
        }
    }

    /// Serve the default precache manifest.
    pub fn serve_shell(&self) {
        self.network.serve("/", 200, "<html>shell</html>");
        self.network.serve("/manifest.json", 200, "{}");
        self.network.serve("/icons/icon-192x192.png", 200, "png192");
        self.network.serve("/icons/icon-512x512.png", 200, "png512");
    }

    pub async fn seed(&self, cache: &str, path: &str, body: &str, headers: &[(&str, String)]) {
        let entry = CacheEntry {
            url: url(path),
            status: 200,
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
            body: body.as_bytes().to_vec(),
        };
        self.caches.put(cache, entry).await.unwrap();
    }
}
