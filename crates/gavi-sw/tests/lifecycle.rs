//! Install and activate: precaching, generation cleanup, host hand-offs.

mod common;

use std::sync::Arc;

use common::{init_logging, FakeHost, FakeNetwork, FlakyDeletes, Harness, HostCall};
use gavi_sw::{
    CacheStorage, CacheStore, EventOutcome, ExtendableEvent, ServiceWorker, ServiceWorkerError,
    ServiceWorkerState, WorkerConfig,
};

#[tokio::test]
async fn install_precaches_manifest_and_skips_waiting() {
    let h = Harness::new();
    h.serve_shell();

    let outcome = h.worker.dispatch(ExtendableEvent::Install).await.unwrap();
    assert!(matches!(outcome, EventOutcome::Installed { precached: 4 }));

    let cache = h.caches.cache("gavi-static-v3").await.unwrap();
    assert_eq!(cache.len(), 4);
    assert!(cache.match_request(common::url("/").as_str()).is_some());
    assert_eq!(h.host.calls(), vec![HostCall::SkipWaiting]);
    assert_eq!(h.worker.state().await, ServiceWorkerState::Installed);
}

#[tokio::test]
async fn install_is_all_or_nothing() {
    let h = Harness::new();
    h.serve_shell();
    h.network.serve("/icons/icon-512x512.png", 404, "");

    let err = h.worker.install().await.unwrap_err();
    assert!(matches!(err, ServiceWorkerError::InstallFailed { .. }));

    let cache = h.caches.cache("gavi-static-v3").await.unwrap();
    assert!(cache.is_empty());
    assert!(h.host.calls().is_empty());
    assert_eq!(h.worker.state().await, ServiceWorkerState::Redundant);
}

#[tokio::test]
async fn install_fails_when_offline() {
    let h = Harness::new();
    h.serve_shell();
    h.network.set_offline(true);

    assert!(h.worker.install().await.is_err());
    assert_eq!(h.worker.state().await, ServiceWorkerState::Redundant);
}

#[tokio::test]
async fn activate_deletes_only_stale_generations() {
    let h = Harness::new();
    for name in ["gavi-dynamic-v2", "gavi-static-v3", "gavi-dynamic-v3", "gavi-cache-v3", "other"] {
        h.caches.open(name).await.unwrap();
    }

    let report = h.worker.activate().await.unwrap();

    let keys = h.caches.keys().await.unwrap();
    assert_eq!(keys, vec!["gavi-static-v3", "gavi-dynamic-v3", "gavi-cache-v3"]);
    assert_eq!(report.deleted, vec!["gavi-dynamic-v2", "other"]);
    assert!(report.failed.is_empty());
    assert_eq!(h.host.calls(), vec![HostCall::Claim]);
    assert_eq!(h.worker.state().await, ServiceWorkerState::Activated);
}

#[tokio::test]
async fn failed_delete_does_not_stop_others() {
    init_logging();
    let caches = Arc::new(FlakyDeletes {
        inner: CacheStorage::new(),
        failing: "gavi-static-v1".to_string(),
    });
    for name in ["gavi-static-v1", "gavi-dynamic-v1", "gavi-static-v3"] {
        caches.open(name).await.unwrap();
    }
    let host = FakeHost::new();
    let worker = ServiceWorker::new(
        WorkerConfig::default(),
        caches.clone(),
        FakeNetwork::new(),
        host.clone(),
    )
    .unwrap();

    let report = worker.activate().await.unwrap();

    assert_eq!(report.deleted, vec!["gavi-dynamic-v1"]);
    assert_eq!(report.failed, vec!["gavi-static-v1"]);
    assert_eq!(
        caches.keys().await.unwrap(),
        vec!["gavi-static-v1", "gavi-static-v3"]
    );
    assert_eq!(host.calls(), vec![HostCall::Claim]);
    assert_eq!(worker.state().await, ServiceWorkerState::Activated);
}

#[tokio::test]
async fn bumped_tags_come_from_config() {
    init_logging();
    let mut config = WorkerConfig::default();
    config.cache_names.static_cache = "gavi-static-v4".into();
    config.cache_names.dynamic_cache = "gavi-dynamic-v4".into();
    config.cache_names.legacy = "gavi-cache-v4".into();

    let caches = Arc::new(CacheStorage::new());
    caches.open("gavi-static-v3").await.unwrap();
    caches.open("gavi-dynamic-v4").await.unwrap();
    let worker =
        ServiceWorker::new(config, caches.clone(), FakeNetwork::new(), FakeHost::new()).unwrap();

    worker.activate().await.unwrap();
    assert_eq!(caches.keys().await.unwrap(), vec!["gavi-dynamic-v4"]);
}

#[tokio::test]
async fn invalid_config_is_rejected() {
    let mut config = WorkerConfig::default();
    config.dynamic_ttl_ms = 0;

    let result = ServiceWorker::new(
        config,
        Arc::new(CacheStorage::new()),
        FakeNetwork::new(),
        FakeHost::new(),
    );
    assert!(matches!(result, Err(ServiceWorkerError::Config(_))));
}

#[tokio::test]
async fn empty_notification_defaults_are_rejected() {
    let mut config = WorkerConfig::default();
    config.notifications.title = String::new();
    config.notifications.body = String::new();

    let result = ServiceWorker::new(
        config,
        Arc::new(CacheStorage::new()),
        FakeNetwork::new(),
        FakeHost::new(),
    );
    assert!(matches!(result, Err(ServiceWorkerError::Config(_))));
}
