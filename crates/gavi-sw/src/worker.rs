//! Lifecycle dispatcher: one async handler per host event.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::cache::CacheStore;
use crate::click::{ClickOutcome, ClickRouter, NotificationClick};
use crate::config::WorkerConfig;
use crate::generation::{ActivationReport, GenerationManager};
use crate::host::{Network, WorkerHost};
use crate::message::{share_url, WorkerMessage};
use crate::push::{NotificationDescriptor, PushEvent};
use crate::request::{Request, Response};
use crate::router::RequestRouter;
use crate::tasks::BackgroundTasks;
use crate::{now_millis, ServiceWorkerError};

/// Service worker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ServiceWorkerState {
    /// Script evaluated, no event handled yet.
    #[default]
    Parsed,
    Installing,
    /// Installed; waiting unless skip-waiting was honoured.
    Installed,
    Activating,
    /// Active and handling fetches.
    Activated,
    /// Install failed or replaced.
    Redundant,
}

/// Events delivered by the host.
#[derive(Debug, Clone)]
pub enum ExtendableEvent {
    Install,
    Activate,
    Fetch(Request),
    Push(PushEvent),
    NotificationClick(NotificationClick),
    Sync { tag: String },
    Message(Value),
}

impl ExtendableEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ExtendableEvent::Install => "install",
            ExtendableEvent::Activate => "activate",
            ExtendableEvent::Fetch(_) => "fetch",
            ExtendableEvent::Push(_) => "push",
            ExtendableEvent::NotificationClick(_) => "notificationclick",
            ExtendableEvent::Sync { .. } => "sync",
            ExtendableEvent::Message(_) => "message",
        }
    }
}

/// What a settled event produced.
#[derive(Debug, Clone)]
pub enum EventOutcome {
    Installed { precached: usize },
    Activated(ActivationReport),
    Response(Response),
    Notified(NotificationDescriptor),
    Clicked(ClickOutcome),
    Synced,
    Message(Option<WorkerMessage>),
}

/// The offline caching and push worker.
pub struct ServiceWorker {
    config: Arc<WorkerConfig>,
    host: Arc<dyn WorkerHost>,
    generations: GenerationManager,
    router: RequestRouter,
    clicks: ClickRouter,
    background: BackgroundTasks,
    origin: Url,
    state: RwLock<ServiceWorkerState>,
}

impl ServiceWorker {
    /// Create a worker over the host's caches, network and globals.
    pub fn new(
        config: WorkerConfig,
        caches: Arc<dyn CacheStore>,
        network: Arc<dyn Network>,
        host: Arc<dyn WorkerHost>,
    ) -> Result<Self, ServiceWorkerError> {
        config.validate()?;
        let origin = config.origin_url()?;
        let config = Arc::new(config);
        let background = BackgroundTasks::new();

        Ok(Self {
            generations: GenerationManager::new(
                Arc::clone(&config),
                Arc::clone(&caches),
                Arc::clone(&network),
            ),
            router: RequestRouter::new(
                Arc::clone(&config),
                caches,
                network,
                background.clone(),
            ),
            clicks: ClickRouter::new(origin.clone(), config.notifications.url.clone()),
            background,
            host,
            config,
            origin,
            state: RwLock::new(ServiceWorkerState::Parsed),
        })
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Current state.
    pub async fn state(&self) -> ServiceWorkerState {
        *self.state.read().await
    }

    async fn set_state(&self, state: ServiceWorkerState) {
        let mut current = self.state.write().await;
        debug!(from = ?*current, to = ?state, "Worker state change");
        *current = state;
    }

    /// Dispatch a host event and wait for it to settle.
    pub async fn dispatch(&self, event: ExtendableEvent) -> Result<EventOutcome, ServiceWorkerError> {
        debug!(event = event.name(), "Dispatching event");
        match event {
            ExtendableEvent::Install => self
                .install()
                .await
                .map(|precached| EventOutcome::Installed { precached }),
            ExtendableEvent::Activate => self.activate().await.map(EventOutcome::Activated),
            ExtendableEvent::Fetch(request) => self.fetch(&request).await.map(EventOutcome::Response),
            ExtendableEvent::Push(push) => self.push(&push).await.map(EventOutcome::Notified),
            ExtendableEvent::NotificationClick(click) => self
                .notification_click(&click)
                .await
                .map(EventOutcome::Clicked),
            ExtendableEvent::Sync { tag } => self.sync(&tag).await.map(|_| EventOutcome::Synced),
            ExtendableEvent::Message(value) => self.message(&value).await.map(EventOutcome::Message),
        }
    }

    /// `install`: precache the static generation, then skip waiting.
    pub async fn install(&self) -> Result<usize, ServiceWorkerError> {
        self.set_state(ServiceWorkerState::Installing).await;

        let precached = match self.generations.install().await {
            Ok(count) => count,
            Err(e) => {
                error!(error = %e, "Install failed");
                self.set_state(ServiceWorkerState::Redundant).await;
                return Err(e);
            }
        };

        if let Err(e) = self.host.skip_waiting().await {
            warn!(error = %e, "skipWaiting failed");
        }
        self.set_state(ServiceWorkerState::Installed).await;
        Ok(precached)
    }

    /// `activate`: purge stale generations, then claim open clients.
    pub async fn activate(&self) -> Result<ActivationReport, ServiceWorkerError> {
        self.set_state(ServiceWorkerState::Activating).await;

        let report = match self.generations.activate().await {
            Ok(report) => report,
            Err(e) => {
                warn!(error = %e, "Cache cleanup failed");
                ActivationReport::default()
            }
        };

        if let Err(e) = self.host.claim_clients().await {
            warn!(error = %e, "clients.claim failed");
        }
        self.set_state(ServiceWorkerState::Activated).await;
        info!(
            deleted = report.deleted.len(),
            failed = report.failed.len(),
            "Worker activated"
        );
        Ok(report)
    }

    /// `fetch`: route the request.
    pub async fn fetch(&self, request: &Request) -> Result<Response, ServiceWorkerError> {
        self.router.route(request).await
    }

    /// `push`: decode and show a notification.
    pub async fn push(&self, event: &PushEvent) -> Result<NotificationDescriptor, ServiceWorkerError> {
        let defaults = &self.config.notifications;
        let descriptor = NotificationDescriptor::decode(event.data.as_deref(), defaults);
        let options = descriptor.to_options(&defaults.vibrate, now_millis());

        self.host.show_notification(&descriptor.title, &options).await?;
        debug!(tag = %descriptor.tag, "Notification shown");
        Ok(descriptor)
    }

    /// `notificationclick`: dismiss, then focus or open.
    pub async fn notification_click(
        &self,
        click: &NotificationClick,
    ) -> Result<ClickOutcome, ServiceWorkerError> {
        self.clicks.route(self.host.as_ref(), click).await
    }

    /// `sync`: nothing is queued for replay, so the event settles at once.
    pub async fn sync(&self, tag: &str) -> Result<(), ServiceWorkerError> {
        info!(tag, "Background sync");
        Ok(())
    }

    /// `message`: `SKIP_WAITING` and `SHARE_TARGET`; anything else is ignored.
    pub async fn message(&self, value: &Value) -> Result<Option<WorkerMessage>, ServiceWorkerError> {
        let Some(message) = WorkerMessage::parse(value) else {
            debug!("Ignoring unrecognized message");
            return Ok(None);
        };

        match &message {
            WorkerMessage::SkipWaiting => self.host.skip_waiting().await?,
            WorkerMessage::ShareTarget { .. } => match message.shared_content() {
                Some(content) => {
                    let url = share_url(&self.origin, &self.config.share_param, content);
                    self.host.open_window(&url).await?;
                }
                None => debug!("Share target without content"),
            },
        }
        Ok(Some(message))
    }

    /// Wait for detached cache writes.
    pub async fn settle(&self) {
        self.background.settle().await;
    }
}
