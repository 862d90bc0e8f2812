//! Detached background work (cache writes behind a response).

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{trace, warn};

use crate::ServiceWorkerError;

/// Set of detached tasks.
///
/// The response path never awaits these; [`BackgroundTasks::settle`] exists
/// for the host's "extend lifetime" hook and for tests.
#[derive(Debug, Clone, Default)]
pub struct BackgroundTasks {
    handles: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `work`, logging its error instead of propagating it.
    pub async fn spawn<F>(&self, label: &'static str, work: F)
    where
        F: Future<Output = Result<(), ServiceWorkerError>> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            if let Err(e) = work.await {
                warn!(task = label, error = %e, "Background task failed");
            }
        });

        let mut handles = self.handles.lock().await;
        handles.retain(|h| !h.is_finished());
        handles.push(handle);
    }

    /// Number of tasks not yet finished.
    pub async fn pending(&self) -> usize {
        self.handles
            .lock()
            .await
            .iter()
            .filter(|h| !h.is_finished())
            .count()
    }

    /// Wait for every task spawned so far.
    pub async fn settle(&self) {
        let handles = std::mem::take(&mut *self.handles.lock().await);
        trace!(count = handles.len(), "Settling background tasks");
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "Background task panicked or was cancelled");
            }
        }
    }
}
