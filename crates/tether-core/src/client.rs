// ── Connection handle ──
//
// One explicitly constructed context object per backend connection.
// Owns the identity observable (derived from the auth store's change
// notifications) and the cancellation root for every mirror subscription
// created through it.

use std::sync::Arc;

use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use tether_api::{AuthRecord, AuthStore, Backend, Collection, RecordModel};

use crate::config::ClientConfig;
use crate::error::CoreError;
use crate::mirror::{ListHooks, ListMirror, RecordHooks, RecordMirror};

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<ClientInner>`. Wraps the external backend
/// seam and exposes the current authenticated identity as an observable.
/// Construction spawns the identity bridge task, so a `Client` must be
/// created inside a tokio runtime; [`shutdown()`](Self::shutdown) cancels
/// the bridge and every mirror subscription derived from this handle.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    config: ClientConfig,
    backend: Arc<dyn Backend>,
    identity: watch::Receiver<Option<AuthRecord>>,
    cancel: CancellationToken,
    identity_task: Mutex<Option<JoinHandle<()>>>,
}

impl Client {
    /// Create a new client around a backend implementation.
    ///
    /// Seeds the identity observable from the auth store's current value
    /// and spawns the bridge task keeping it in sync with change
    /// notifications.
    pub fn new(config: ClientConfig, backend: Arc<dyn Backend>) -> Self {
        let store = backend.auth_store();
        // Subscribe before reading the seed value so a change firing
        // between the two is never lost.
        let changes = store.changes();
        let (identity_tx, identity) = watch::channel(store.record());
        let cancel = CancellationToken::new();
        let task = tokio::spawn(identity_bridge(
            store,
            changes,
            identity_tx,
            cancel.child_token(),
        ));

        Self {
            inner: Arc::new(ClientInner {
                config,
                backend,
                identity,
                cancel,
                identity_task: Mutex::new(Some(task)),
            }),
        }
    }

    /// Create a client configured from the environment (`TETHER_URL`).
    pub fn from_env(backend: Arc<dyn Backend>) -> Result<Self, CoreError> {
        Ok(Self::new(ClientConfig::from_env()?, backend))
    }

    /// Access the client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// The backend seam this client wraps.
    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.inner.backend
    }

    // ── Collections and mirrors ──────────────────────────────────

    /// Handle to a named collection.
    ///
    /// An empty name is a hard construction-time failure.
    pub fn collection(&self, name: &str) -> Result<Collection, CoreError> {
        if name.trim().is_empty() {
            return Err(CoreError::EmptyCollectionName);
        }
        Ok(Collection::new(
            name,
            Arc::clone(&self.inner.backend),
            self.inner.cancel.child_token(),
        ))
    }

    /// Create a cold [`ListMirror`] over `collection`.
    pub fn list_mirror<T: RecordModel>(
        &self,
        collection: &str,
        hooks: ListHooks<T>,
    ) -> Result<ListMirror<T>, CoreError> {
        Ok(ListMirror::new(self.collection(collection)?, hooks))
    }

    /// Create a cold [`RecordMirror`] over one record of `collection`.
    pub fn record_mirror<T: RecordModel>(
        &self,
        collection: &str,
        record_id: impl Into<String>,
        hooks: RecordHooks<T>,
    ) -> Result<RecordMirror<T>, CoreError> {
        Ok(RecordMirror::new(
            self.collection(collection)?,
            record_id,
            hooks,
        ))
    }

    // ── Identity ─────────────────────────────────────────────────

    /// Subscribe to the current authenticated identity.
    pub fn identity(&self) -> watch::Receiver<Option<AuthRecord>> {
        self.inner.identity.clone()
    }

    /// The current authenticated identity, if any.
    pub fn current_identity(&self) -> Option<AuthRecord> {
        self.inner.identity.borrow().clone()
    }

    /// Log out: delegates to the auth store's clear operation. The
    /// identity observable empties once the store's change notification
    /// arrives.
    pub fn logout(&self) {
        self.inner.backend.auth_store().clear();
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Shut down the client.
    ///
    /// Cancels the identity bridge and every mirror subscription created
    /// through this handle, then joins the bridge task.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        if let Some(task) = self.inner.identity_task.lock().await.take() {
            let _ = task.await;
        }
        debug!("client shut down");
    }
}

// ── Identity bridge ─────────────────────────────────────────────────

/// Re-read the auth store on every change notification and publish the
/// result to the identity watch channel. A lagged receiver resyncs by
/// reading the store's latest state, so consumers never observe a stale
/// identity.
async fn identity_bridge(
    store: Arc<dyn AuthStore>,
    mut changes: broadcast::Receiver<()>,
    identity: watch::Sender<Option<AuthRecord>>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            result = changes.recv() => {
                match result {
                    Ok(()) => {
                        identity.send_modify(|current| *current = store.record());
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "identity bridge: receiver lagged, resyncing");
                        identity.send_modify(|current| *current = store.record());
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }
}
