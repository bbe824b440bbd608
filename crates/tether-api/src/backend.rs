// Backend seam
//
// The concrete client library (transport, wire protocol, auth flows)
// lives behind this trait. The reactive layer only ever needs two
// things from it: open a realtime subscription, and reach the auth store.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::auth::AuthStore;
use crate::error::Error;
use crate::subscription::Subscription;

/// Topic that subscribes to every record in a collection.
pub const WILDCARD_TOPIC: &str = "*";

/// A hosted backend client, as seen by the reactive layer.
#[async_trait]
pub trait Backend: Send + Sync + 'static {
    /// Open a realtime subscription on `collection`.
    ///
    /// `topic` is either [`WILDCARD_TOPIC`] for the whole collection or a
    /// single record id. The returned handle delivers events in transport
    /// order until its cancellation token fires.
    async fn subscribe(&self, collection: &str, topic: &str) -> Result<Subscription, Error>;

    /// The client's auth store.
    fn auth_store(&self) -> Arc<dyn AuthStore>;
}

// ── Collection ──────────────────────────────────────────────────────

/// Handle to one named collection on the backend.
///
/// Cheaply cloneable; carries the connection handle's cancellation token
/// so every subscription opened through it tears down with the client.
#[derive(Clone)]
pub struct Collection {
    name: Arc<str>,
    backend: Arc<dyn Backend>,
    cancel: CancellationToken,
}

impl Collection {
    pub fn new(name: impl Into<Arc<str>>, backend: Arc<dyn Backend>, cancel: CancellationToken) -> Self {
        Self {
            name: name.into(),
            backend,
            cancel,
        }
    }

    /// The collection's name on the backend.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The backend this collection belongs to.
    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    /// A child of the owning client's cancellation token.
    pub fn child_token(&self) -> CancellationToken {
        self.cancel.child_token()
    }

    /// Open a realtime subscription scoped to `topic`.
    pub async fn subscribe(&self, topic: &str) -> Result<Subscription, Error> {
        self.backend.subscribe(&self.name, topic).await
    }

    /// Open a wildcard subscription covering the whole collection.
    pub async fn subscribe_all(&self) -> Result<Subscription, Error> {
        self.subscribe(WILDCARD_TOPIC).await
    }
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
