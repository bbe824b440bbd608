// ── Single-record mirror ──
//
// Zero-or-one record identified by id, kept in sync via a subscription
// scoped to that id. Same contract shape as the list mirror: update
// merges in place, create replaces wholesale, delete clears.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OnceCell, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use tether_api::{Collection, RecordAction, RecordEvent, RecordModel, Subscription};

use super::{
    DeleteHook, HookError, MirrorPhase, RecordInitHook, TransformHook, merge_record,
};
use crate::stream::MirrorStream;

// ── RecordHooks ─────────────────────────────────────────────────────

/// Lifecycle hooks for a [`RecordMirror`]. Same shape as
/// [`ListHooks`](super::ListHooks), minus the unknown-id insert flag --
/// a scoped subscription only ever sees its own record.
pub struct RecordHooks<T: RecordModel> {
    pub(crate) on_init: Option<RecordInitHook<T>>,
    pub(crate) on_update: Option<TransformHook<T>>,
    pub(crate) on_create: Option<TransformHook<T>>,
    pub(crate) on_delete: Option<DeleteHook<T>>,
}

impl<T: RecordModel> Default for RecordHooks<T> {
    fn default() -> Self {
        Self {
            on_init: None,
            on_update: None,
            on_create: None,
            on_delete: None,
        }
    }
}

impl<T: RecordModel> RecordHooks<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// {trigger: first activation; effect: seeds the mirror before the
    /// subscription opens}. `Ok(None)` leaves the mirror empty.
    pub fn on_init<F, Fut>(mut self, hook: F) -> Self
    where
        F: FnOnce(Collection) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<T>, HookError>> + Send + 'static,
    {
        self.on_init = Some(Box::new(move |collection| Box::pin(hook(collection))));
        self
    }

    /// {trigger: update event; effect: may replace the merged record
    /// before it is stored}. Returning `Ok(None)` keeps the merged record.
    pub fn on_update<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<T>, HookError>> + Send + 'static,
    {
        self.on_update = Some(Box::new(move |record| Box::pin(hook(record))));
        self
    }

    /// {trigger: create event; effect: may replace the incoming record
    /// before it replaces the mirror}. Returning `Ok(None)` keeps it.
    pub fn on_create<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<T>, HookError>> + Send + 'static,
    {
        self.on_create = Some(Box::new(move |record| Box::pin(hook(record))));
        self
    }

    /// {trigger: delete event; effect: side-effect observer, runs before
    /// the mirror is cleared}.
    pub fn on_delete<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HookError>> + Send + 'static,
    {
        self.on_delete = Some(Box::new(move |record| Box::pin(hook(record))));
        self
    }
}

impl<T: RecordModel> fmt::Debug for RecordHooks<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordHooks")
            .field("on_init", &self.on_init.is_some())
            .field("on_update", &self.on_update.is_some())
            .field("on_create", &self.on_create.is_some())
            .field("on_delete", &self.on_delete.is_some())
            .finish()
    }
}

// ── RecordMirror ────────────────────────────────────────────────────

/// Reactive mirror of a single record.
///
/// Starts cold; the first [`record()`](Self::record) call runs the
/// initial-load hook (if any), opens a subscription scoped to the record
/// id, and spawns the event task. Dropping the mirror cancels the
/// subscription.
pub struct RecordMirror<T: RecordModel> {
    inner: Arc<RecordInner<T>>,
    cancel: CancellationToken,
}

struct RecordInner<T: RecordModel> {
    collection: Collection,
    record_id: String,
    state: watch::Sender<Option<T>>,
    last_event: watch::Sender<Option<DateTime<Utc>>>,
    active: OnceCell<()>,
    hooks: Mutex<Option<RecordHooks<T>>>,
}

impl<T: RecordModel> RecordMirror<T> {
    /// Create a cold mirror for `record_id`. No backend traffic happens
    /// until the first read.
    pub fn new(collection: Collection, record_id: impl Into<String>, hooks: RecordHooks<T>) -> Self {
        let (state, _) = watch::channel(None);
        let (last_event, _) = watch::channel(None);
        let cancel = collection.child_token();

        Self {
            inner: Arc::new(RecordInner {
                collection,
                record_id: record_id.into(),
                state,
                last_event,
                active: OnceCell::new(),
                hooks: Mutex::new(Some(hooks)),
            }),
            cancel,
        }
    }

    /// The collection this mirror reflects.
    pub fn collection(&self) -> &Collection {
        &self.inner.collection
    }

    /// The id this mirror is scoped to.
    pub fn record_id(&self) -> &str {
        &self.inner.record_id
    }

    /// Current activation phase.
    pub fn phase(&self) -> MirrorPhase {
        if self.inner.active.initialized() {
            MirrorPhase::Active
        } else {
            MirrorPhase::Cold
        }
    }

    /// Read the mirrored record. The first call activates the mirror:
    /// initial load, then id-scoped subscription.
    pub async fn record(&self) -> Option<T> {
        self.activate().await;
        self.inner.state.borrow().clone()
    }

    /// Latest state without triggering activation.
    pub fn latest(&self) -> Option<T> {
        self.inner.state.borrow().clone()
    }

    /// Subscribe to state changes.
    pub fn watch(&self) -> MirrorStream<Option<T>> {
        MirrorStream::new(self.inner.state.subscribe())
    }

    /// When the last subscription event was applied, if any.
    pub fn last_event(&self) -> Option<DateTime<Utc>> {
        *self.inner.last_event.borrow()
    }

    async fn activate(&self) {
        let inner = Arc::clone(&self.inner);
        let cancel = self.cancel.clone();
        self.inner
            .active
            .get_or_init(|| async move { activate(inner, cancel).await })
            .await;
    }
}

impl<T: RecordModel> Drop for RecordMirror<T> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

// ── Activation ──────────────────────────────────────────────────────

async fn activate<T: RecordModel>(inner: Arc<RecordInner<T>>, cancel: CancellationToken) {
    let mut hooks = inner.hooks.lock().await.take().unwrap_or_default();

    if let Some(on_init) = hooks.on_init.take() {
        match on_init(inner.collection.clone()).await {
            Ok(seed) => {
                inner.state.send_modify(|state| *state = seed);
            }
            Err(e) => {
                error!(
                    collection = %inner.collection.name(),
                    id = %inner.record_id,
                    error = %e,
                    "initial load failed, mirror stays unsynchronized"
                );
                return;
            }
        }
    }

    let subscription = match inner.collection.subscribe(&inner.record_id).await {
        Ok(sub) => sub,
        Err(e) => {
            error!(
                collection = %inner.collection.name(),
                id = %inner.record_id,
                error = %e,
                "subscription failed, mirror stays unsynchronized"
            );
            return;
        }
    };

    debug!(
        collection = %inner.collection.name(),
        id = %inner.record_id,
        "record mirror active"
    );
    tokio::spawn(event_loop(inner, hooks, subscription, cancel));
}

async fn event_loop<T: RecordModel>(
    inner: Arc<RecordInner<T>>,
    hooks: RecordHooks<T>,
    mut subscription: Subscription,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            event = subscription.recv() => {
                match event {
                    Some(event) => apply_event(&inner, &hooks, event).await,
                    None => {
                        debug!(
                            collection = %inner.collection.name(),
                            id = %inner.record_id,
                            "subscription stream ended"
                        );
                        break;
                    }
                }
            }
        }
    }
}

// ── Event application ───────────────────────────────────────────────

/// Fold one event into the mirror: update merges if a record is present
/// (no-op otherwise), create replaces wholesale, delete clears.
async fn apply_event<T: RecordModel>(
    inner: &RecordInner<T>,
    hooks: &RecordHooks<T>,
    event: RecordEvent,
) {
    match event.action {
        RecordAction::Update => {
            let current = inner.state.borrow().clone();
            match current {
                Some(current) => {
                    let merged = match merge_record(&current, &event.record) {
                        Ok(merged) => merged,
                        Err(e) => {
                            warn!(
                                collection = %inner.collection.name(),
                                id = %inner.record_id,
                                error = %e,
                                "undecodable update payload, skipping event"
                            );
                            return;
                        }
                    };
                    let Some(record) =
                        run_transform(inner, hooks.on_update.as_ref(), merged, event.action).await
                    else {
                        return;
                    };
                    inner.state.send_modify(|state| *state = Some(record));
                }
                None => {
                    // Update while empty is a no-op; invalidation still fires.
                    inner.state.send_modify(|_| {});
                }
            }
        }
        RecordAction::Create => {
            let record = match event.decode::<T>() {
                Ok(record) => record,
                Err(e) => {
                    warn!(
                        collection = %inner.collection.name(),
                        id = %inner.record_id,
                        error = %e,
                        "undecodable create payload, skipping event"
                    );
                    return;
                }
            };
            let Some(record) =
                run_transform(inner, hooks.on_create.as_ref(), record, event.action).await
            else {
                return;
            };
            inner.state.send_modify(|state| *state = Some(record));
        }
        RecordAction::Delete => {
            if let Some(on_delete) = hooks.on_delete.as_ref() {
                match event.decode::<T>() {
                    Ok(record) => {
                        if let Err(e) = on_delete(record).await {
                            warn!(
                                collection = %inner.collection.name(),
                                id = %inner.record_id,
                                error = %e,
                                "delete hook failed, skipping event"
                            );
                            return;
                        }
                    }
                    Err(e) => {
                        warn!(
                            collection = %inner.collection.name(),
                            id = %inner.record_id,
                            error = %e,
                            "undecodable delete payload, skipping event"
                        );
                        return;
                    }
                }
            }

            inner.state.send_modify(|state| *state = None);
        }
    }

    inner
        .last_event
        .send_modify(|stamp| *stamp = Some(Utc::now()));
}

async fn run_transform<T: RecordModel>(
    inner: &RecordInner<T>,
    hook: Option<&TransformHook<T>>,
    record: T,
    action: RecordAction,
) -> Option<T> {
    let Some(hook) = hook else {
        return Some(record);
    };
    match hook(record.clone()).await {
        Ok(Some(replacement)) => Some(replacement),
        Ok(None) => Some(record),
        Err(e) => {
            warn!(
                collection = %inner.collection.name(),
                id = %inner.record_id,
                action = %action,
                error = %e,
                "transform hook failed, skipping event"
            );
            None
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────
