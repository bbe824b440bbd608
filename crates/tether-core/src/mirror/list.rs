// ── List mirror ──
//
// Ordered sequence of records belonging to one collection, kept in sync
// via a wildcard subscription. Mutate-then-notify: every applied event
// ends by bumping the watch channel.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OnceCell, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use tether_api::{Collection, RecordAction, RecordEvent, RecordModel, Subscription};

use super::{
    DeleteHook, HookError, ListInitHook, MirrorPhase, TransformHook, merge_record,
};
use crate::stream::MirrorStream;

// ── ListHooks ───────────────────────────────────────────────────────

/// Lifecycle hooks for a [`ListMirror`].
///
/// Every field is optional; the default configuration applies events
/// verbatim and drops updates for unknown ids.
pub struct ListHooks<T: RecordModel> {
    pub(crate) on_init: Option<ListInitHook<T>>,
    pub(crate) on_update: Option<TransformHook<T>>,
    pub(crate) on_create: Option<TransformHook<T>>,
    pub(crate) on_delete: Option<DeleteHook<T>>,
    pub(crate) insert_on_update: bool,
}

impl<T: RecordModel> Default for ListHooks<T> {
    fn default() -> Self {
        Self {
            on_init: None,
            on_update: None,
            on_create: None,
            on_delete: None,
            insert_on_update: false,
        }
    }
}

impl<T: RecordModel> ListHooks<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// {trigger: first activation; effect: seeds the sequence before the
    /// subscription opens}. Receives the mirror's [`Collection`] so the
    /// seed can be fetched through the backend.
    pub fn on_init<F, Fut>(mut self, hook: F) -> Self
    where
        F: FnOnce(Collection) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<T>, HookError>> + Send + 'static,
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
    /// before it is appended}. Returning `Ok(None)` keeps the incoming one.
    pub fn on_create<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<T>, HookError>> + Send + 'static,
    {
        self.on_create = Some(Box::new(move |record| Box::pin(hook(record))));
        self
    }

    /// {trigger: delete event; effect: side-effect observer, runs before
    /// the record is removed}.
    pub fn on_delete<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HookError>> + Send + 'static,
    {
        self.on_delete = Some(Box::new(move |record| Box::pin(hook(record))));
        self
    }

    /// {trigger: update event for an id not in the mirror; effect:
    /// enabled, the record is appended; disabled (default), the event is
    /// dropped}.
    pub fn insert_on_update(mut self, insert: bool) -> Self {
        self.insert_on_update = insert;
        self
    }
}

impl<T: RecordModel> fmt::Debug for ListHooks<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListHooks")
            .field("on_init", &self.on_init.is_some())
            .field("on_update", &self.on_update.is_some())
            .field("on_create", &self.on_create.is_some())
            .field("on_delete", &self.on_delete.is_some())
            .field("insert_on_update", &self.insert_on_update)
            .finish()
    }
}

// ── ListMirror ──────────────────────────────────────────────────────

/// Reactive mirror of a whole collection.
///
/// Starts cold; the first [`records()`](Self::records) call runs the
/// initial-load hook (if any), opens a wildcard subscription, and spawns
/// the event task. Dropping the mirror cancels the subscription.
pub struct ListMirror<T: RecordModel> {
    inner: Arc<ListInner<T>>,
    cancel: CancellationToken,
}

struct ListInner<T: RecordModel> {
    collection: Collection,
    records: watch::Sender<Arc<Vec<T>>>,
    last_event: watch::Sender<Option<DateTime<Utc>>>,
    active: OnceCell<()>,
    hooks: Mutex<Option<ListHooks<T>>>,
}

impl<T: RecordModel> ListMirror<T> {
    /// Create a cold mirror. No backend traffic happens until the first
    /// read.
    pub fn new(collection: Collection, hooks: ListHooks<T>) -> Self {
        let (records, _) = watch::channel(Arc::new(Vec::new()));
        let (last_event, _) = watch::channel(None);
        let cancel = collection.child_token();

        Self {
            inner: Arc::new(ListInner {
                collection,
                records,
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

    /// Current activation phase.
    pub fn phase(&self) -> MirrorPhase {
        if self.inner.active.initialized() {
            MirrorPhase::Active
        } else {
            MirrorPhase::Cold
        }
    }

    /// Read the current ordered sequence. The first call activates the
    /// mirror: initial load, then wildcard subscription.
    pub async fn records(&self) -> Arc<Vec<T>> {
        self.activate().await;
        self.inner.records.borrow().clone()
    }

    /// Latest snapshot without triggering activation.
    pub fn latest(&self) -> Arc<Vec<T>> {
        self.inner.records.borrow().clone()
    }

    /// Subscribe to snapshot changes.
    pub fn watch(&self) -> MirrorStream<Arc<Vec<T>>> {
        MirrorStream::new(self.inner.records.subscribe())
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

impl<T: RecordModel> Drop for ListMirror<T> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

// ── Activation ──────────────────────────────────────────────────────

/// Cold → active transition: seed, subscribe, spawn the event task.
///
/// Failures are logged and swallowed -- the mirror stays unsynchronized
/// rather than surfacing an error to the reader.
async fn activate<T: RecordModel>(inner: Arc<ListInner<T>>, cancel: CancellationToken) {
    let mut hooks = inner.hooks.lock().await.take().unwrap_or_default();

    if let Some(on_init) = hooks.on_init.take() {
        match on_init(inner.collection.clone()).await {
            Ok(seed) => {
                inner.records.send_modify(|records| *records = Arc::new(seed));
            }
            Err(e) => {
                error!(
                    collection = %inner.collection.name(),
                    error = %e,
                    "initial load failed, mirror stays unsynchronized"
                );
                return;
            }
        }
    }

    let subscription = match inner.collection.subscribe_all().await {
        Ok(sub) => sub,
        Err(e) => {
            error!(
                collection = %inner.collection.name(),
                error = %e,
                "subscription failed, mirror stays unsynchronized"
            );
            return;
        }
    };

    debug!(collection = %inner.collection.name(), "list mirror active");
    tokio::spawn(event_loop(inner, hooks, subscription, cancel));
}

/// Consume events strictly in delivery order until cancelled or the
/// backend drops the feed.
async fn event_loop<T: RecordModel>(
    inner: Arc<ListInner<T>>,
    hooks: ListHooks<T>,
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

/// Fold one event into the sequence per the merge rules, then signal
/// invalidation. Undecodable payloads and failed hooks skip the event.
async fn apply_event<T: RecordModel>(
    inner: &ListInner<T>,
    hooks: &ListHooks<T>,
    event: RecordEvent,
) {
    match event.action {
        RecordAction::Update => {
            let Some(id) = event.record_id().map(str::to_owned) else {
                warn!(
                    collection = %inner.collection.name(),
                    "update event without record id, skipping"
                );
                return;
            };

            let existing = inner
                .records
                .borrow()
                .iter()
                .position(|r| r.id() == id);

            match existing {
                Some(index) => {
                    let Some(current) = inner.records.borrow().get(index).cloned() else {
                        return;
                    };
                    let merged = match merge_record(&current, &event.record) {
                        Ok(merged) => merged,
                        Err(e) => {
                            warn!(
                                collection = %inner.collection.name(),
                                id = %id,
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
                    inner.records.send_modify(|records| {
                        if let Some(slot) = Arc::make_mut(records).get_mut(index) {
                            *slot = record;
                        }
                    });
                }
                None if hooks.insert_on_update => {
                    let Some(record) = decode_event(inner, &event) else {
                        return;
                    };
                    let Some(record) =
                        run_transform(inner, hooks.on_update.as_ref(), record, event.action).await
                    else {
                        return;
                    };
                    inner
                        .records
                        .send_modify(|records| Arc::make_mut(records).push(record));
                }
                None => {
                    debug!(
                        collection = %inner.collection.name(),
                        id = %id,
                        "update for unknown record dropped"
                    );
                    // Invalidation still fires, matching the per-event contract.
                    inner.records.send_modify(|_| {});
                }
            }
        }
        RecordAction::Create => {
            let Some(record) = decode_event(inner, &event) else {
                return;
            };
            let Some(record) =
                run_transform(inner, hooks.on_create.as_ref(), record, event.action).await
            else {
                return;
            };
            inner
                .records
                .send_modify(|records| Arc::make_mut(records).push(record));
        }
        RecordAction::Delete => {
            let Some(id) = event.record_id().map(str::to_owned) else {
                warn!(
                    collection = %inner.collection.name(),
                    "delete event without record id, skipping"
                );
                return;
            };

            if let Some(on_delete) = hooks.on_delete.as_ref() {
                let Some(record) = decode_event::<T>(inner, &event) else {
                    return;
                };
                if let Err(e) = on_delete(record).await {
                    warn!(
                        collection = %inner.collection.name(),
                        id = %id,
                        error = %e,
                        "delete hook failed, skipping event"
                    );
                    return;
                }
            }

            inner
                .records
                .send_modify(|records| Arc::make_mut(records).retain(|r| r.id() != id));
        }
    }

    inner
        .last_event
        .send_modify(|stamp| *stamp = Some(Utc::now()));
}

fn decode_event<T: RecordModel>(inner: &ListInner<T>, event: &RecordEvent) -> Option<T> {
    match event.decode::<T>() {
        Ok(record) => Some(record),
        Err(e) => {
            warn!(
                collection = %inner.collection.name(),
                action = %event.action,
                error = %e,
                "undecodable event payload, skipping event"
            );
            None
        }
    }
}

async fn run_transform<T: RecordModel>(
    inner: &ListInner<T>,
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
                action = %action,
                error = %e,
                "transform hook failed, skipping event"
            );
            None
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────
