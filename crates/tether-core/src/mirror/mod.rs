// ── Reactive mirrors ──
//
// Local in-memory caches reflecting remote record state via subscription
// events. Both mirror flavors share the two-phase activation model and
// the JSON-level field merge.

mod list;
mod record;

pub use list::{ListHooks, ListMirror};
pub use record::{RecordHooks, RecordMirror};

use futures_util::future::BoxFuture;
use tether_api::{Collection, Error, RecordModel};

/// Activation state of a mirror.
///
/// Mirrors start `Cold`: no initial load has run and no subscription is
/// open. The first read transitions them to `Active`. A mirror whose
/// activation failed still reports `Active` -- it simply stays
/// unsynchronized (failures are logged, never propagated to readers).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirrorPhase {
    Cold,
    Active,
}

/// Error type lifecycle hooks may return. A failed hook skips the event
/// it was processing; it never tears down the subscription.
pub type HookError = Box<dyn std::error::Error + Send + Sync>;

// ── Hook storage ────────────────────────────────────────────────────

pub(crate) type TransformHook<T> =
    Box<dyn Fn(T) -> BoxFuture<'static, Result<Option<T>, HookError>> + Send + Sync>;

pub(crate) type DeleteHook<T> =
    Box<dyn Fn(T) -> BoxFuture<'static, Result<(), HookError>> + Send + Sync>;

pub(crate) type ListInitHook<T> =
    Box<dyn FnOnce(Collection) -> BoxFuture<'static, Result<Vec<T>, HookError>> + Send + Sync>;

pub(crate) type RecordInitHook<T> =
    Box<dyn FnOnce(Collection) -> BoxFuture<'static, Result<Option<T>, HookError>> + Send + Sync>;

// ── Field merge ─────────────────────────────────────────────────────

/// Merge an incoming event payload into an existing record.
///
/// The merge happens at the JSON level: the existing record is
/// serialized, the incoming object's keys are overlaid, and the result
/// is deserialized back. Full-record payloads therefore replace the
/// record wholesale; partial payloads only touch the fields they carry.
pub(crate) fn merge_record<T: RecordModel>(
    existing: &T,
    incoming: &serde_json::Value,
) -> Result<T, Error> {
    let mut base = serde_json::to_value(existing).map_err(|e| Error::Decode {
        message: e.to_string(),
        body: String::new(),
    })?;

    if let (Some(fields), Some(patch)) = (base.as_object_mut(), incoming.as_object()) {
        for (key, value) in patch {
            fields.insert(key.clone(), value.clone());
        }
    }

    serde_json::from_value(base).map_err(|e| Error::Decode {
        message: e.to_string(),
        body: incoming.to_string(),
    })
}

// ── Tests ───────────────────────────────────────────────────────────
