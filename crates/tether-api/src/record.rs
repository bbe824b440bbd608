//! Record and realtime event types.
//!
//! The backend delivers realtime changes as `{ "action": ..., "record": ... }`
//! envelopes. The record body stays a raw [`serde_json::Value`] until a
//! mirror decodes it into the application's own type at the boundary.

use secrecy::SecretString;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Error;

// ── RecordModel ─────────────────────────────────────────────────────

/// Contract for application-defined record types.
///
/// A record is an externally-defined entity with a stable `id` field;
/// the application supplies its shape. Mirrors use [`id()`](Self::id) as
/// the identity key when folding events into local state.
pub trait RecordModel:
    Clone + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// The record's stable identifier.
    fn id(&self) -> &str;
}

// ── RecordAction ────────────────────────────────────────────────────

/// The kind of change a realtime event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordAction {
    Create,
    Update,
    Delete,
}

impl fmt::Display for RecordAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

// ── RecordEvent ─────────────────────────────────────────────────────

/// A parsed realtime event from the backend.
///
/// The record body is kept raw so nothing the backend sends is silently
/// dropped; consumers decode it with [`decode`](Self::decode) when they
/// need a typed view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordEvent {
    /// What happened to the record.
    pub action: RecordAction,

    /// The full record as the backend sent it.
    pub record: serde_json::Value,
}

impl RecordEvent {
    pub fn new(action: RecordAction, record: serde_json::Value) -> Self {
        Self { action, record }
    }

    /// The `id` field of the record payload, if present.
    pub fn record_id(&self) -> Option<&str> {
        self.record.get("id").and_then(serde_json::Value::as_str)
    }

    /// Decode the record payload into a typed record.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, Error> {
        serde_json::from_value(self.record.clone()).map_err(|e| Error::Decode {
            message: e.to_string(),
            body: self.record.to_string(),
        })
    }
}

// ── AuthRecord ──────────────────────────────────────────────────────

/// The currently authenticated principal as tracked by the auth store.
///
/// Uses `#[serde(flatten)]` to capture all fields beyond the core set,
/// so nothing from the backend is silently dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthRecord {
    /// The principal's record id.
    pub id: String,

    /// Login email, if the backend exposes one.
    #[serde(default)]
    pub email: Option<String>,

    /// Whether the account has been verified.
    #[serde(default)]
    pub verified: bool,

    /// All remaining fields the backend sends.
    #[serde(flatten)]
    pub extra: serde_json::Value,
}

/// A session token paired with the principal it authenticates.
///
/// The token is wrapped in [`SecretString`] so it never appears in
/// `Debug` output or logs.
#[derive(Clone)]
pub struct Session {
    pub record: AuthRecord,
    pub token: SecretString,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("record", &self.record)
            .field("token", &"<redacted>")
            .finish()
    }
}

// ── Tests ───────────────────────────────────────────────────────────
