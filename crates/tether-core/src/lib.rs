//! Reactive data layer between a hosted backend client and UI consumers.
//!
//! This crate owns the binding logic between `tether-api`'s backend seam
//! and whatever renders the data:
//!
//! - **[`Client`]** — Explicitly constructed context object wrapping the
//!   backend. Derives the identity observable from the auth store's change
//!   notifications, vends [`Collection`](tether_api::Collection) handles,
//!   and roots the cancellation tree every mirror subscription hangs off.
//!
//! - **[`ListMirror<T>`]** — Ordered in-memory mirror of a whole
//!   collection, kept in sync via a wildcard subscription. Cold until the
//!   first read; every applied event bumps a `tokio::sync::watch` channel.
//!
//! - **[`RecordMirror<T>`]** — Zero-or-one mirror of a single record,
//!   kept in sync via an id-scoped subscription.
//!
//! - **[`MirrorStream<S>`]** — Subscription handle vended by the mirrors.
//!   Exposes `current()` / `latest()` / `changed()` for reactive rendering.
//!
//! - **Hooks** ([`ListHooks`], [`RecordHooks`]) — Optional async override
//!   points run during activation and event application. A failed hook
//!   skips its event; it never tears down the subscription.

pub mod client;
pub mod config;
pub mod error;
pub mod mirror;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use client::Client;
pub use config::ClientConfig;
pub use error::CoreError;
pub use mirror::{HookError, ListHooks, ListMirror, MirrorPhase, RecordHooks, RecordMirror};
pub use stream::{MirrorStream, MirrorWatchStream};

// Re-export the seam types consumers implement or handle directly.
pub use tether_api::{
    AuthRecord, AuthStore, Backend, Collection, RecordAction, RecordEvent, RecordModel, Session,
    Subscription,
};
