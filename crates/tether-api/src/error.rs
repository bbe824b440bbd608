use thiserror::Error;

/// Top-level error type for the `tether-api` crate.
///
/// Covers the failure modes a backend implementation can surface through
/// the [`Backend`](crate::backend::Backend) seam. `tether-core` maps these
/// into its own diagnostics at the crate boundary.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// The backend rejected the current session or token.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// Underlying transport failure (connection refused, DNS, stream drop).
    /// The concrete client library owns the transport; its errors arrive
    /// here stringified.
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ── Realtime ────────────────────────────────────────────────────
    /// Opening a realtime subscription failed.
    #[error("Subscription to '{collection}' failed: {message}")]
    Subscribe { collection: String, message: String },

    /// The subscription's delivery channel closed unexpectedly.
    #[error("Subscription closed")]
    SubscriptionClosed,

    // ── Data ────────────────────────────────────────────────────────
    /// An event payload could not be decoded, with the raw body for debugging.
    #[error("Decode error: {message}")]
    Decode { message: String, body: String },
}

impl Error {
    /// Returns `true` if this error indicates the session is no longer
    /// valid and re-authentication might resolve it.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. } | Self::Subscribe { .. } | Self::SubscriptionClosed
        )
    }
}
