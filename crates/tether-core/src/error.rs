// ── Core error types ──
//
// User-facing errors from tether-core. These are NOT backend-specific --
// consumers never see the client library's transport failures directly.
// The `From<tether_api::Error>` impl translates seam-layer errors into
// domain-appropriate variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Construction errors ──────────────────────────────────────────
    #[error("Collection name is required")]
    EmptyCollectionName,

    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach backend: {reason}")]
    ConnectionFailed { reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    // ── Realtime errors ──────────────────────────────────────────────
    #[error("Subscription to '{collection}' failed: {reason}")]
    Subscription { collection: String, reason: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

// ── Conversion from seam-layer errors ────────────────────────────────

impl From<tether_api::Error> for CoreError {
    fn from(err: tether_api::Error) -> Self {
        match err {
            tether_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            tether_api::Error::Transport { message } => {
                CoreError::ConnectionFailed { reason: message }
            }
            tether_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            tether_api::Error::Subscribe {
                collection,
                message,
            } => CoreError::Subscription {
                collection,
                reason: message,
            },
            tether_api::Error::SubscriptionClosed => CoreError::ConnectionFailed {
                reason: "subscription closed".into(),
            },
            tether_api::Error::Decode { message, body: _ } => {
                CoreError::Internal(format!("Decode error: {message}"))
            }
        }
    }
}
