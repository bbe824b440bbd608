//! Subscription handle for a realtime event feed.
//!
//! The backend implementation owns the transport side: it pushes parsed
//! [`RecordEvent`]s into the channel in delivery order and watches the
//! cancellation token to know when to stop. Dropping the handle cancels
//! the token, so an abandoned mirror never leaks a server-side listener.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::record::RecordEvent;

/// Default capacity for a subscription's delivery channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Handle to an open realtime subscription.
///
/// Events arrive strictly in the order the transport delivered them;
/// the bounded channel applies backpressure rather than dropping.
pub struct Subscription {
    events: mpsc::Receiver<RecordEvent>,
    cancel: CancellationToken,
}

impl Subscription {
    /// Wrap a delivery channel and its cancellation token.
    ///
    /// Backend implementations keep the sender and a clone of the token;
    /// when the token fires they must unsubscribe upstream and drop the
    /// sender.
    pub fn new(events: mpsc::Receiver<RecordEvent>, cancel: CancellationToken) -> Self {
        Self { events, cancel }
    }

    /// Create a subscription together with its sender side, using the
    /// default channel capacity.
    ///
    /// Convenience for backend implementations and test doubles; for a
    /// custom capacity, build the channel and call [`new`](Self::new).
    pub fn channel() -> (mpsc::Sender<RecordEvent>, Self) {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        (tx, Self::new(rx, CancellationToken::new()))
    }

    /// Receive the next event. Returns `None` once the backend has
    /// dropped the sender (subscription closed upstream).
    pub async fn recv(&mut self) -> Option<RecordEvent> {
        self.events.recv().await
    }

    /// Signal the backend to stop delivery and unsubscribe.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// The token the backend watches for teardown.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

// ── Tests ───────────────────────────────────────────────────────────
