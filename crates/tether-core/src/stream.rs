// ── Reactive mirror streams ──
//
// Subscription types for consuming mirror changes.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

/// A subscription to a mirror's state.
///
/// Provides both point-in-time snapshot access and reactive change
/// notification via the `changed()` method or by converting to a `Stream`.
pub struct MirrorStream<S: Clone + Send + Sync + 'static> {
    current: S,
    receiver: watch::Receiver<S>,
}

impl<S: Clone + Send + Sync + 'static> MirrorStream<S> {
    pub(crate) fn new(receiver: watch::Receiver<S>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// Get the snapshot captured at creation time.
    pub fn current(&self) -> &S {
        &self.current
    }

    /// Get the latest snapshot (may have changed since creation).
    pub fn latest(&self) -> S {
        self.receiver.borrow().clone()
    }

    /// Wait for the next change, returning the new snapshot.
    /// Returns `None` if the sender (the mirror) has been dropped.
    pub async fn changed(&mut self) -> Option<S> {
        self.receiver.changed().await.ok()?;
        let snap = self.receiver.borrow_and_update().clone();
        self.current = snap.clone();
        Some(snap)
    }

    /// Convert into a `Stream` for use with `StreamExt` combinators.
    pub fn into_stream(self) -> MirrorWatchStream<S> {
        MirrorWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter backed by a `watch::Receiver`.
///
/// Yields a new snapshot each time the underlying mirror is mutated.
pub struct MirrorWatchStream<S: Clone + Send + Sync + 'static> {
    inner: WatchStream<S>,
}

impl<S: Clone + Send + Sync + 'static> Stream for MirrorWatchStream<S> {
    type Item = S;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        // WatchStream is Unpin when the inner type is Unpin, and every
        // snapshot type we vend is Unpin.
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
