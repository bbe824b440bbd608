// Auth store contract
//
// The concrete client library owns authentication: login flows, token
// refresh, persistence. This trait is the read-and-clear surface the
// reactive layer binds to.

use tokio::sync::broadcast;

use crate::record::{AuthRecord, Session};

/// The backend client's module tracking the current authenticated session.
///
/// Implementations must send one unit on the [`changes`](Self::changes)
/// feed after *every* mutation of the stored session — both when a new
/// session is stored and when [`clear`](Self::clear) empties it. The
/// reactive layer re-reads [`record`](Self::record) on each notification,
/// so a missed send means a stale identity observable.
pub trait AuthStore: Send + Sync + 'static {
    /// The current session (principal + token), or `None` when logged out.
    fn session(&self) -> Option<Session>;

    /// The currently authenticated principal, or `None` when logged out.
    fn record(&self) -> Option<AuthRecord> {
        self.session().map(|s| s.record)
    }

    /// Drop the stored session. Must fire a change notification.
    fn clear(&self);

    /// Subscribe to change notifications. Each mutation of the store
    /// produces exactly one unit on this feed.
    fn changes(&self) -> broadcast::Receiver<()>;
}
