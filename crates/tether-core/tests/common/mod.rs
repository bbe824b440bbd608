// Shared test fixtures: an in-memory backend standing in for a real
// client library, plus a small record type.

#![allow(clippy::unwrap_used, dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};

use tether_core::{
    AuthRecord, AuthStore, Backend, Client, ClientConfig, RecordAction, RecordEvent, RecordModel,
    Session, Subscription,
};

// ── Record type ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub role: Option<String>,
}

impl RecordModel for User {
    fn id(&self) -> &str {
        &self.id
    }
}

pub fn user(id: &str, name: &str) -> User {
    User {
        id: id.into(),
        name: name.into(),
        role: None,
    }
}

pub fn event(action: RecordAction, record: serde_json::Value) -> RecordEvent {
    RecordEvent::new(action, record)
}

// ── Auth store double ───────────────────────────────────────────────

pub struct MemoryAuthStore {
    session: Mutex<Option<Session>>,
    changes: broadcast::Sender<()>,
}

impl MemoryAuthStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(16);
        Self {
            session: Mutex::new(None),
            changes,
        }
    }

    pub fn set_session(&self, session: Session) {
        *self.session.lock().unwrap() = Some(session);
        let _ = self.changes.send(());
    }
}

impl AuthStore for MemoryAuthStore {
    fn session(&self) -> Option<Session> {
        self.session.lock().unwrap().clone()
    }

    fn clear(&self) {
        *self.session.lock().unwrap() = None;
        let _ = self.changes.send(());
    }

    fn changes(&self) -> broadcast::Receiver<()> {
        self.changes.subscribe()
    }
}

pub fn auth_record(id: &str) -> AuthRecord {
    AuthRecord {
        id: id.into(),
        email: None,
        verified: false,
        extra: serde_json::Value::Null,
    }
}

pub fn session(id: &str) -> Session {
    Session {
        record: auth_record(id),
        token: secrecy_token(),
    }
}

fn secrecy_token() -> secrecy::SecretString {
    secrecy::SecretString::from("test-token".to_string())
}

// ── Backend double ──────────────────────────────────────────────────

/// In-memory backend: hands out subscriptions keyed by
/// `(collection, topic)` and lets tests push events into them.
pub struct StubBackend {
    auth: Arc<MemoryAuthStore>,
    senders: Mutex<HashMap<(String, String), mpsc::Sender<RecordEvent>>>,
    fail_subscribe: AtomicBool,
}

impl StubBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            auth: Arc::new(MemoryAuthStore::new()),
            senders: Mutex::new(HashMap::new()),
            fail_subscribe: AtomicBool::new(false),
        })
    }

    pub fn auth(&self) -> &Arc<MemoryAuthStore> {
        &self.auth
    }

    /// Make every subsequent subscribe call fail.
    pub fn fail_subscriptions(&self) {
        self.fail_subscribe.store(true, Ordering::SeqCst);
    }

    /// True once a subscription for `(collection, topic)` was opened.
    pub fn has_subscription(&self, collection: &str, topic: &str) -> bool {
        self.senders
            .lock()
            .unwrap()
            .contains_key(&(collection.to_owned(), topic.to_owned()))
    }

    /// True once the mirror side of the subscription has gone away.
    pub fn subscription_closed(&self, collection: &str, topic: &str) -> bool {
        self.senders
            .lock()
            .unwrap()
            .get(&(collection.to_owned(), topic.to_owned()))
            .is_some_and(mpsc::Sender::is_closed)
    }

    /// Push an event into an open subscription.
    pub async fn emit(&self, collection: &str, topic: &str, event: RecordEvent) {
        let sender = self
            .senders
            .lock()
            .unwrap()
            .get(&(collection.to_owned(), topic.to_owned()))
            .cloned()
            .expect("no subscription open for this topic");
        sender.send(event).await.expect("subscription closed");
    }
}

#[async_trait]
impl Backend for StubBackend {
    async fn subscribe(
        &self,
        collection: &str,
        topic: &str,
    ) -> Result<Subscription, tether_api::Error> {
        if self.fail_subscribe.load(Ordering::SeqCst) {
            return Err(tether_api::Error::Subscribe {
                collection: collection.to_owned(),
                message: "stub backend is offline".into(),
            });
        }

        let (tx, sub) = Subscription::channel();
        self.senders
            .lock()
            .unwrap()
            .insert((collection.to_owned(), topic.to_owned()), tx);
        Ok(sub)
    }

    fn auth_store(&self) -> Arc<dyn AuthStore> {
        Arc::clone(&self.auth) as Arc<dyn AuthStore>
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

pub fn test_client(backend: Arc<StubBackend>) -> Client {
    let config = ClientConfig::new("https://backend.test".parse().unwrap());
    Client::new(config, backend)
}

/// Poll until `predicate` holds, failing the test after two seconds.
pub async fn wait_until<F>(mut predicate: F)
where
    F: FnMut() -> bool,
{
    tokio::time::timeout(Duration::from_secs(2), async {
        while !predicate() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached within timeout");
}
