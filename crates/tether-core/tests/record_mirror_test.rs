#![allow(clippy::unwrap_used)]
// Behavioral tests for `RecordMirror` against the in-memory backend stub.

mod common;

use pretty_assertions::assert_eq;
use serde_json::json;

use common::{StubBackend, User, event, test_client, user, wait_until};
use tether_core::{MirrorPhase, RecordAction, RecordHooks};

#[tokio::test]
async fn subscribes_to_the_record_topic_on_first_read() {
    let backend = StubBackend::new();
    let client = test_client(backend.clone());

    let mirror = client
        .record_mirror::<User>("users", "u1", RecordHooks::new())
        .unwrap();

    assert_eq!(mirror.phase(), MirrorPhase::Cold);
    assert!(mirror.record().await.is_none());
    assert_eq!(mirror.phase(), MirrorPhase::Active);
    assert!(backend.has_subscription("users", "u1"));
    assert_eq!(mirror.record_id(), "u1");
}

#[tokio::test]
async fn update_while_empty_is_a_no_op() {
    let backend = StubBackend::new();
    let client = test_client(backend.clone());
    let mirror = client
        .record_mirror::<User>("users", "u1", RecordHooks::new())
        .unwrap();
    mirror.record().await;

    let mut stream = mirror.watch();
    backend
        .emit(
            "users",
            "u1",
            event(RecordAction::Update, json!({ "id": "u1", "name": "X" })),
        )
        .await;

    // Invalidation fires, the state stays empty.
    let snapshot = tokio::time::timeout(std::time::Duration::from_secs(2), stream.changed())
        .await
        .unwrap()
        .unwrap();
    assert!(snapshot.is_none());
}

#[tokio::test]
async fn create_always_replaces() {
    let backend = StubBackend::new();
    let client = test_client(backend.clone());
    let mirror = client
        .record_mirror::<User>("users", "u1", RecordHooks::new())
        .unwrap();
    mirror.record().await;

    backend
        .emit(
            "users",
            "u1",
            event(RecordAction::Create, json!({ "id": "u1", "name": "First" })),
        )
        .await;
    wait_until(|| mirror.latest().is_some()).await;

    backend
        .emit(
            "users",
            "u1",
            event(
                RecordAction::Create,
                json!({ "id": "u1", "name": "Second", "role": "admin" }),
            ),
        )
        .await;
    wait_until(|| mirror.latest().map(|u| u.name) == Some("Second".into())).await;
    assert_eq!(
        mirror.latest(),
        Some(User {
            id: "u1".into(),
            name: "Second".into(),
            role: Some("admin".into()),
        })
    );
}

#[tokio::test]
async fn update_merges_into_existing_record() {
    let backend = StubBackend::new();
    let client = test_client(backend.clone());
    let mirror = client
        .record_mirror::<User>("users", "u1", RecordHooks::new())
        .unwrap();
    mirror.record().await;

    backend
        .emit(
            "users",
            "u1",
            event(
                RecordAction::Create,
                json!({ "id": "u1", "name": "Ada", "role": "admin" }),
            ),
        )
        .await;
    wait_until(|| mirror.latest().is_some()).await;

    // Partial payload: only `name` changes, `role` survives.
    backend
        .emit(
            "users",
            "u1",
            event(RecordAction::Update, json!({ "id": "u1", "name": "Lovelace" })),
        )
        .await;
    wait_until(|| mirror.latest().map(|u| u.name) == Some("Lovelace".into())).await;
    assert_eq!(
        mirror.latest().and_then(|u| u.role),
        Some("admin".to_string())
    );
}

#[tokio::test]
async fn delete_always_clears() {
    let backend = StubBackend::new();
    let client = test_client(backend.clone());
    let mirror = client
        .record_mirror::<User>("users", "u1", RecordHooks::new())
        .unwrap();
    mirror.record().await;

    backend
        .emit(
            "users",
            "u1",
            event(RecordAction::Create, json!({ "id": "u1", "name": "Ada" })),
        )
        .await;
    wait_until(|| mirror.latest().is_some()).await;

    backend
        .emit(
            "users",
            "u1",
            event(RecordAction::Delete, json!({ "id": "u1", "name": "Ada" })),
        )
        .await;
    wait_until(|| mirror.latest().is_none()).await;
    assert!(mirror.last_event().is_some());
}

#[tokio::test]
async fn on_init_seeds_the_mirror() {
    let backend = StubBackend::new();
    let client = test_client(backend.clone());

    let hooks = RecordHooks::new()
        .on_init(|collection| async move {
            assert_eq!(collection.name(), "users");
            Ok(Some(user("u1", "Seeded")))
        });
    let mirror = client.record_mirror::<User>("users", "u1", hooks).unwrap();

    assert_eq!(mirror.record().await, Some(user("u1", "Seeded")));
    assert!(backend.has_subscription("users", "u1"));
}

#[tokio::test]
async fn delete_hook_runs_before_clear() {
    let backend = StubBackend::new();
    let client = test_client(backend.clone());

    let (observed_tx, mut observed_rx) = tokio::sync::mpsc::unbounded_channel::<String>();
    let hooks = RecordHooks::new().on_delete(move |record: User| {
        let observed_tx = observed_tx.clone();
        async move {
            observed_tx.send(record.id).expect("receiver alive");
            Ok(())
        }
    });
    let mirror = client.record_mirror::<User>("users", "u1", hooks).unwrap();
    mirror.record().await;

    backend
        .emit(
            "users",
            "u1",
            event(RecordAction::Create, json!({ "id": "u1", "name": "Ada" })),
        )
        .await;
    wait_until(|| mirror.latest().is_some()).await;

    backend
        .emit(
            "users",
            "u1",
            event(RecordAction::Delete, json!({ "id": "u1", "name": "Ada" })),
        )
        .await;
    wait_until(|| mirror.latest().is_none()).await;
    assert_eq!(observed_rx.try_recv().ok().as_deref(), Some("u1"));
}

#[tokio::test]
async fn dropping_the_mirror_closes_the_subscription() {
    let backend = StubBackend::new();
    let client = test_client(backend.clone());
    let mirror = client
        .record_mirror::<User>("users", "u1", RecordHooks::new())
        .unwrap();
    mirror.record().await;
    assert!(backend.has_subscription("users", "u1"));

    drop(mirror);
    wait_until(|| backend.subscription_closed("users", "u1")).await;
}
