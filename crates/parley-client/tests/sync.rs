mod common;

use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use common::{chat_of, member, t0, Harness};
use parley_client::{ClientError, RemoteError};
use parley_shared::{Chat, ChatDelta, ChatListDelta, ChatMetadata, Message, RuleSet};
use parley_store::{ChatStore, Database};

fn created(chat: &Chat, at: DateTime<Utc>) -> ChatDelta {
    ChatDelta::Created {
        chat_id: chat.id,
        metadata: ChatMetadata::from_chat(chat),
        initial_messages: chat.messages.clone(),
        timestamp: at,
    }
}

fn updated(chat: &Chat, add: Vec<Message>, at: DateTime<Utc>) -> ChatDelta {
    ChatDelta::Updated {
        chat_id: chat.id,
        metadata: ChatMetadata::from_chat(chat),
        messages_to_add: add,
        messages_to_delete: Vec::new(),
        timestamp: at,
    }
}

fn batch(
    changes: Vec<ChatDelta>,
    from: Option<DateTime<Utc>>,
    to: DateTime<Utc>,
    more: bool,
) -> ChatListDelta {
    ChatListDelta {
        changes,
        from_timestamp: from,
        to_timestamp: to,
        has_more_changes: more,
    }
}

#[tokio::test]
async fn sync_once_applies_pages_and_advances_checkpoint() {
    let h = Harness::new();
    let alice = member("alice");
    let a = chat_of("a", &[&alice], RuleSet::default());
    let b = chat_of("b", &[&alice], RuleSet::default());
    let t1 = t0() + Duration::seconds(1);
    let t2 = t0() + Duration::seconds(2);

    h.remote.push_deltas(vec![
        batch(vec![created(&a, t1)], None, t1, true),
        batch(vec![created(&b, t2)], Some(t1), t2, false),
    ]);

    let outcome = h.coordinator.sync_once().await.unwrap();

    assert_eq!(outcome.batches, 2);
    assert!(!outcome.has_more_changes);
    assert_eq!(outcome.checkpoint, Some(t2));
    assert_eq!(h.store().checkpoint(), Some(t2));
    assert_eq!(h.store().snapshot().len(), 2);

    h.coordinator.sync_once().await.unwrap();
    assert_eq!(h.remote.since_calls(), vec![None, Some(t2)]);
}

#[tokio::test]
async fn full_resync_drops_chats_the_remote_no_longer_has() {
    let h = Harness::new();
    let alice = member("alice");
    let keep = h.seed(chat_of("keep", &[&alice], RuleSet::default())).await;
    let stale = h.seed(chat_of("stale", &[&alice], RuleSet::default())).await;

    h.remote
        .push_deltas(vec![batch(vec![created(&keep, t0())], None, t0(), false)]);
    h.coordinator.sync_once().await.unwrap();

    let snapshot = h.store().snapshot();
    assert!(snapshot.contains_key(&keep.id));
    assert!(!snapshot.contains_key(&stale.id));
}

#[tokio::test]
async fn unknown_chat_forces_full_resync() {
    let h = Harness::new();
    let alice = member("alice");
    let known = chat_of("known", &[&alice], RuleSet::default());
    let unknown = chat_of("unknown", &[&alice], RuleSet::default());
    let t1 = t0() + Duration::seconds(1);
    let t2 = t0() + Duration::seconds(2);

    h.remote
        .push_deltas(vec![batch(vec![created(&known, t1)], None, t1, false)]);
    h.coordinator.sync_once().await.unwrap();
    assert_eq!(h.store().checkpoint(), Some(t1));

    let note = Message::new(alice.clone(), unknown.id, "hi", t2);
    h.remote.push_deltas(vec![batch(
        vec![updated(&unknown, vec![note], t2)],
        Some(t1),
        t2,
        false,
    )]);
    let err = h.coordinator.sync_once().await.unwrap_err();

    match err {
        ClientError::Sync(e) => {
            assert!(e.needs_resync());
            assert_eq!(e.index, Some(0));
            assert_eq!(e.committed_up_to, Some(t1));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(h.store().checkpoint(), None);
    assert!(h.store().chat(known.id).is_some());

    h.remote.push_deltas(vec![batch(
        vec![created(&known, t2), created(&unknown, t2)],
        None,
        t2,
        false,
    )]);
    h.coordinator.sync_once().await.unwrap();

    assert_eq!(h.remote.since_calls(), vec![None, Some(t1), None]);
    assert_eq!(h.store().snapshot().len(), 2);
    assert_eq!(h.store().checkpoint(), Some(t2));
}

#[tokio::test]
async fn remote_failure_keeps_applied_batches() {
    let h = Harness::new();
    let alice = member("alice");
    let a = chat_of("a", &[&alice], RuleSet::default());
    let t1 = t0() + Duration::seconds(1);

    h.remote.push_deltas_then_fail(
        vec![batch(vec![created(&a, t1)], None, t1, true)],
        Some(RemoteError::ServerUnreachable),
    );

    let err = h.coordinator.sync_once().await.unwrap_err();

    assert!(matches!(err, ClientError::Remote(RemoteError::ServerUnreachable)));
    assert!(h.store().chat(a.id).is_some());
    assert_eq!(h.store().checkpoint(), Some(t1));
}

#[tokio::test]
async fn updates_merge_into_known_chats() {
    let h = Harness::new();
    let alice = member("alice");
    let mut chat = chat_of("general", &[&alice], RuleSet::default());
    let t1 = t0() + Duration::seconds(1);
    let t2 = t0() + Duration::seconds(2);

    h.remote.push_deltas(vec![batch(vec![created(&chat, t1)], None, t1, false)]);
    h.coordinator.sync_once().await.unwrap();

    chat.name = "renamed".into();
    let note = Message::new(alice.clone(), chat.id, "hello", t2);
    h.remote.push_deltas(vec![batch(
        vec![updated(&chat, vec![note.clone()], t2)],
        Some(t1),
        t2,
        false,
    )]);
    h.coordinator.sync_once().await.unwrap();

    let stored = h.store().chat(chat.id).unwrap();
    assert_eq!(stored.name, "renamed");
    assert_eq!(stored.message(note.id).unwrap().text, "hello");
}

#[tokio::test]
async fn sync_loop_runs_until_shutdown() {
    let h = Harness::new();
    let alice = member("alice");
    let a = chat_of("a", &[&alice], RuleSet::default());
    let t1 = t0() + Duration::seconds(1);

    h.remote.push_deltas(vec![batch(vec![created(&a, t1)], None, t1, false)]);
    let mut checkpoint = h.store().subscribe_checkpoint();

    let handle = h.coordinator.spawn_sync_loop();

    tokio::time::timeout(
        StdDuration::from_secs(2),
        checkpoint.wait_for(|c| *c == Some(t1)),
    )
    .await
    .unwrap()
    .unwrap();
    assert!(h.store().chat(a.id).is_some());

    handle.sync_now();
    tokio::time::timeout(StdDuration::from_secs(2), handle.shutdown())
        .await
        .unwrap();

    assert!(h.remote.since_calls().len() >= 1);
    assert!(!*h.coordinator.is_syncing().borrow());
}

#[tokio::test]
async fn shutdown_does_not_wait_for_an_open_delta_stream() {
    let h = Harness::new();
    let alice = member("alice");
    let a = chat_of("a", &[&alice], RuleSet::default());
    let t1 = t0() + Duration::seconds(1);

    h.remote
        .push_deltas_then_hang(vec![batch(vec![created(&a, t1)], None, t1, true)]);
    let mut checkpoint = h.store().subscribe_checkpoint();

    let handle = h.coordinator.spawn_sync_loop();
    tokio::time::timeout(
        StdDuration::from_secs(2),
        checkpoint.wait_for(|c| *c == Some(t1)),
    )
    .await
    .unwrap()
    .unwrap();

    handle.sync_now();
    tokio::time::timeout(StdDuration::from_secs(2), handle.shutdown())
        .await
        .expect("shutdown blocked on the open delta stream");

    assert_eq!(h.remote.since_calls(), vec![None]);
    assert!(h.store().chat(a.id).is_some());
    assert!(!*h.coordinator.is_syncing().borrow());
}

#[tokio::test]
async fn synced_state_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("client.db");
    let alice = member("alice");
    let mut chat = chat_of("durable", &[&alice], RuleSet::default());
    chat.messages.push(Message::new(alice.clone(), chat.id, "kept", t0()));

    {
        let store = ChatStore::open(Database::open_at(&path).unwrap()).unwrap();
        let h = Harness::with_store(store);
        h.remote
            .push_deltas(vec![batch(vec![created(&chat, t0())], None, t0(), false)]);
        h.coordinator.sync_once().await.unwrap();
    }

    let store = ChatStore::open(Database::open_at(&path).unwrap()).unwrap();
    let h = Harness::with_store(store);
    assert_eq!(h.store().checkpoint(), Some(t0()));
    let page = h.coordinator.messages(chat.id, 0, None).unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].text, "kept");

    h.coordinator.sync_once().await.unwrap();
    assert_eq!(h.remote.since_calls(), vec![Some(t0())]);
}
