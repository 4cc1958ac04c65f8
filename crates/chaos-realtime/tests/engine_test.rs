//! End-to-end engine scenarios over the in-memory cache.

mod helpers;

use serde_json::json;
use uuid::Uuid;

use chaos_core::error::ErrorKind;
use chaos_realtime::message::OutboundMessage;
use chaos_realtime::presence::PresenceStatus;
use chaos_realtime::reconciler::ReconcileOutcome;

use helpers::TestEngine;

#[tokio::test]
async fn test_direct_message_reaches_every_device_then_user_goes_offline() {
    let t = TestEngine::new().await;
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
    let mut c1 = t.connect(a, "alice").await;
    let mut c2 = t.connect(a, "alice").await;
    let mut cb = t.connect(b, "bob").await;
    c1.drain();
    c2.drain();
    cb.drain();

    cb.send(
        &t.engine,
        json!({"event": "message:direct", "data": {"recipientId": a, "content": "hi", "type": "text", "tempId": "t-1"}}),
    )
    .await;

    for client in [&mut c1, &mut c2] {
        match client.next().await {
            OutboundMessage::MessageDirect { content, sender_id, .. } => {
                assert_eq!(content, "hi");
                assert_eq!(sender_id, b);
            }
            other => panic!("expected message:direct, got {other:?}"),
        }
    }
    match cb.next().await {
        OutboundMessage::MessageSent { temp_id, .. } => assert_eq!(temp_id.as_deref(), Some("t-1")),
        other => panic!("expected message:sent, got {other:?}"),
    }
    assert!(cb.drain().is_empty());

    assert_eq!(t.engine.disconnect(c1.id).await, ReconcileOutcome::ConnectionsRemain);
    let record = t.engine.presence.store().get_status(a).await.unwrap().unwrap();
    assert_eq!(record.status, PresenceStatus::Online);
    assert!(cb.drain().is_empty());

    assert_eq!(t.engine.disconnect(c2.id).await, ReconcileOutcome::LastConnectionClosed);
    let record = t.engine.presence.store().get_status(a).await.unwrap().unwrap();
    assert_eq!(record.status, PresenceStatus::Offline);
    assert!(!t.engine.registry.is_user_connected(&a));

    let online = t.engine.presence.list_online().await.unwrap();
    assert!(online.iter().all(|r| r.user_id != a));
    assert!(online.iter().any(|r| r.user_id == b));

    match cb.next().await {
        OutboundMessage::UserStatus { user_id, status, .. } => {
            assert_eq!(user_id, a);
            assert_eq!(status, PresenceStatus::Offline);
        }
        other => panic!("expected user:status, got {other:?}"),
    }
}

#[tokio::test]
async fn test_first_connection_announces_online_to_others() {
    let t = TestEngine::new().await;
    let mut bob = t.connect(Uuid::new_v4(), "bob").await;
    let alice_id = Uuid::new_v4();
    let mut alice = t.connect(alice_id, "alice").await;

    match bob.next().await {
        OutboundMessage::UserStatus { user_id, status, .. } => {
            assert_eq!(user_id, alice_id);
            assert_eq!(status, PresenceStatus::Online);
        }
        other => panic!("expected user:status, got {other:?}"),
    }
    // Nobody announces a user to themselves.
    assert!(alice.drain().is_empty());

    // A second device is not a presence change.
    let _alice2 = t.connect(alice_id, "alice").await;
    assert!(bob.drain().is_empty());
}

#[tokio::test]
async fn test_channel_message_fanout_excludes_sender_and_outsiders() {
    let t = TestEngine::new().await;
    let room = Uuid::new_v4();
    let alice_id = Uuid::new_v4();
    let mut a1 = t.connect(alice_id, "alice").await;
    let mut a2 = t.connect(alice_id, "alice").await;
    let mut bob = t.connect(Uuid::new_v4(), "bob").await;
    let mut carol = t.connect(Uuid::new_v4(), "carol").await;

    a1.send(&t.engine, json!({"event": "channel:join", "data": {"roomId": room}})).await;
    assert_eq!(a1.events().last(), Some(&"channel:joined"));

    a2.send(&t.engine, json!({"event": "channel:join", "data": {"roomId": room}})).await;
    bob.send(&t.engine, json!({"event": "channel:join", "data": {"roomId": room}})).await;
    for c in [&mut a1, &mut a2, &mut bob, &mut carol] {
        c.drain();
    }

    a1.send(
        &t.engine,
        json!({"event": "message:channel", "data": {"channelId": room, "content": "standup?", "type": "text", "tempId": "x"}}),
    )
    .await;

    assert_eq!(a1.events(), vec!["message:sent"]);
    assert_eq!(a2.events(), vec!["message:channel"]);
    assert_eq!(bob.events(), vec!["message:channel"]);
    assert!(carol.events().is_empty());
}

#[tokio::test]
async fn test_join_and_leave_notify_members() {
    let t = TestEngine::new().await;
    let room = Uuid::new_v4();
    let mut alice = t.connect(Uuid::new_v4(), "alice").await;
    let bob_id = Uuid::new_v4();
    let mut bob = t.connect(bob_id, "bob").await;

    alice.send(&t.engine, json!({"event": "channel:join", "data": {"roomId": room}})).await;
    alice.drain();
    bob.drain();

    bob.send(&t.engine, json!({"event": "channel:join", "data": {"roomId": room}})).await;
    assert_eq!(bob.events(), vec!["channel:joined"]);
    match alice.next().await {
        OutboundMessage::ChannelUserJoined { user_id, username, room_id } => {
            assert_eq!(user_id, bob_id);
            assert_eq!(username, "bob");
            assert_eq!(room_id, room);
        }
        other => panic!("expected channel:user_joined, got {other:?}"),
    }

    bob.send(&t.engine, json!({"event": "channel:leave", "data": {"roomId": room}})).await;
    assert_eq!(alice.events(), vec!["channel:user_left"]);
    assert!(t.engine.router.rooms_of(bob.id).is_empty());
}

#[tokio::test]
async fn test_invisible_never_broadcasts() {
    let t = TestEngine::new().await;
    let alice_id = Uuid::new_v4();
    let alice = t.connect(alice_id, "alice").await;
    let mut bob = t.connect(Uuid::new_v4(), "bob").await;
    bob.drain();

    alice
        .send(&t.engine, json!({"event": "user:status", "data": {"status": "INVISIBLE"}}))
        .await;
    assert!(bob.drain().is_empty());
    let online = t.engine.presence.list_online().await.unwrap();
    assert!(online.iter().all(|r| r.user_id != alice_id));

    let seen = t.engine.presence.visible_status(alice_id).await.unwrap().unwrap();
    assert_eq!(seen.status, PresenceStatus::Offline);

    // Leaving while invisible is silent too, and reconnecting stays invisible.
    t.engine.disconnect(alice.id).await;
    assert!(bob.drain().is_empty());
    let _alice = t.connect(alice_id, "alice").await;
    assert!(bob.drain().is_empty());
    let stored = t.engine.presence.store().get_status(alice_id).await.unwrap().unwrap();
    assert_eq!(stored.status, PresenceStatus::Invisible);
}

#[tokio::test]
async fn test_leaving_after_explicit_offline_is_not_announced_twice() {
    let t = TestEngine::new().await;
    let alice_id = Uuid::new_v4();
    let alice = t.connect(alice_id, "alice").await;
    let mut bob = t.connect(Uuid::new_v4(), "bob").await;
    bob.drain();

    alice
        .send(&t.engine, json!({"event": "user:status", "data": {"status": "OFFLINE"}}))
        .await;
    match bob.next().await {
        OutboundMessage::UserStatus { user_id, status, .. } => {
            assert_eq!(user_id, alice_id);
            assert_eq!(status, PresenceStatus::Offline);
        }
        other => panic!("expected user:status, got {other:?}"),
    }

    assert_eq!(t.engine.disconnect(alice.id).await, ReconcileOutcome::LastConnectionClosed);
    assert!(bob.drain().is_empty());
    let stored = t.engine.presence.store().get_status(alice_id).await.unwrap().unwrap();
    assert_eq!(stored.status, PresenceStatus::Offline);
}

#[tokio::test]
async fn test_visible_status_changes_broadcast() {
    let t = TestEngine::new().await;
    let alice_id = Uuid::new_v4();
    let alice = t.connect(alice_id, "alice").await;
    let mut bob = t.connect(Uuid::new_v4(), "bob").await;
    bob.drain();

    for status in ["AWAY", "BUSY", "ONLINE", "OFFLINE"] {
        alice
            .send(
                &t.engine,
                json!({"event": "user:status", "data": {"status": status, "statusMessage": "brb"}}),
            )
            .await;
        match bob.next().await {
            OutboundMessage::UserStatus { user_id, status: got, status_message, .. } => {
                assert_eq!(user_id, alice_id);
                assert_eq!(got.as_str(), status);
                assert_eq!(status_message.as_deref(), Some("brb"));
            }
            other => panic!("expected user:status, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_invalid_events_are_answered_and_connection_survives() {
    let t = TestEngine::new().await;
    let mut alice = t.connect(Uuid::new_v4(), "alice").await;
    let bob_id = Uuid::new_v4();
    let mut bob = t.connect(bob_id, "bob").await;
    alice.drain();
    bob.drain();

    let long = "x".repeat(4001);
    alice
        .send(
            &t.engine,
            json!({"event": "message:direct", "data": {"recipientId": bob_id, "content": long, "type": "text", "tempId": "big"}}),
        )
        .await;
    match alice.next().await {
        OutboundMessage::MessageError { temp_id, code, .. } => {
            assert_eq!(temp_id.as_deref(), Some("big"));
            assert_eq!(code, ErrorKind::Validation.code());
        }
        other => panic!("expected message:error, got {other:?}"),
    }
    assert!(bob.drain().is_empty());

    t.engine.handle_text(alice.id, "{definitely not json").await;
    assert_eq!(alice.events(), vec!["error"]);

    alice
        .send(
            &t.engine,
            json!({"event": "typing:start", "data": {"recipientId": bob_id, "roomId": Uuid::new_v4()}}),
        )
        .await;
    assert_eq!(alice.events(), vec!["error"]);

    let status_message = "s".repeat(129);
    alice
        .send(
            &t.engine,
            json!({"event": "user:status", "data": {"status": "AWAY", "statusMessage": status_message}}),
        )
        .await;
    assert_eq!(alice.events(), vec!["error"]);
    assert!(bob.drain().is_empty());

    alice
        .send(
            &t.engine,
            json!({"event": "message:direct", "data": {"recipientId": bob_id, "content": "still here", "type": "text"}}),
        )
        .await;
    assert_eq!(alice.events(), vec!["message:sent"]);
    assert_eq!(bob.events(), vec!["message:direct"]);
    assert!(t.engine.metrics.snapshot().events_rejected >= 4);
}

#[tokio::test]
async fn test_typing_start_is_debounced_and_stop_is_sent_once() {
    let t = TestEngine::new().await;
    let alice_id = Uuid::new_v4();
    let bob_id = Uuid::new_v4();
    let alice = t.connect(alice_id, "alice").await;
    let mut bob = t.connect(bob_id, "bob").await;
    bob.drain();

    let start = json!({"event": "typing:start", "data": {"recipientId": bob_id}});
    alice.send(&t.engine, start.clone()).await;
    alice.send(&t.engine, start).await;
    alice
        .send(&t.engine, json!({"event": "typing:stop", "data": {"recipientId": bob_id}}))
        .await;
    alice
        .send(&t.engine, json!({"event": "typing:stop", "data": {"recipientId": bob_id}}))
        .await;

    assert_eq!(bob.events(), vec!["typing:start", "typing:stop"]);
}

#[tokio::test]
async fn test_disconnect_leaves_rooms_and_clears_typing() {
    let t = TestEngine::new().await;
    let room = Uuid::new_v4();
    let alice_id = Uuid::new_v4();
    let alice = t.connect(alice_id, "alice").await;
    let mut bob = t.connect(Uuid::new_v4(), "bob").await;

    alice.send(&t.engine, json!({"event": "channel:join", "data": {"roomId": room}})).await;
    bob.send(&t.engine, json!({"event": "channel:join", "data": {"roomId": room}})).await;
    alice
        .send(&t.engine, json!({"event": "typing:start", "data": {"roomId": room}}))
        .await;
    bob.drain();

    assert_eq!(t.engine.disconnect(alice.id).await, ReconcileOutcome::LastConnectionClosed);

    assert_eq!(
        bob.events(),
        vec!["channel:user_left", "typing:stop", "user:status"]
    );
    assert_eq!(t.engine.router.members_of(&room), vec![bob.id]);
    assert_eq!(t.engine.typing.active_count(), 0);

    // Reconciling again changes nothing.
    assert_eq!(t.engine.disconnect(alice.id).await, ReconcileOutcome::Unknown);
    assert!(bob.drain().is_empty());
}

#[tokio::test]
async fn test_rejected_token_creates_no_state() {
    let t = TestEngine::new().await;

    for token in [None, Some(""), Some("not-a-jwt")] {
        let err = t.engine.authenticate(token).await.unwrap_err();
        assert!(err.is(ErrorKind::Authentication));
    }
    assert_eq!(t.engine.registry.connection_count(), 0);
    assert!(t.engine.presence.list_online().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_shutdown_closes_every_connection() {
    let t = TestEngine::new().await;
    t.engine.start();
    let alice = t.connect(Uuid::new_v4(), "alice").await;
    let handle = t.engine.registry.get(&alice.id).unwrap();

    t.engine.shutdown().await;

    assert!(t.engine.is_shutting_down());
    assert!(!handle.is_alive());
    handle.closed().await;

    t.engine.disconnect(alice.id).await;
    assert!(t.engine.wait_for_drain(std::time::Duration::from_secs(1)).await);
}
