//! ONLINE record upkeep while users stay connected.

mod helpers;

use std::time::Duration;

use uuid::Uuid;

use chaos_core::config::RealtimeConfig;
use chaos_realtime::message::OutboundMessage;
use chaos_realtime::presence::PresenceStatus;
use chaos_realtime::reconciler::ReconcileOutcome;

use helpers::{SwitchableCache, TestEngine};

fn short_ttl_config(ttl_seconds: u64, refresh_interval_seconds: u64) -> RealtimeConfig {
    let mut config = RealtimeConfig::default();
    config.presence.ttl_seconds = ttl_seconds;
    config.presence.refresh_interval_seconds = refresh_interval_seconds;
    config
}

#[tokio::test]
async fn test_refresher_keeps_connected_user_online_past_ttl() {
    let t = TestEngine::with_config(SwitchableCache::new().manager(), short_ttl_config(2, 1));
    let user = Uuid::new_v4();
    let _client = t.connect(user, "alice").await;
    t.engine.start();

    // Cache TTLs run on the wall clock, so this waits for real.
    tokio::time::sleep(Duration::from_millis(3500)).await;

    let record = t.engine.presence.store().get_status(user).await.unwrap().unwrap();
    assert_eq!(record.status, PresenceStatus::Online);
    let online = t.engine.presence.list_online().await.unwrap();
    assert!(online.iter().any(|r| r.user_id == user));

    t.engine.shutdown().await;
}

#[tokio::test]
async fn test_refresh_restores_record_missed_while_store_was_down() {
    let cache = SwitchableCache::new();
    let t = TestEngine::with_cache(cache.manager());
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
    let mut observer = t.connect(b, "bob").await;
    observer.drain();

    cache.set_available(false);
    let _client = t.connect(a, "alice").await;
    assert!(observer.drain().is_empty());

    cache.set_available(true);
    assert!(t.engine.presence.store().get_status(a).await.unwrap().is_none());
    assert_eq!(t.engine.presence.refresh_local().await, 2);

    let record = t.engine.presence.store().get_status(a).await.unwrap().unwrap();
    assert_eq!(record.status, PresenceStatus::Online);
    let online = t.engine.presence.list_online().await.unwrap();
    assert!(online.iter().any(|r| r.user_id == a));

    match observer.next().await {
        OutboundMessage::UserStatus { user_id, status, .. } => {
            assert_eq!(user_id, a);
            assert_eq!(status, PresenceStatus::Online);
        }
        other => panic!("expected user:status, got {other:?}"),
    }
}

#[tokio::test]
async fn test_refresh_restores_lapsed_record() {
    let t = TestEngine::with_config(SwitchableCache::new().manager(), short_ttl_config(1, 20));
    let user = Uuid::new_v4();
    let _client = t.connect(user, "alice").await;

    tokio::time::sleep(Duration::from_millis(1300)).await;
    assert!(t.engine.presence.store().get_status(user).await.unwrap().is_none());

    assert_eq!(t.engine.presence.refresh_local().await, 1);
    let record = t.engine.presence.store().get_status(user).await.unwrap().unwrap();
    assert_eq!(record.status, PresenceStatus::Online);
}

#[tokio::test]
async fn test_refresh_leaves_explicit_status_alone() {
    let t = TestEngine::with_cache(SwitchableCache::new().manager());
    let user = Uuid::new_v4();
    let _client = t.connect(user, "alice").await;
    t.engine
        .presence
        .update_status(user, PresenceStatus::Away, Some("lunch".into()))
        .await
        .unwrap();

    assert_eq!(t.engine.presence.refresh_local().await, 0);

    let record = t.engine.presence.store().get_status(user).await.unwrap().unwrap();
    assert_eq!(record.status, PresenceStatus::Away);
    assert!(t.engine.presence.list_online().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_disconnect_during_refresh_ends_offline_and_unindexed() {
    let cache = SwitchableCache::new();
    let t = TestEngine::with_cache(cache.manager());
    let user = Uuid::new_v4();
    let client = t.connect(user, "alice").await;

    cache.hold_expire();
    let engine = t.engine.clone();
    let refresh = tokio::spawn(async move { engine.presence.refresh_local().await });
    cache.expire_entered().await;

    let engine = t.engine.clone();
    let conn_id = client.id;
    let disconnect = tokio::spawn(async move { engine.disconnect(conn_id).await });
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!t.engine.registry.is_user_connected(&user));

    cache.release_expire();
    assert_eq!(refresh.await.unwrap(), 1);
    assert_eq!(disconnect.await.unwrap(), ReconcileOutcome::LastConnectionClosed);

    let record = t.engine.presence.store().get_status(user).await.unwrap().unwrap();
    assert_eq!(record.status, PresenceStatus::Offline);
    let online = t.engine.presence.list_online().await.unwrap();
    assert!(online.iter().all(|r| r.user_id != user));
}
