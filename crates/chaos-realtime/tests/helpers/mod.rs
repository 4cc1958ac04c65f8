//! Shared helpers for engine integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Notify, Semaphore, mpsc};
use uuid::Uuid;

use chaos_auth::{JwtDecoder, JwtEncoder};
use chaos_cache::CacheManager;
use chaos_cache::memory::MemoryCacheProvider;
use chaos_core::config::{AuthConfig, CacheConfig, MemoryCacheConfig, RealtimeConfig};
use chaos_core::error::AppError;
use chaos_core::result::AppResult;
use chaos_core::traits::CacheProvider;
use chaos_realtime::RealtimeEngine;
use chaos_realtime::connection::ConnectionId;
use chaos_realtime::message::OutboundMessage;

/// An engine wired to a real JWT decoder and the given cache.
pub struct TestEngine {
    pub engine: RealtimeEngine,
    pub encoder: JwtEncoder,
}

impl TestEngine {
    /// Engine over the in-memory cache.
    pub async fn new() -> Self {
        let cache = CacheManager::new(&CacheConfig::default())
            .await
            .expect("memory cache");
        Self::with_cache(Arc::new(cache))
    }

    /// Engine over an arbitrary cache.
    pub fn with_cache(cache: Arc<CacheManager>) -> Self {
        Self::with_config(cache, RealtimeConfig::default())
    }

    /// Engine over an arbitrary cache and engine configuration.
    pub fn with_config(cache: Arc<CacheManager>, config: RealtimeConfig) -> Self {
        let auth = AuthConfig::default();
        let decoder = Arc::new(JwtDecoder::new(&auth, cache.clone()));
        let engine = RealtimeEngine::new(config, cache, decoder);
        Self {
            engine,
            encoder: JwtEncoder::new(&auth),
        }
    }

    /// A valid access token for the user.
    pub fn token_for(&self, user_id: Uuid, username: &str) -> String {
        self.encoder
            .generate_access_token(user_id, username)
            .expect("token")
            .0
    }

    /// Authenticate and register a connection for the user.
    pub async fn connect(&self, user_id: Uuid, username: &str) -> TestClient {
        let token = self.token_for(user_id, username);
        let auth = self
            .engine
            .authenticate(Some(&token))
            .await
            .expect("token accepted");
        let (handle, rx) = self.engine.connect(auth).await;
        TestClient {
            id: handle.id,
            user_id,
            rx,
        }
    }
}

/// The test side of one connection.
pub struct TestClient {
    pub id: ConnectionId,
    pub user_id: Uuid,
    pub rx: mpsc::Receiver<OutboundMessage>,
}

impl TestClient {
    /// Feed a JSON frame to the engine as if it came from this connection.
    pub async fn send(&self, engine: &RealtimeEngine, frame: serde_json::Value) {
        engine.handle_text(self.id, &frame.to_string()).await;
    }

    /// Everything queued for this connection so far.
    pub fn drain(&mut self) -> Vec<OutboundMessage> {
        let mut out = Vec::new();
        while let Ok(msg) = self.rx.try_recv() {
            out.push(msg);
        }
        out
    }

    /// Event names queued for this connection so far.
    pub fn events(&mut self) -> Vec<&'static str> {
        self.drain().iter().map(|m| m.event_name()).collect()
    }

    /// Wait for the next message, failing the test after one second.
    pub async fn next(&mut self) -> OutboundMessage {
        tokio::time::timeout(Duration::from_secs(1), self.rx.recv())
            .await
            .expect("message within timeout")
            .expect("channel open")
    }
}

/// A cache whose every operation fails, standing in for an unreachable store.
#[derive(Debug)]
pub struct FailingCache;

fn down() -> AppError {
    AppError::cache("connection refused")
}

#[async_trait]
impl CacheProvider for FailingCache {
    async fn get(&self, _key: &str) -> AppResult<Option<String>> {
        Err(down())
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> AppResult<()> {
        Err(down())
    }

    async fn expire(&self, _key: &str, _ttl: Duration) -> AppResult<bool> {
        Err(down())
    }

    async fn set_add(&self, _key: &str, _member: &str) -> AppResult<bool> {
        Err(down())
    }

    async fn set_remove(&self, _key: &str, _member: &str) -> AppResult<bool> {
        Err(down())
    }

    async fn set_members(&self, _key: &str) -> AppResult<Vec<String>> {
        Err(down())
    }

    async fn health_check(&self) -> AppResult<bool> {
        Err(down())
    }
}

/// An in-memory cache that can be taken down and brought back, and can
/// park `expire` calls until released.
#[derive(Debug)]
pub struct SwitchableCache {
    inner: MemoryCacheProvider,
    available: AtomicBool,
    hold_expire: AtomicBool,
    expire_entered: Notify,
    expire_release: Semaphore,
}

impl SwitchableCache {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryCacheProvider::new(&MemoryCacheConfig::default()),
            available: AtomicBool::new(true),
            hold_expire: AtomicBool::new(false),
            expire_entered: Notify::new(),
            expire_release: Semaphore::new(0),
        })
    }

    /// A cache manager over this cache.
    pub fn manager(self: &Arc<Self>) -> Arc<CacheManager> {
        Arc::new(CacheManager::from_provider(self.clone()))
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Park every `expire` call until [`Self::release_expire`].
    pub fn hold_expire(&self) {
        self.hold_expire.store(true, Ordering::SeqCst);
    }

    /// Resolves once an `expire` call is parked.
    pub async fn expire_entered(&self) {
        self.expire_entered.notified().await;
    }

    pub fn release_expire(&self) {
        self.hold_expire.store(false, Ordering::SeqCst);
        self.expire_release.add_permits(1);
    }

    fn check(&self) -> AppResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(down())
        }
    }
}

#[async_trait]
impl CacheProvider for SwitchableCache {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        self.check()?;
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()> {
        self.check()?;
        self.inner.set(key, value, ttl).await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> AppResult<bool> {
        self.check()?;
        if self.hold_expire.load(Ordering::SeqCst) {
            self.expire_entered.notify_one();
            if let Ok(permit) = self.expire_release.acquire().await {
                permit.forget();
            }
        }
        self.inner.expire(key, ttl).await
    }

    async fn set_add(&self, key: &str, member: &str) -> AppResult<bool> {
        self.check()?;
        self.inner.set_add(key, member).await
    }

    async fn set_remove(&self, key: &str, member: &str) -> AppResult<bool> {
        self.check()?;
        self.inner.set_remove(key, member).await
    }

    async fn set_members(&self, key: &str) -> AppResult<Vec<String>> {
        self.check()?;
        self.inner.set_members(key).await
    }

    async fn health_check(&self) -> AppResult<bool> {
        self.check()?;
        Ok(true)
    }
}
