//! Presence tracker: status transitions on connect, disconnect and explicit
//! status changes, plus the broadcasts that go with them.

use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use chaos_core::result::AppResult;

use super::record::PresenceRecord;
use super::status::PresenceStatus;
use super::store::{PresenceStore, RefreshOutcome};
use crate::connection::registry::ConnectionRegistry;
use crate::room::router::{Exclude, RoomRouter};

/// Applies presence transitions and broadcasts them to other users.
///
/// Transitions for one user are serialized, and connect/disconnect
/// transitions re-check the registry once they hold the user's lock, so a
/// fast reconnect can never leave a connected user stored as OFFLINE.
#[derive(Debug)]
pub struct PresenceTracker {
    /// Shared presence storage.
    store: PresenceStore,
    /// Live connections in this process.
    registry: Arc<ConnectionRegistry>,
    /// Fan-out for `user:status` events.
    router: Arc<RoomRouter>,
    /// Per-user transition locks.
    locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl PresenceTracker {
    /// Create a new presence tracker.
    pub fn new(
        store: PresenceStore,
        registry: Arc<ConnectionRegistry>,
        router: Arc<RoomRouter>,
    ) -> Self {
        Self {
            store,
            registry,
            router,
            locks: DashMap::new(),
        }
    }

    /// The underlying store.
    pub fn store(&self) -> &PresenceStore {
        &self.store
    }

    /// Called when a user's first connection in this process is registered.
    ///
    /// The user becomes ONLINE and everyone else is told, unless their
    /// stored status is INVISIBLE, which is kept and announced to nobody.
    pub async fn on_first_connection(&self, user_id: Uuid) -> AppResult<Option<PresenceRecord>> {
        self.serialized(user_id, self.first_connection_locked(user_id))
            .await
    }

    /// Explicit status change requested by the user.
    pub async fn update_status(
        &self,
        user_id: Uuid,
        status: PresenceStatus,
        status_message: Option<String>,
    ) -> AppResult<PresenceRecord> {
        self.serialized(
            user_id,
            self.update_status_locked(user_id, status, status_message),
        )
        .await
    }

    /// Called when a user's last connection in this process is gone.
    pub async fn on_last_disconnect(&self, user_id: Uuid) -> AppResult<Option<PresenceRecord>> {
        self.serialized(user_id, self.last_disconnect_locked(user_id))
            .await
    }

    /// Re-arm the ONLINE TTL for every user connected to this process.
    ///
    /// A connected user with no stored record (lapsed, or never written
    /// because the store was down at connect) is written ONLINE again and
    /// announced. Explicit statuses are left alone. Returns the number of
    /// ONLINE records extended or restored.
    pub async fn refresh_local(&self) -> usize {
        let mut refreshed = 0;
        for user_id in self.registry.connected_user_ids() {
            match self.serialized(user_id, self.refresh_locked(user_id)).await {
                Ok(true) => refreshed += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(%user_id, error = %e, "Presence refresh failed");
                }
            }
        }
        refreshed
    }

    /// A user's presence as other users see it. Unknown users read as OFFLINE.
    pub async fn visible_status(&self, user_id: Uuid) -> AppResult<Option<PresenceRecord>> {
        Ok(self
            .store
            .get_status(user_id)
            .await?
            .map(|record| record.visible_to_others()))
    }

    /// Every user currently ONLINE.
    pub async fn list_online(&self) -> AppResult<Vec<PresenceRecord>> {
        self.store.list_online().await
    }

    async fn first_connection_locked(&self, user_id: Uuid) -> AppResult<Option<PresenceRecord>> {
        if !self.registry.is_user_connected(&user_id) {
            return Ok(None);
        }

        let previous = self.store.get_status(user_id).await?;
        if let Some(prev) = previous.filter(|p| p.status == PresenceStatus::Invisible) {
            let record = self
                .store
                .set_status(user_id, PresenceStatus::Invisible, prev.status_message)
                .await?;
            tracing::debug!(%user_id, "User connected invisibly");
            return Ok(Some(record));
        }

        let record = self
            .store
            .set_status(user_id, PresenceStatus::Online, None)
            .await?;
        self.announce(&record);
        tracing::info!(%user_id, "User online");
        Ok(Some(record))
    }

    async fn update_status_locked(
        &self,
        user_id: Uuid,
        status: PresenceStatus,
        status_message: Option<String>,
    ) -> AppResult<PresenceRecord> {
        let record = self.store.set_status(user_id, status, status_message).await?;
        if status != PresenceStatus::Invisible {
            self.announce(&record);
        }
        tracing::info!(%user_id, status = %status, "User status changed");
        Ok(record)
    }

    async fn last_disconnect_locked(&self, user_id: Uuid) -> AppResult<Option<PresenceRecord>> {
        if self.registry.is_user_connected(&user_id) {
            tracing::debug!(%user_id, "User reconnected before going offline");
            return Ok(None);
        }

        let previous = self.store.get_status(user_id).await?;
        let already_offline = previous
            .as_ref()
            .is_some_and(|p| p.status == PresenceStatus::Offline);
        if let Some(prev) = previous.filter(|p| p.status == PresenceStatus::Invisible) {
            // Stays INVISIBLE so the next connection is invisible too.
            let record = self
                .store
                .set_status(user_id, PresenceStatus::Invisible, prev.status_message)
                .await?;
            return Ok(Some(record));
        }

        let record = self
            .store
            .set_status(user_id, PresenceStatus::Offline, None)
            .await?;
        if !already_offline {
            self.announce(&record);
        }
        tracing::info!(%user_id, "User offline");
        Ok(Some(record))
    }

    async fn refresh_locked(&self, user_id: Uuid) -> AppResult<bool> {
        if !self.registry.is_user_connected(&user_id) {
            return Ok(false);
        }

        match self.store.refresh(user_id).await? {
            RefreshOutcome::Extended => Ok(true),
            RefreshOutcome::Kept(_) => Ok(false),
            RefreshOutcome::Missing => {
                let record = self
                    .store
                    .set_status(user_id, PresenceStatus::Online, None)
                    .await?;
                self.announce(&record);
                tracing::info!(%user_id, "Restored ONLINE record for connected user");
                Ok(true)
            }
        }
    }

    fn announce(&self, record: &PresenceRecord) {
        let delivered = self
            .router
            .broadcast_all(&record.to_event(), Exclude::User(record.user_id));
        tracing::debug!(user_id = %record.user_id, delivered, "Presence change broadcast");
    }

    async fn serialized<T>(&self, user_id: Uuid, op: impl Future<Output = T>) -> T {
        let lock = self.locks.entry(user_id).or_default().clone();
        let out = {
            let _guard = lock.lock().await;
            op.await
        };
        drop(lock);
        self.locks.remove_if(&user_id, |_, l| Arc::strong_count(l) == 1);
        out
    }
}
