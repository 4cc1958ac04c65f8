//! Presence store: reads and writes presence records in the shared cache.
//!
//! Layout:
//! - `chaos:presence:{userId}` holds the JSON [`PresenceRecord`]
//! - `chaos:presence:online` is the set of user IDs whose status is ONLINE
//!
//! ONLINE records carry a short TTL and must be refreshed by the process
//! holding the user's connections; if that process dies, the record lapses
//! and the user reads as offline. Every other status is kept for the
//! retention period so `lastSeen` survives.

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use chaos_cache::{CacheManager, keys};
use chaos_core::config::PresenceConfig;
use chaos_core::error::{AppError, ErrorKind};
use chaos_core::result::AppResult;
use chaos_core::traits::CacheProvider;

use super::record::PresenceRecord;
use super::status::PresenceStatus;

/// What [`PresenceStore::refresh`] found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The ONLINE record's TTL was re-armed.
    Extended,
    /// Nothing is stored for the user (never written, or lapsed).
    Missing,
    /// The user holds an explicit non-ONLINE status; left untouched.
    Kept(PresenceStatus),
}

/// Presence persistence over the shared cache.
#[derive(Debug, Clone)]
pub struct PresenceStore {
    /// Shared cache.
    cache: Arc<CacheManager>,
    /// Lifetime of an ONLINE record without refresh.
    online_ttl: Duration,
    /// Lifetime of any other record.
    retention: Duration,
}

impl PresenceStore {
    /// Create a new presence store.
    pub fn new(cache: Arc<CacheManager>, config: &PresenceConfig) -> Self {
        Self {
            cache,
            online_ttl: Duration::from_secs(config.ttl_seconds),
            retention: Duration::from_secs(config.retention_seconds),
        }
    }

    /// Write a user's status and keep the online index in step.
    pub async fn set_status(
        &self,
        user_id: Uuid,
        status: PresenceStatus,
        status_message: Option<String>,
    ) -> AppResult<PresenceRecord> {
        let record = PresenceRecord::new(user_id, status, status_message);
        let key = keys::presence_record(user_id);
        let index = keys::presence_online_index();
        let member = user_id.to_string();

        // Record before index on the way in, index before record on the way
        // out, so the index never names a user without an ONLINE record.
        if status == PresenceStatus::Online {
            self.cache
                .set_json(&key, &record, self.online_ttl)
                .await
                .map_err(unavailable)?;
            self.cache.set_add(&index, &member).await.map_err(unavailable)?;
        } else {
            self.cache
                .set_remove(&index, &member)
                .await
                .map_err(unavailable)?;
            self.cache
                .set_json(&key, &record, self.retention)
                .await
                .map_err(unavailable)?;
        }

        tracing::debug!(%user_id, status = %status, "Presence written");
        Ok(record)
    }

    /// Read a user's stored record, if any.
    pub async fn get_status(&self, user_id: Uuid) -> AppResult<Option<PresenceRecord>> {
        self.cache
            .get_json(&keys::presence_record(user_id))
            .await
            .map_err(unavailable)
    }

    /// Every user currently ONLINE, across all processes.
    ///
    /// Index entries whose record has lapsed are dropped from the index as
    /// they are found.
    pub async fn list_online(&self) -> AppResult<Vec<PresenceRecord>> {
        let index = keys::presence_online_index();
        let members = self.cache.set_members(&index).await.map_err(unavailable)?;

        let mut online = Vec::with_capacity(members.len());
        for member in members {
            let Ok(user_id) = Uuid::parse_str(&member) else {
                self.cache.set_remove(&index, &member).await.map_err(unavailable)?;
                continue;
            };

            match self.get_status(user_id).await? {
                Some(record) if record.status == PresenceStatus::Online => online.push(record),
                _ => {
                    tracing::debug!(%user_id, "Dropping stale online index entry");
                    self.cache.set_remove(&index, &member).await.map_err(unavailable)?;
                }
            }
        }
        Ok(online)
    }

    /// Extend an ONLINE record's TTL and re-assert its index entry.
    ///
    /// Records in any other status are not touched. Callers must hold the
    /// user's transition lock.
    pub async fn refresh(&self, user_id: Uuid) -> AppResult<RefreshOutcome> {
        let record = match self.get_status(user_id).await? {
            None => return Ok(RefreshOutcome::Missing),
            Some(record) => record,
        };
        if record.status != PresenceStatus::Online {
            return Ok(RefreshOutcome::Kept(record.status));
        }

        let extended = self
            .cache
            .expire(&keys::presence_record(user_id), self.online_ttl)
            .await
            .map_err(unavailable)?;
        if !extended {
            // Lapsed between the read and the expire.
            return Ok(RefreshOutcome::Missing);
        }
        self.cache
            .set_add(&keys::presence_online_index(), &user_id.to_string())
            .await
            .map_err(unavailable)?;
        Ok(RefreshOutcome::Extended)
    }
}

fn unavailable(err: AppError) -> AppError {
    AppError::with_source(
        ErrorKind::ServiceUnavailable,
        "Presence store unavailable",
        err,
    )
}

#[cfg(test)]
mod tests {
    use chaos_core::config::CacheConfig;

    use super::*;

    async fn store_with_ttl(ttl_seconds: u64) -> PresenceStore {
        let cache = CacheManager::new(&CacheConfig::default()).await.unwrap();
        let config = PresenceConfig {
            ttl_seconds,
            ..PresenceConfig::default()
        };
        PresenceStore::new(Arc::new(cache), &config)
    }

    #[tokio::test]
    async fn test_online_then_offline_updates_index() {
        let store = store_with_ttl(60).await;
        let user = Uuid::new_v4();

        store.set_status(user, PresenceStatus::Online, None).await.unwrap();
        let online = store.list_online().await.unwrap();
        assert_eq!(online.len(), 1);
        assert_eq!(online[0].user_id, user);

        store.set_status(user, PresenceStatus::Offline, None).await.unwrap();
        assert!(store.list_online().await.unwrap().is_empty());
        let record = store.get_status(user).await.unwrap().unwrap();
        assert_eq!(record.status, PresenceStatus::Offline);
    }

    #[tokio::test]
    async fn test_non_online_statuses_are_not_indexed() {
        let store = store_with_ttl(60).await;
        let user = Uuid::new_v4();

        store.set_status(user, PresenceStatus::Online, None).await.unwrap();
        store
            .set_status(user, PresenceStatus::Away, Some("lunch".into()))
            .await
            .unwrap();

        assert!(store.list_online().await.unwrap().is_empty());
        let record = store.get_status(user).await.unwrap().unwrap();
        assert_eq!(record.status, PresenceStatus::Away);
        assert_eq!(record.status_message.as_deref(), Some("lunch"));
    }

    #[tokio::test]
    async fn test_lapsed_online_record_drops_out() {
        let store = store_with_ttl(1).await;
        let user = Uuid::new_v4();
        store.set_status(user, PresenceStatus::Online, None).await.unwrap();

        tokio::time::sleep(Duration::from_millis(1300)).await;

        assert!(store.get_status(user).await.unwrap().is_none());
        assert!(store.list_online().await.unwrap().is_empty());
        assert_eq!(store.refresh(user).await.unwrap(), RefreshOutcome::Missing);
    }

    #[tokio::test]
    async fn test_refresh_keeps_record_alive() {
        let store = store_with_ttl(1).await;
        let user = Uuid::new_v4();
        store.set_status(user, PresenceStatus::Online, None).await.unwrap();

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(store.refresh(user).await.unwrap(), RefreshOutcome::Extended);
        tokio::time::sleep(Duration::from_millis(600)).await;

        let record = store.get_status(user).await.unwrap().unwrap();
        assert_eq!(record.status, PresenceStatus::Online);
    }

    #[tokio::test]
    async fn test_refresh_leaves_explicit_status_alone() {
        let store = store_with_ttl(60).await;
        let user = Uuid::new_v4();
        store
            .set_status(user, PresenceStatus::Busy, Some("focus".into()))
            .await
            .unwrap();

        assert_eq!(
            store.refresh(user).await.unwrap(),
            RefreshOutcome::Kept(PresenceStatus::Busy)
        );
        assert!(store.list_online().await.unwrap().is_empty());
        let record = store.get_status(user).await.unwrap().unwrap();
        assert_eq!(record.status, PresenceStatus::Busy);
    }
}
