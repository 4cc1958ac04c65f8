//! Typing coordinator: debounced typing indicators with automatic expiry.
//!
//! State is keyed by (actor, target). The first `start` announces
//! `typing:start`; repeated starts inside the window only re-arm the timer.
//! An explicit `stop` or the timer firing announces `typing:stop` exactly
//! once. Timers carry a generation number so a timer that lost a race with
//! a re-arm or stop does nothing.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::TypingTarget;
use crate::message::types::OutboundMessage;
use crate::room::router::{Exclude, RoomRouter};

type TypingKey = (Uuid, TypingTarget);

#[derive(Debug)]
struct TypingState {
    generation: u64,
    expires_at: DateTime<Utc>,
    timer: JoinHandle<()>,
}

#[derive(Debug)]
struct Inner {
    states: DashMap<TypingKey, TypingState>,
    router: Arc<RoomRouter>,
    window: Duration,
    generation: AtomicU64,
}

impl Inner {
    fn notify(&self, actor: Uuid, target: TypingTarget, started: bool) {
        let room_id = match target {
            TypingTarget::Room(room) => Some(room),
            TypingTarget::User(_) => None,
        };
        let msg = if started {
            OutboundMessage::TypingStart { user_id: actor, room_id }
        } else {
            OutboundMessage::TypingStop { user_id: actor, room_id }
        };

        let delivered = match target {
            TypingTarget::User(recipient) => self.router.deliver_to_user(recipient, &msg),
            TypingTarget::Room(room) => {
                self.router.broadcast_to_room(room, &msg, Exclude::User(actor))
            }
        };
        tracing::trace!(%actor, ?target, started, delivered, "Typing indicator sent");
    }
}

/// Tracks who is typing to whom.
#[derive(Debug, Clone)]
pub struct TypingCoordinator {
    inner: Arc<Inner>,
}

impl TypingCoordinator {
    /// Create a coordinator whose indicators expire after `window`.
    pub fn new(router: Arc<RoomRouter>, window: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                states: DashMap::new(),
                router,
                window,
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// Record that `actor` is typing. Returns `true` if this started a new
    /// indicator (and `typing:start` was sent).
    pub fn start(&self, actor: Uuid, target: TypingTarget) -> bool {
        let generation = self.inner.generation.fetch_add(1, Ordering::Relaxed) + 1;
        let expires_at = Utc::now()
            + chrono::Duration::from_std(self.inner.window).unwrap_or(chrono::Duration::zero());

        let started = match self.inner.states.entry((actor, target)) {
            Entry::Occupied(mut entry) => {
                let timer = self.spawn_expiry(actor, target, generation);
                let previous = entry.insert(TypingState {
                    generation,
                    expires_at,
                    timer,
                });
                previous.timer.abort();
                false
            }
            Entry::Vacant(entry) => {
                let timer = self.spawn_expiry(actor, target, generation);
                entry.insert(TypingState {
                    generation,
                    expires_at,
                    timer,
                });
                true
            }
        };

        if started {
            self.inner.notify(actor, target, true);
        }
        started
    }

    /// Record that `actor` stopped typing. Returns `false` (and sends
    /// nothing) if no indicator was active.
    pub fn stop(&self, actor: Uuid, target: TypingTarget) -> bool {
        match self.inner.states.remove(&(actor, target)) {
            Some((_, state)) => {
                state.timer.abort();
                self.inner.notify(actor, target, false);
                true
            }
            None => false,
        }
    }

    /// Stop every indicator `actor` has active. Returns how many were stopped.
    pub fn clear_actor(&self, actor: Uuid) -> usize {
        let keys: Vec<TypingKey> = self
            .inner
            .states
            .iter()
            .filter(|entry| entry.key().0 == actor)
            .map(|entry| *entry.key())
            .collect();

        keys.into_iter()
            .filter(|(actor, target)| self.stop(*actor, *target))
            .count()
    }

    /// Whether `actor` currently has an indicator active for `target`.
    pub fn is_typing(&self, actor: Uuid, target: TypingTarget) -> bool {
        self.inner.states.contains_key(&(actor, target))
    }

    /// When the active indicator will expire, if there is one.
    pub fn expires_at(&self, actor: Uuid, target: TypingTarget) -> Option<DateTime<Utc>> {
        self.inner
            .states
            .get(&(actor, target))
            .map(|state| state.expires_at)
    }

    /// Number of active indicators.
    pub fn active_count(&self) -> usize {
        self.inner.states.len()
    }

    fn spawn_expiry(&self, actor: Uuid, target: TypingTarget, generation: u64) -> JoinHandle<()> {
        let inner = Arc::downgrade(&self.inner);
        let window = self.inner.window;
        tokio::spawn(async move {
            tokio::time::sleep(window).await;
            let Some(inner) = inner.upgrade() else {
                return;
            };
            let expired = inner
                .states
                .remove_if(&(actor, target), |_, state| state.generation == generation)
                .is_some();
            if expired {
                tracing::debug!(%actor, ?target, "Typing indicator expired");
                inner.notify(actor, target, false);
            }
        })
    }
}
