//! Top-level real-time engine that ties together all subsystems.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;

use chaos_cache::CacheManager;
use chaos_core::config::RealtimeConfig;
use chaos_core::error::AppError;
use chaos_core::result::AppResult;
use chaos_core::traits::TokenVerifier;

use crate::connection::authenticator::{AuthenticatedConnection, WsAuthenticator};
use crate::connection::handle::{ConnectionHandle, ConnectionId};
use crate::connection::heartbeat::HeartbeatConfig;
use crate::connection::registry::{Arrival, ConnectionRegistry};
use crate::message::codec::decode_inbound;
use crate::message::types::{InboundMessage, OutboundMessage, typing_target};
use crate::message::validator::{validate_content, validate_status_message};
use crate::metrics::EngineMetrics;
use crate::presence::refresher::spawn_refresher;
use crate::presence::store::PresenceStore;
use crate::presence::tracker::PresenceTracker;
use crate::reconciler::{DisconnectReconciler, ReconcileOutcome};
use crate::room::router::{Exclude, RoomRouter};
use crate::typing::coordinator::TypingCoordinator;

/// Central real-time engine that coordinates all WebSocket subsystems.
#[derive(Clone)]
pub struct RealtimeEngine {
    /// Engine configuration.
    pub config: Arc<RealtimeConfig>,
    /// Connection admission.
    pub authenticator: WsAuthenticator,
    /// Live connections.
    pub registry: Arc<ConnectionRegistry>,
    /// Rooms and fan-out.
    pub router: Arc<RoomRouter>,
    /// Presence transitions.
    pub presence: Arc<PresenceTracker>,
    /// Typing indicators.
    pub typing: TypingCoordinator,
    /// Disconnect cleanup.
    pub reconciler: Arc<DisconnectReconciler>,
    /// Metrics collector.
    pub metrics: Arc<EngineMetrics>,
    /// Cancelled on shutdown.
    shutdown: CancellationToken,
    /// Presence refresher task, once started.
    refresher: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl std::fmt::Debug for RealtimeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeEngine")
            .field("connections", &self.registry.connection_count())
            .field("users", &self.registry.user_count())
            .finish()
    }
}

impl RealtimeEngine {
    /// Creates a new real-time engine with all subsystems.
    pub fn new(
        config: RealtimeConfig,
        cache: Arc<CacheManager>,
        verifier: Arc<dyn TokenVerifier>,
    ) -> Self {
        let metrics = Arc::new(EngineMetrics::new());
        let registry = Arc::new(ConnectionRegistry::new());
        let router = Arc::new(RoomRouter::new(registry.clone(), metrics.clone()));
        let store = PresenceStore::new(cache, &config.presence);
        let presence = Arc::new(PresenceTracker::new(store, registry.clone(), router.clone()));
        let typing = TypingCoordinator::new(
            router.clone(),
            Duration::from_millis(config.typing.window_ms),
        );
        let reconciler = Arc::new(DisconnectReconciler::new(
            registry.clone(),
            router.clone(),
            typing.clone(),
            presence.clone(),
            metrics.clone(),
        ));

        info!("Real-time engine initialized");

        Self {
            config: Arc::new(config),
            authenticator: WsAuthenticator::new(verifier),
            registry,
            router,
            presence,
            typing,
            reconciler,
            metrics,
            shutdown: CancellationToken::new(),
            refresher: Arc::new(Mutex::new(None)),
        }
    }

    /// Starts background tasks. Must be called from within a Tokio runtime.
    pub fn start(&self) {
        let period = Duration::from_secs(self.config.presence.refresh_interval_seconds.max(1));
        let task = spawn_refresher(self.presence.clone(), period, self.shutdown.clone());
        match self.refresher.lock() {
            Ok(mut slot) => {
                if let Some(previous) = slot.replace(task) {
                    previous.abort();
                }
            }
            Err(_) => task.abort(),
        }
    }

    /// Heartbeat settings for connection loops.
    pub fn heartbeat_config(&self) -> HeartbeatConfig {
        HeartbeatConfig::from(self.config.as_ref())
    }

    /// Authentication gate: admit or reject a handshake token.
    pub async fn authenticate(&self, token: Option<&str>) -> AppResult<AuthenticatedConnection> {
        self.authenticator.authenticate(token).await
    }

    /// Register an authenticated connection.
    ///
    /// Returns the connection handle and the receiver the socket writer
    /// drains. A presence store failure is logged; the connection is still
    /// admitted.
    pub async fn connect(
        &self,
        auth: AuthenticatedConnection,
    ) -> (Arc<ConnectionHandle>, mpsc::Receiver<OutboundMessage>) {
        let (tx, rx) = mpsc::channel(self.config.outbound_buffer_size.max(1));
        let handle = Arc::new(ConnectionHandle::new(auth.user_id, auth.username, tx));

        let arrival = self.registry.add(handle.clone());
        self.metrics.record_connect();
        info!(
            conn_id = %handle.id,
            user_id = %handle.user_id,
            first = arrival == Arrival::FirstConnection,
            "Connection registered"
        );

        if arrival == Arrival::FirstConnection {
            if let Err(e) = self.presence.on_first_connection(handle.user_id).await {
                tracing::warn!(user_id = %handle.user_id, error = %e, "Could not mark user online");
            }
        }

        (handle, rx)
    }

    /// Handle a raw text frame from a connection.
    pub async fn handle_text(&self, conn_id: ConnectionId, raw: &str) {
        self.metrics.record_received();
        match decode_inbound(raw) {
            Ok(cmd) => self.handle_command(conn_id, cmd).await,
            Err(e) => {
                self.metrics.record_rejected();
                if let Some(handle) = self.registry.get(&conn_id) {
                    handle.touch();
                    tracing::debug!(%conn_id, error = %e, "Malformed frame");
                    handle.send(OutboundMessage::from_error(&e));
                }
            }
        }
    }

    /// Handle a decoded command from a connection. Rejections are answered
    /// on the same connection; the connection stays open.
    pub async fn handle_command(&self, conn_id: ConnectionId, cmd: InboundMessage) {
        let Some(handle) = self.registry.get(&conn_id) else {
            tracing::debug!(%conn_id, "Command for unknown connection");
            return;
        };
        handle.touch();

        let event = cmd.event_name();
        if let Err(e) = self.dispatch(&handle, cmd).await {
            self.metrics.record_rejected();
            tracing::debug!(%conn_id, event, error = %e, "Event rejected");
            handle.send(OutboundMessage::from_error(&e));
        }
    }

    async fn dispatch(&self, handle: &ConnectionHandle, cmd: InboundMessage) -> AppResult<()> {
        match cmd {
            InboundMessage::ChannelJoin { room_id } => {
                if self.router.join(handle.id, room_id) {
                    let joined = OutboundMessage::ChannelUserJoined {
                        room_id,
                        user_id: handle.user_id,
                        username: handle.username.clone(),
                    };
                    self.router
                        .broadcast_to_room(room_id, &joined, Exclude::Connection(handle.id));
                }
                handle.send(OutboundMessage::ChannelJoined { room_id });
            }
            InboundMessage::ChannelLeave { room_id } => {
                if self.router.leave(handle.id, room_id) {
                    let left = OutboundMessage::ChannelUserLeft {
                        room_id,
                        user_id: handle.user_id,
                        username: handle.username.clone(),
                    };
                    self.router.broadcast_to_room(room_id, &left, Exclude::Nobody);
                }
            }
            InboundMessage::MessageDirect {
                recipient_id,
                content,
                message_type,
                temp_id,
            } => {
                if let Err(e) = validate_content(&content, self.config.max_message_length) {
                    self.reject_message(handle, temp_id, &e);
                    return Ok(());
                }
                let message_id = Uuid::new_v4();
                let timestamp = Utc::now();
                let msg = OutboundMessage::MessageDirect {
                    message_id,
                    sender_id: handle.user_id,
                    sender_name: handle.username.clone(),
                    recipient_id,
                    content,
                    message_type,
                    timestamp,
                };
                let delivered = self.router.deliver_to_user(recipient_id, &msg);
                tracing::debug!(%message_id, %recipient_id, delivered, "Direct message routed");
                handle.send(OutboundMessage::MessageSent {
                    temp_id,
                    message_id,
                    timestamp,
                });
            }
            InboundMessage::MessageChannel {
                channel_id,
                content,
                message_type,
                temp_id,
            } => {
                if let Err(e) = validate_content(&content, self.config.max_message_length) {
                    self.reject_message(handle, temp_id, &e);
                    return Ok(());
                }
                let message_id = Uuid::new_v4();
                let timestamp = Utc::now();
                let msg = OutboundMessage::MessageChannel {
                    message_id,
                    channel_id,
                    sender_id: handle.user_id,
                    sender_name: handle.username.clone(),
                    content,
                    message_type,
                    timestamp,
                };
                let delivered = self
                    .router
                    .broadcast_to_room(channel_id, &msg, Exclude::Connection(handle.id));
                tracing::debug!(%message_id, %channel_id, delivered, "Channel message routed");
                handle.send(OutboundMessage::MessageSent {
                    temp_id,
                    message_id,
                    timestamp,
                });
            }
            InboundMessage::TypingStart {
                recipient_id,
                room_id,
            } => {
                let target = typing_target(recipient_id, room_id)?;
                self.typing.start(handle.user_id, target);
            }
            InboundMessage::TypingStop {
                recipient_id,
                room_id,
            } => {
                let target = typing_target(recipient_id, room_id)?;
                self.typing.stop(handle.user_id, target);
            }
            InboundMessage::UserStatus {
                status,
                status_message,
            } => {
                validate_status_message(status_message.as_deref())?;
                self.presence
                    .update_status(handle.user_id, status, status_message)
                    .await?;
            }
            InboundMessage::Pong(_) => {}
        }
        Ok(())
    }

    fn reject_message(&self, handle: &ConnectionHandle, temp_id: Option<String>, err: &AppError) {
        self.metrics.record_rejected();
        tracing::debug!(conn_id = %handle.id, error = %err, "Message rejected");
        handle.send(OutboundMessage::MessageError {
            temp_id,
            code: err.kind.code().to_string(),
            message: err.message.clone(),
        });
    }

    /// Reconcile a closed connection.
    pub async fn disconnect(&self, conn_id: ConnectionId) -> ReconcileOutcome {
        self.reconciler.reconcile(conn_id).await
    }

    /// Whether shutdown has begun.
    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Initiates a graceful shutdown: stops background tasks and closes
    /// every connection so each one runs through disconnect reconciliation.
    pub async fn shutdown(&self) {
        info!("Shutting down real-time engine");
        self.shutdown.cancel();

        for handle in self.registry.all_connections() {
            handle.close();
        }

        let task = self.refresher.lock().ok().and_then(|mut slot| slot.take());
        if let Some(task) = task {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Presence refresher ended abnormally");
            }
        }

        info!("Real-time engine shut down");
    }

    /// Wait until every connection has been reconciled, or `timeout` passes.
    /// Returns `true` if the registry drained.
    pub async fn wait_for_drain(&self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while self.registry.connection_count() > 0 {
            if tokio::time::Instant::now() >= deadline {
                tracing::warn!(
                    remaining = self.registry.connection_count(),
                    "Connections still open after shutdown grace period"
                );
                return false;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        true
    }
}
