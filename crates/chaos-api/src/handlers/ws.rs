//! WebSocket upgrade handler and per-connection transport loop.

use std::time::Duration;

use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::response::{IntoResponse, Response};
use futures::{SinkExt, StreamExt};
use tracing::{debug, info, warn};

use chaos_realtime::connection::authenticator::AuthenticatedConnection;
use chaos_realtime::connection::heartbeat::run_heartbeat;
use chaos_realtime::message::codec::encode_outbound;

use crate::error::ApiError;
use crate::state::AppState;

/// How long the writer gets to flush and send a close frame.
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Query parameter for WebSocket authentication.
#[derive(Debug, serde::Deserialize)]
pub struct WsQuery {
    /// JWT access token.
    pub token: Option<String>,
}

/// GET /ws?token={jwt}: WebSocket upgrade
///
/// The token is checked before the upgrade; a rejected handshake gets a
/// plain 401 and leaves no trace in the engine.
pub async fn ws_handler(
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
    headers: HeaderMap,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Result<Response, ApiError> {
    let token = query.token.or_else(|| bearer_token(&headers));
    let auth = state.realtime.authenticate(token.as_deref()).await?;

    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => return Ok(rejection.into_response()),
    };

    Ok(ws.on_upgrade(move |socket| handle_ws_connection(state, auth, socket)))
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}

/// Drives an established WebSocket connection until it closes, then runs
/// disconnect reconciliation.
async fn handle_ws_connection(state: AppState, auth: AuthenticatedConnection, socket: WebSocket) {
    let engine = state.realtime;
    let (mut ws_tx, mut ws_rx) = socket.split();

    let (handle, mut outbound_rx) = engine.connect(auth).await;
    let conn_id = handle.id;

    info!(
        conn_id = %conn_id,
        user_id = %handle.user_id,
        "WebSocket connection established"
    );

    let heartbeat = tokio::spawn(run_heartbeat(handle.clone(), engine.heartbeat_config()));

    let writer_handle = handle.clone();
    let mut writer = tokio::spawn(async move {
        loop {
            let msg = tokio::select! {
                _ = writer_handle.closed() => break,
                msg = outbound_rx.recv() => match msg {
                    Some(msg) => msg,
                    None => break,
                },
            };
            let text = match encode_outbound(&msg) {
                Ok(text) => text,
                Err(e) => {
                    warn!(conn_id = %writer_handle.id, error = %e, "Failed to encode outbound message");
                    continue;
                }
            };
            if ws_tx.send(Message::Text(text.into())).await.is_err() {
                writer_handle.mark_dead();
                break;
            }
        }
        let _ = ws_tx.send(Message::Close(None)).await;
    });

    loop {
        tokio::select! {
            _ = handle.closed() => break,
            frame = ws_rx.next() => match frame {
                Some(Ok(Message::Text(text))) => engine.handle_text(conn_id, text.as_str()).await,
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => handle.touch(),
                Some(Ok(Message::Binary(_))) => {
                    handle.touch();
                    debug!(conn_id = %conn_id, "Ignoring binary frame");
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    debug!(conn_id = %conn_id, error = %e, "WebSocket transport error");
                    break;
                }
            },
        }
    }

    engine.disconnect(conn_id).await;
    heartbeat.abort();
    if tokio::time::timeout(WRITER_DRAIN_TIMEOUT, &mut writer).await.is_err() {
        debug!(conn_id = %conn_id, "Writer did not finish in time");
        writer.abort();
    }

    info!(
        conn_id = %conn_id,
        user_id = %handle.user_id,
        "WebSocket connection closed"
    );
}
