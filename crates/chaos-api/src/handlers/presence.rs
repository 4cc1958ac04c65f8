//! Presence query handlers.

use axum::Json;
use axum::extract::{Path, State};
use uuid::Uuid;

use crate::dto::response::{OnlineUsersResponse, PresenceResponse};
use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::state::AppState;

/// GET /api/presence/online
pub async fn list_online(
    State(state): State<AppState>,
    _auth: AuthUser,
) -> Result<Json<OnlineUsersResponse>, ApiError> {
    let records = state.realtime.presence.list_online().await?;
    let user_ids: Vec<Uuid> = records.into_iter().map(|r| r.user_id).collect();
    Ok(Json(OnlineUsersResponse {
        count: user_ids.len(),
        user_ids,
    }))
}

/// GET /api/presence/{user_id}
pub async fn get_presence(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(user_id): Path<Uuid>,
) -> Result<Json<PresenceResponse>, ApiError> {
    let response = state
        .realtime
        .presence
        .visible_status(user_id)
        .await?
        .map(PresenceResponse::from)
        .unwrap_or_else(|| PresenceResponse::offline(user_id));
    Ok(Json(response))
}
