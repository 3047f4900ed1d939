//! Polling fallback handlers
//!
//! Stateless request/response mirror of the push channel. Every mutation goes
//! through the same services as the gateway, so push clients see the change
//! on the event bus.

use axum::{
    extract::{Path, State},
    Json,
};
use presence_core::{Message, MessageDraft, PresenceSnapshot};
use tracing::instrument;

use crate::dto::{ActivityRequest, ConnectResponse, SendMessageResponse, SuccessResponse, UserRequest};
use crate::extractors::ValidatedJson;
use crate::response::ApiResult;
use crate::state::AppState;

/// Mark a user online
///
/// POST /websocket/connect
#[instrument(skip(state, request), fields(user_id = %request.user_id))]
pub async fn connect(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<UserRequest>,
) -> ApiResult<Json<ConnectResponse>> {
    let snapshot = state
        .service_context()
        .presence()
        .connect(&request.user_id, None)?;

    Ok(Json(ConnectResponse {
        success: true,
        snapshot,
    }))
}

/// Mark a user offline
///
/// POST /websocket/disconnect
#[instrument(skip(state, request), fields(user_id = %request.user_id))]
pub async fn disconnect(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<UserRequest>,
) -> ApiResult<Json<SuccessResponse>> {
    state
        .service_context()
        .presence()
        .disconnect(&request.user_id)?;

    Ok(Json(SuccessResponse::ok()))
}

/// Replace a user's activity; succeeds even when the user is not online
///
/// POST /websocket/activity
#[instrument(skip(state, request), fields(user_id = %request.user_id))]
pub async fn update_activity(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<ActivityRequest>,
) -> ApiResult<Json<SuccessResponse>> {
    state
        .service_context()
        .presence()
        .update_activity(&request.user_id, &request.activity)?;

    Ok(Json(SuccessResponse::ok()))
}

/// Relay a message
///
/// POST /websocket/message
pub async fn send_message(
    State(state): State<AppState>,
    ValidatedJson(draft): ValidatedJson<MessageDraft>,
) -> ApiResult<Json<SendMessageResponse>> {
    let message = state.service_context().relay().send(draft).await?;

    Ok(Json(SendMessageResponse {
        success: true,
        message,
    }))
}

/// Current online users and activities
///
/// GET /websocket/users
pub async fn get_online_users(State(state): State<AppState>) -> Json<PresenceSnapshot> {
    Json(state.service_context().presence().online_users())
}

/// Messages exchanged between two users, oldest first
///
/// GET /websocket/messages/{user_id}/{other_id}
pub async fn get_conversation(
    State(state): State<AppState>,
    Path((user_id, other_id)): Path<(String, String)>,
) -> Json<Vec<Message>> {
    Json(
        state
            .service_context()
            .relay()
            .conversation(&user_id, &other_id),
    )
}
