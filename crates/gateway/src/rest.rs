//! REST boundary: thin producers that validate and enqueue commands, plus the
//! read side of the chat store.
//!
//! The caller's stable profile id arrives in the `x-profile-id` header; the
//! surrounding identity stack is responsible for authenticating it.

use crate::error::{GatewayError, GatewayResult};
use crate::state::GatewayState;
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use jordnaer_chats::{
    ChatCommand, ChatDto, ChatError, ChatMessageDto, SendMessage, SetChatName, StartChat,
};
use jordnaer_database::{ChatRepository, MessageRepository};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

const PROFILE_ID_HEADER: &str = "x-profile-id";

pub fn create_rest_routes() -> Router<Arc<GatewayState>> {
    Router::new()
        .route("/chats", get(get_chats).post(start_chat))
        .route("/chats/lookup", post(find_chat_by_recipients))
        .route(
            "/chats/:chat_id/messages",
            get(get_chat_messages).post(send_message),
        )
        .route("/chats/:chat_id/name", put(set_chat_name))
        .route("/chats/:chat_id/unread", get(get_unread_count))
        .route("/chats/:chat_id/read", post(mark_read))
        .route("/unread", get(get_total_unread_count))
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_take")]
    pub take: i64,
}

fn default_take() -> i64 {
    50
}

#[derive(Debug, Serialize)]
pub struct CommandAccepted {
    pub id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct SetChatNameRequest {
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MarkReadRequest {
    pub upto_utc: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct MarkReadResponse {
    pub acknowledged: u64,
}

#[derive(Debug, Serialize)]
pub struct UnreadCountResponse {
    pub unread_count: i64,
}

#[derive(Debug, Deserialize)]
pub struct ChatLookupRequest {
    pub recipient_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatIdResponse {
    pub id: Uuid,
}

fn current_profile_id(headers: &HeaderMap) -> GatewayResult<String> {
    headers
        .get(PROFILE_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| {
            GatewayError::AuthenticationFailed(format!("missing {PROFILE_ID_HEADER} header"))
        })
}

/// `POST /api/chats` — enqueue a `StartChat` command.
async fn start_chat(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
    Json(command): Json<StartChat>,
) -> GatewayResult<(StatusCode, Json<CommandAccepted>)> {
    let profile_id = current_profile_id(&headers)?;

    if !command
        .recipients
        .iter()
        .any(|recipient| recipient.id == profile_id)
    {
        return Err(GatewayError::AuthorizationFailed(
            "the caller must be among the chat recipients".to_string(),
        ));
    }

    command
        .validate()
        .map_err(GatewayError::InvalidRequest)?;

    let chats = ChatRepository::new(state.pool.clone());
    if chats.exists(command.id).await.map_err(ChatError::from)? {
        return Err(ChatError::DuplicateChat { id: command.id }.into());
    }

    let id = command.id;
    state.bus.publish(ChatCommand::StartChat(command)).await?;

    debug!(chat_id = %id, "start-chat command accepted");
    Ok((StatusCode::ACCEPTED, Json(CommandAccepted { id })))
}

/// `POST /api/chats/:chat_id/messages` — enqueue a `SendMessage` command.
async fn send_message(
    State(state): State<Arc<GatewayState>>,
    Path(chat_id): Path<Uuid>,
    headers: HeaderMap,
    Json(command): Json<SendMessage>,
) -> GatewayResult<(StatusCode, Json<CommandAccepted>)> {
    let profile_id = current_profile_id(&headers)?;

    if command.chat_id != chat_id {
        return Err(GatewayError::InvalidRequest(
            "message chat id does not match the path".to_string(),
        ));
    }

    if command.sender_id != profile_id {
        return Err(GatewayError::AuthorizationFailed(
            "sender id does not match the caller".to_string(),
        ));
    }

    command
        .validate()
        .map_err(GatewayError::InvalidRequest)?;

    let chats = ChatRepository::new(state.pool.clone());
    if !chats.exists(chat_id).await.map_err(ChatError::from)? {
        return Err(ChatError::ChatNotFound { id: chat_id }.into());
    }

    let messages = MessageRepository::new(state.pool.clone());
    if messages.exists(command.id).await.map_err(ChatError::from)? {
        return Err(GatewayError::Conflict(format!(
            "Message {} already exists",
            command.id
        )));
    }

    let id = command.id;
    state.bus.publish(ChatCommand::SendMessage(command)).await?;

    Ok((StatusCode::ACCEPTED, Json(CommandAccepted { id })))
}

/// `PUT /api/chats/:chat_id/name` — enqueue a `SetChatName` command.
async fn set_chat_name(
    State(state): State<Arc<GatewayState>>,
    Path(chat_id): Path<Uuid>,
    headers: HeaderMap,
    Json(request): Json<SetChatNameRequest>,
) -> GatewayResult<StatusCode> {
    let profile_id = current_profile_id(&headers)?;

    let chats = ChatRepository::new(state.pool.clone());
    if !chats.exists(chat_id).await.map_err(ChatError::from)? {
        return Err(ChatError::ChatNotFound { id: chat_id }.into());
    }

    if !chats
        .is_recipient(chat_id, &profile_id)
        .await
        .map_err(ChatError::from)?
    {
        return Err(ChatError::not_a_participant(chat_id, profile_id).into());
    }

    let command = SetChatName {
        chat_id,
        name: request.name,
        timestamp_utc: Utc::now(),
    };
    state.bus.publish(ChatCommand::SetChatName(command)).await?;

    Ok(StatusCode::ACCEPTED)
}

/// `GET /api/chats` — the caller's chat list, newest activity first.
async fn get_chats(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
    Query(page): Query<PageQuery>,
) -> GatewayResult<Json<Vec<ChatDto>>> {
    let profile_id = current_profile_id(&headers)?;

    let chats = state
        .chat_service
        .get_chats(&profile_id, page.skip, page.take)
        .await?;

    Ok(Json(chats))
}

/// `GET /api/chats/:chat_id/messages` — one page of visible messages.
async fn get_chat_messages(
    State(state): State<Arc<GatewayState>>,
    Path(chat_id): Path<Uuid>,
    headers: HeaderMap,
    Query(page): Query<PageQuery>,
) -> GatewayResult<Json<Vec<ChatMessageDto>>> {
    let profile_id = current_profile_id(&headers)?;

    let messages = state
        .chat_service
        .get_chat_messages(chat_id, &profile_id, page.skip, page.take)
        .await?;

    Ok(Json(messages))
}

/// `GET /api/chats/:chat_id/unread` — the caller's unread count in one chat.
async fn get_unread_count(
    State(state): State<Arc<GatewayState>>,
    Path(chat_id): Path<Uuid>,
    headers: HeaderMap,
) -> GatewayResult<Json<UnreadCountResponse>> {
    let profile_id = current_profile_id(&headers)?;

    let unread_count = state
        .unread_service
        .get_unread_count(chat_id, &profile_id)
        .await?;

    Ok(Json(UnreadCountResponse { unread_count }))
}

/// `GET /api/unread` — the caller's unread count across all chats.
async fn get_total_unread_count(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
) -> GatewayResult<Json<UnreadCountResponse>> {
    let profile_id = current_profile_id(&headers)?;

    let unread_count = state.unread_service.total_unread_count(&profile_id).await?;

    Ok(Json(UnreadCountResponse { unread_count }))
}

/// `POST /api/chats/:chat_id/read` — acknowledge messages up to a timestamp.
async fn mark_read(
    State(state): State<Arc<GatewayState>>,
    Path(chat_id): Path<Uuid>,
    headers: HeaderMap,
    Json(request): Json<MarkReadRequest>,
) -> GatewayResult<Json<MarkReadResponse>> {
    let profile_id = current_profile_id(&headers)?;

    let upto_utc = request.upto_utc.unwrap_or_else(Utc::now);
    let acknowledged = state
        .unread_service
        .mark_read(chat_id, &profile_id, upto_utc)
        .await?;

    Ok(Json(MarkReadResponse { acknowledged }))
}

/// `POST /api/chats/lookup` — find the chat with exactly these recipients.
async fn find_chat_by_recipients(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
    Json(request): Json<ChatLookupRequest>,
) -> GatewayResult<Json<ChatIdResponse>> {
    let profile_id = current_profile_id(&headers)?;

    if !request.recipient_ids.contains(&profile_id) {
        return Err(GatewayError::AuthorizationFailed(
            "the caller must be among the recipients".to_string(),
        ));
    }

    let found = state
        .chat_service
        .find_chat_by_recipients(&request.recipient_ids)
        .await?;

    match found {
        Some(id) => Ok(Json(ChatIdResponse { id })),
        None => Err(GatewayError::NotFound(
            "no chat with exactly these recipients".to_string(),
        )),
    }
}
