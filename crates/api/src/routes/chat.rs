use axum::{
    Json,
    extract::{Path, State},
};
use bson::oid::ObjectId;
use careercompass_db::models::Chat;
use serde::Serialize;

use crate::{error::ApiError, extractors::auth::AuthUser, state::AppState};

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub id: String,
    pub mentee_id: String,
    pub mentor_id: String,
    pub last_message_id: Option<String>,
    pub last_activity_at: String,
    pub unread_count: UnreadCountResponse,
    pub is_active: bool,
    pub created_at: String,
}

#[derive(Debug, Serialize)]
pub struct UnreadCountResponse {
    pub mentee: u32,
    pub mentor: u32,
}

pub fn to_response(chat: Chat) -> ChatResponse {
    ChatResponse {
        id: chat.id.map(|id| id.to_hex()).unwrap_or_default(),
        mentee_id: chat.mentee_id.to_hex(),
        mentor_id: chat.mentor_id.to_hex(),
        last_message_id: chat.last_message_id.map(|id| id.to_hex()),
        last_activity_at: chat
            .last_activity_at
            .try_to_rfc3339_string()
            .unwrap_or_default(),
        unread_count: UnreadCountResponse {
            mentee: chat.unread_count.mentee,
            mentor: chat.unread_count.mentor,
        },
        is_active: chat.is_active,
        created_at: chat.created_at.try_to_rfc3339_string().unwrap_or_default(),
    }
}

/// The caller's conversations, newest activity first.
pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<serde_json::Value>, ApiError> {
    let chats = state.chat.list_for_user(auth.user_id).await?;
    let items: Vec<ChatResponse> = chats.into_iter().map(to_response).collect();

    Ok(Json(serde_json::json!({
        "success": true,
        "items": items,
    })))
}

/// First contact is lazy: fetches the unique chat with the given mentor,
/// creating it if this is the first exchange.
pub async fn get_or_create(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(mentor_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mentor_id = ObjectId::parse_str(&mentor_id)
        .map_err(|_| ApiError::BadRequest("Invalid mentor_id".to_string()))?;

    state
        .users
        .find_active_mentor(mentor_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Mentor not found".to_string()))?;

    let chat = state.chat.get_or_create(auth.user_id, mentor_id).await?;

    Ok(Json(serde_json::json!({
        "success": true,
        "chat": to_response(chat),
    })))
}
