use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
};
use bson::oid::ObjectId;
use careercompass_db::models::{Attachment, FileCategory, Message, MessageType};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{error::ApiError, extractors::auth::AuthUser, state::AppState};
use careercompass_services::dao::base::PaginationParams;

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateMessageRequest {
    #[validate(length(min = 1, max = 2000))]
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct ReactionRequest {
    pub emoji: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub id: String,
    pub chat_id: String,
    pub sender_id: String,
    pub content: String,
    pub message_type: &'static str,
    pub attachment: Option<AttachmentResponse>,
    pub read_by: Vec<ReadReceiptResponse>,
    pub reactions: Vec<ReactionResponse>,
    pub is_edited: bool,
    pub edited_at: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Serialize)]
pub struct AttachmentResponse {
    pub file_id: String,
    pub filename: String,
    pub original_name: String,
    pub url: String,
    pub size: u64,
    pub content_type: String,
}

#[derive(Debug, Serialize)]
pub struct ReadReceiptResponse {
    pub user_id: String,
    pub read_at: String,
}

#[derive(Debug, Serialize)]
pub struct ReactionResponse {
    pub user_id: String,
    pub emoji: String,
    pub created_at: String,
}

fn to_response(m: Message) -> MessageResponse {
    MessageResponse {
        id: m.id.map(|id| id.to_hex()).unwrap_or_default(),
        chat_id: m.chat_id.to_hex(),
        sender_id: m.sender_id.to_hex(),
        content: m.content,
        message_type: match m.message_type {
            MessageType::Text => "text",
            MessageType::File => "file",
            MessageType::Image => "image",
        },
        attachment: m.attachment.map(|a| AttachmentResponse {
            file_id: a.file_id.to_hex(),
            filename: a.filename,
            original_name: a.original_name,
            url: a.url,
            size: a.size,
            content_type: a.content_type,
        }),
        read_by: m
            .read_by
            .into_iter()
            .map(|r| ReadReceiptResponse {
                user_id: r.user_id.to_hex(),
                read_at: r.read_at.try_to_rfc3339_string().unwrap_or_default(),
            })
            .collect(),
        reactions: m
            .reactions
            .into_iter()
            .map(|r| ReactionResponse {
                user_id: r.user_id.to_hex(),
                emoji: r.emoji,
                created_at: r.created_at.try_to_rfc3339_string().unwrap_or_default(),
            })
            .collect(),
        is_edited: m.is_edited,
        edited_at: m
            .edited_at
            .map(|d| d.try_to_rfc3339_string().unwrap_or_default()),
        created_at: m.created_at.try_to_rfc3339_string().unwrap_or_default(),
    }
}

/// Chronological page of the chat's history. Listing doubles as the read
/// acknowledgment: receipts are appended and the caller's unread counter
/// resets.
pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(chat_id): Path<String>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let cid = ObjectId::parse_str(&chat_id)
        .map_err(|_| ApiError::BadRequest("Invalid chat_id".to_string()))?;

    let result = state.chat.list_messages(cid, auth.user_id, &params).await?;

    let items: Vec<MessageResponse> = result.items.into_iter().map(to_response).collect();

    Ok(Json(serde_json::json!({
        "success": true,
        "items": items,
        "total": result.total,
        "page": result.page,
        "per_page": result.per_page,
        "total_pages": result.total_pages,
    })))
}

/// Multipart send: a `content` text field and/or one `attachment` file.
pub async fn send(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(chat_id): Path<String>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let cid = ObjectId::parse_str(&chat_id)
        .map_err(|_| ApiError::BadRequest("Invalid chat_id".to_string()))?;

    let mut content = String::new();
    let mut upload: Option<(String, String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Multipart error: {}", e)))?
    {
        match field.name().unwrap_or("") {
            "content" => {
                content = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read field: {}", e)))?;
            }
            "attachment" => {
                let original_name = field.file_name().unwrap_or("unnamed").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read file: {}", e)))?;
                upload = Some((original_name, content_type, bytes.to_vec()));
            }
            _ => {}
        }
    }

    let attachment = match upload {
        Some((original_name, content_type, bytes)) => {
            let policy = state.uploads.policy(FileCategory::Chat);
            let accepted = state
                .uploads
                .accept(&policy, auth.user_id, &original_name, &content_type, &bytes)
                .await?;
            Some(Attachment {
                file_id: accepted.file_id,
                filename: accepted.filename,
                original_name: accepted.original_name,
                url: accepted.url,
                size: accepted.size,
                content_type: accepted.content_type,
            })
        }
        None => None,
    };

    let message = state
        .chat
        .send_message(cid, auth.user_id, content, attachment)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "success": true,
            "message": to_response(message),
        })),
    ))
}

pub async fn update(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((chat_id, message_id)): Path<(String, String)>,
    Json(body): Json<UpdateMessageRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let cid = ObjectId::parse_str(&chat_id)
        .map_err(|_| ApiError::BadRequest("Invalid chat_id".to_string()))?;
    let mid = ObjectId::parse_str(&message_id)
        .map_err(|_| ApiError::BadRequest("Invalid message_id".to_string()))?;

    body.validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let message = state
        .chat
        .edit_message(cid, mid, auth.user_id, body.content)
        .await?;

    Ok(Json(serde_json::json!({
        "success": true,
        "message": to_response(message),
    })))
}

pub async fn delete(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((chat_id, message_id)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let cid = ObjectId::parse_str(&chat_id)
        .map_err(|_| ApiError::BadRequest("Invalid chat_id".to_string()))?;
    let mid = ObjectId::parse_str(&message_id)
        .map_err(|_| ApiError::BadRequest("Invalid message_id".to_string()))?;

    state.chat.delete_message(cid, mid, auth.user_id).await?;

    Ok(Json(serde_json::json!({ "success": true, "deleted": true })))
}

pub async fn toggle_reaction(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((chat_id, message_id)): Path<(String, String)>,
    Json(body): Json<ReactionRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let cid = ObjectId::parse_str(&chat_id)
        .map_err(|_| ApiError::BadRequest("Invalid chat_id".to_string()))?;
    let mid = ObjectId::parse_str(&message_id)
        .map_err(|_| ApiError::BadRequest("Invalid message_id".to_string()))?;

    if body.emoji.trim().is_empty() {
        return Err(ApiError::BadRequest("Missing emoji".to_string()));
    }

    let reactions = state
        .chat
        .toggle_reaction(cid, mid, auth.user_id, body.emoji)
        .await?;

    let reactions: Vec<ReactionResponse> = reactions
        .into_iter()
        .map(|r| ReactionResponse {
            user_id: r.user_id.to_hex(),
            emoji: r.emoji,
            created_at: r.created_at.try_to_rfc3339_string().unwrap_or_default(),
        })
        .collect();

    Ok(Json(serde_json::json!({
        "success": true,
        "reactions": reactions,
    })))
}

pub async fn mark_read(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((chat_id, message_id)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let cid = ObjectId::parse_str(&chat_id)
        .map_err(|_| ApiError::BadRequest("Invalid chat_id".to_string()))?;
    let mid = ObjectId::parse_str(&message_id)
        .map_err(|_| ApiError::BadRequest("Invalid message_id".to_string()))?;

    state.chat.mark_read(cid, mid, auth.user_id).await?;

    Ok(Json(serde_json::json!({ "success": true })))
}
