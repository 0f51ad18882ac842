use bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub chat_id: ObjectId,
    pub sender_id: ObjectId,
    pub content: String,
    #[serde(default)]
    pub message_type: MessageType,
    pub attachment: Option<Attachment>,
    #[serde(default)]
    pub read_by: Vec<ReadReceipt>,
    #[serde(default)]
    pub reactions: Vec<Reaction>,
    #[serde(default)]
    pub is_edited: bool,
    pub edited_at: Option<DateTime>,
    #[serde(default)]
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    #[default]
    Text,
    File,
    Image,
}

impl MessageType {
    /// Derived from the attachment: none is text, `image/*` is image,
    /// anything else is a generic file.
    pub fn for_attachment(attachment: Option<&Attachment>) -> Self {
        match attachment {
            None => MessageType::Text,
            Some(a) if a.content_type.starts_with("image/") => MessageType::Image,
            Some(_) => MessageType::File,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub file_id: ObjectId,
    /// Generated storage key, unique across the bucket.
    pub filename: String,
    pub original_name: String,
    pub url: String,
    pub size: u64,
    pub content_type: String,
}

/// At most one entry per user; the guarded `$push` in the DAO keeps it so.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadReceipt {
    pub user_id: ObjectId,
    pub read_at: DateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reaction {
    pub user_id: ObjectId,
    pub emoji: String,
    pub created_at: DateTime,
}

impl Message {
    pub const COLLECTION: &'static str = "messages";

    /// Placeholder a deleted message's content is replaced with.
    pub const TOMBSTONE: &'static str = "This message was deleted";

    pub fn is_read_by(&self, user_id: ObjectId) -> bool {
        self.read_by.iter().any(|r| r.user_id == user_id)
    }

    pub fn has_reaction(&self, user_id: ObjectId, emoji: &str) -> bool {
        self.reactions
            .iter()
            .any(|r| r.user_id == user_id && r.emoji == emoji)
    }
}
