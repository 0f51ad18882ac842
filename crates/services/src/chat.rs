use bson::{DateTime, oid::ObjectId};
use careercompass_config::ChatSettings;
use careercompass_db::models::{Attachment, Chat, Message, Reaction, ReadReceipt};
use mongodb::Database;
use thiserror::Error;
use tracing::warn;

use crate::dao::base::{DaoError, PaginatedResult, PaginationParams};
use crate::dao::{ChatDao, MessageDao};

#[derive(Debug, Error)]
pub enum ChatError {
    #[error(transparent)]
    Dao(#[from] DaoError),
    #[error("A chat requires two distinct participants")]
    SelfChat,
    #[error("Not a participant of this chat")]
    NotParticipant,
    #[error("This chat is no longer active")]
    ChatInactive,
    #[error("Only the sender can modify a message")]
    NotSender,
    #[error("Message requires content or an attachment")]
    EmptyMessage,
    #[error("Message content exceeds {0} characters")]
    ContentTooLong(usize),
    #[error("Message can no longer be edited")]
    EditWindowExpired,
    #[error("Message has been deleted")]
    MessageDeleted,
}

/// Orchestrates the chat and message DAOs: participant checks, unread
/// bookkeeping, edit/delete windows, reaction toggles and read receipts.
pub struct ChatService {
    chats: ChatDao,
    messages: MessageDao,
    settings: ChatSettings,
}

impl ChatService {
    pub fn new(db: &Database, settings: ChatSettings) -> Self {
        Self {
            chats: ChatDao::new(db),
            messages: MessageDao::new(db),
            settings,
        }
    }

    pub async fn get_or_create(
        &self,
        mentee_id: ObjectId,
        mentor_id: ObjectId,
    ) -> Result<Chat, ChatError> {
        if mentee_id == mentor_id {
            return Err(ChatError::SelfChat);
        }
        Ok(self.chats.get_or_create(mentee_id, mentor_id).await?)
    }

    pub async fn list_for_user(&self, user_id: ObjectId) -> Result<Vec<Chat>, ChatError> {
        Ok(self.chats.find_for_user(user_id).await?)
    }

    /// One page of a chat's history in chronological order (the store is
    /// paginated newest-first, so page 1 holds the most recent messages).
    ///
    /// Listing is also the implicit read acknowledgment: every message on
    /// the page sent by the other participant and not yet read gets a
    /// receipt, and the requester's unread slot resets to zero.
    pub async fn list_messages(
        &self,
        chat_id: ObjectId,
        requester_id: ObjectId,
        params: &PaginationParams,
    ) -> Result<PaginatedResult<Message>, ChatError> {
        let chat = self.chats.get(chat_id).await?;
        let slot = chat.slot_of(requester_id).ok_or(ChatError::NotParticipant)?;

        let mut page = self.messages.find_in_chat(chat_id, params).await?;

        let unread_ids: Vec<ObjectId> = page
            .items
            .iter()
            .filter(|m| m.sender_id != requester_id && !m.is_read_by(requester_id))
            .filter_map(|m| m.id)
            .collect();

        if !unread_ids.is_empty() {
            self.messages
                .mark_read_many(&unread_ids, requester_id)
                .await?;
            // Patch the snapshot we already hold so the caller sees the
            // receipts this listing just produced.
            let read_at = DateTime::now();
            for message in page.items.iter_mut() {
                if message.id.is_some_and(|id| unread_ids.contains(&id)) {
                    message.read_by.push(ReadReceipt {
                        user_id: requester_id,
                        read_at,
                    });
                }
            }
        }

        self.chats.reset_unread(chat_id, slot).await?;

        page.items.reverse();
        Ok(page)
    }

    pub async fn send_message(
        &self,
        chat_id: ObjectId,
        sender_id: ObjectId,
        content: String,
        attachment: Option<Attachment>,
    ) -> Result<Message, ChatError> {
        let chat = self.chats.get(chat_id).await?;
        let recipient = chat
            .recipient_slot_of(sender_id)
            .ok_or(ChatError::NotParticipant)?;
        if !chat.is_active {
            return Err(ChatError::ChatInactive);
        }

        let content = content.trim().to_string();
        if content.is_empty() && attachment.is_none() {
            return Err(ChatError::EmptyMessage);
        }
        self.check_length(&content)?;

        let message = self
            .messages
            .create(chat_id, sender_id, content, attachment)
            .await?;
        let message_id = message.id.expect("persisted message has an id");

        // The message is already durable; a failed summary update leaves the
        // chat aggregate lagging, which the next send or listing corrects.
        if let Err(err) = self
            .chats
            .record_message(chat_id, message_id, recipient)
            .await
        {
            warn!(%chat_id, %message_id, %err, "Chat summary update failed after send");
        }

        Ok(message)
    }

    pub async fn edit_message(
        &self,
        chat_id: ObjectId,
        message_id: ObjectId,
        requester_id: ObjectId,
        new_content: String,
    ) -> Result<Message, ChatError> {
        let message = self.messages.get_in_chat(chat_id, message_id).await?;
        if message.sender_id != requester_id {
            return Err(ChatError::NotSender);
        }
        if message.is_deleted {
            return Err(ChatError::MessageDeleted);
        }
        if self.age_secs(message.created_at) > self.settings.edit_window_secs as i64 {
            return Err(ChatError::EditWindowExpired);
        }

        let new_content = new_content.trim().to_string();
        if new_content.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        self.check_length(&new_content)?;

        self.messages.set_content(message_id, new_content).await?;
        Ok(self.messages.get(message_id).await?)
    }

    /// Tombstones the message: content replaced, row retained, terminal.
    pub async fn delete_message(
        &self,
        chat_id: ObjectId,
        message_id: ObjectId,
        requester_id: ObjectId,
    ) -> Result<(), ChatError> {
        let message = self.messages.get_in_chat(chat_id, message_id).await?;
        if message.sender_id != requester_id {
            return Err(ChatError::NotSender);
        }
        if message.is_deleted {
            return Err(ChatError::MessageDeleted);
        }

        self.messages.tombstone(message_id).await?;

        // Keep the chat summary pointing at a visible message.
        let chat = self.chats.get(chat_id).await?;
        if chat.last_message_id == Some(message_id) {
            let latest = self.messages.latest_visible(chat_id).await?;
            self.chats
                .set_last_message(chat_id, latest.and_then(|m| m.id))
                .await?;
        }

        Ok(())
    }

    /// Toggle semantics: a (user, emoji) pair already present is removed,
    /// otherwise appended. Two identical calls restore the original set.
    pub async fn toggle_reaction(
        &self,
        chat_id: ObjectId,
        message_id: ObjectId,
        user_id: ObjectId,
        emoji: String,
    ) -> Result<Vec<Reaction>, ChatError> {
        let chat = self.chats.get(chat_id).await?;
        if !chat.is_participant(user_id) {
            return Err(ChatError::NotParticipant);
        }

        let message = self.messages.get_in_chat(chat_id, message_id).await?;
        if message.is_deleted {
            return Err(ChatError::MessageDeleted);
        }

        if message.has_reaction(user_id, &emoji) {
            self.messages
                .pull_reaction(message_id, user_id, &emoji)
                .await?;
        } else {
            let reaction = Reaction {
                user_id,
                emoji,
                created_at: DateTime::now(),
            };
            self.messages.push_reaction(message_id, &reaction).await?;
        }

        Ok(self.messages.get(message_id).await?.reactions)
    }

    /// Explicit single-message acknowledgment. Idempotent; a sender marking
    /// their own message is a no-op (receipts only track the recipient).
    pub async fn mark_read(
        &self,
        chat_id: ObjectId,
        message_id: ObjectId,
        user_id: ObjectId,
    ) -> Result<(), ChatError> {
        let chat = self.chats.get(chat_id).await?;
        if !chat.is_participant(user_id) {
            return Err(ChatError::NotParticipant);
        }

        let message = self.messages.get_in_chat(chat_id, message_id).await?;
        if message.sender_id == user_id {
            return Ok(());
        }

        self.messages.mark_read(message_id, user_id).await?;
        Ok(())
    }

    fn check_length(&self, content: &str) -> Result<(), ChatError> {
        if content.chars().count() > self.settings.max_message_length {
            return Err(ChatError::ContentTooLong(self.settings.max_message_length));
        }
        Ok(())
    }

    fn age_secs(&self, created_at: DateTime) -> i64 {
        (DateTime::now().timestamp_millis() - created_at.timestamp_millis()) / 1000
    }
}
