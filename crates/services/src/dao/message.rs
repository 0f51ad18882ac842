use bson::{DateTime, doc, oid::ObjectId};
use careercompass_db::models::{Attachment, Message, MessageType, ReadReceipt, Reaction};
use futures::TryStreamExt;
use mongodb::Database;

use super::base::{BaseDao, DaoResult, PaginatedResult, PaginationParams};

pub struct MessageDao {
    pub base: BaseDao<Message>,
}

impl MessageDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, Message::COLLECTION),
        }
    }

    pub async fn create(
        &self,
        chat_id: ObjectId,
        sender_id: ObjectId,
        content: String,
        attachment: Option<Attachment>,
    ) -> DaoResult<Message> {
        let now = DateTime::now();
        let message = Message {
            id: None,
            chat_id,
            sender_id,
            content,
            message_type: MessageType::for_attachment(attachment.as_ref()),
            attachment,
            read_by: Vec::new(),
            reactions: Vec::new(),
            is_edited: false,
            edited_at: None,
            is_deleted: false,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };

        let id = self.base.insert_one(&message).await?;
        self.base.find_by_id(id).await
    }

    pub async fn get(&self, message_id: ObjectId) -> DaoResult<Message> {
        self.base.find_by_id(message_id).await
    }

    pub async fn get_in_chat(
        &self,
        chat_id: ObjectId,
        message_id: ObjectId,
    ) -> DaoResult<Message> {
        self.base
            .find_one(doc! { "_id": message_id, "chat_id": chat_id })
            .await?
            .ok_or(super::base::DaoError::NotFound)
    }

    /// Newest-first page of the chat's visible history. Deleted messages are
    /// filtered out here; the tombstone content only shows on a direct fetch.
    pub async fn find_in_chat(
        &self,
        chat_id: ObjectId,
        params: &PaginationParams,
    ) -> DaoResult<PaginatedResult<Message>> {
        self.base
            .find_paginated(
                doc! { "chat_id": chat_id, "is_deleted": false },
                Some(doc! { "created_at": -1 }),
                params,
            )
            .await
    }

    pub async fn latest_visible(&self, chat_id: ObjectId) -> DaoResult<Option<Message>> {
        let mut cursor = self
            .base
            .collection()
            .find(doc! { "chat_id": chat_id, "is_deleted": false })
            .sort(doc! { "created_at": -1 })
            .limit(1)
            .await?;
        Ok(cursor.try_next().await?)
    }

    pub async fn set_content(&self, message_id: ObjectId, content: String) -> DaoResult<bool> {
        self.base
            .update_by_id(
                message_id,
                doc! {
                    "$set": {
                        "content": content,
                        "is_edited": true,
                        "edited_at": DateTime::now(),
                    }
                },
            )
            .await
    }

    pub async fn tombstone(&self, message_id: ObjectId) -> DaoResult<bool> {
        self.base
            .update_by_id(
                message_id,
                doc! {
                    "$set": {
                        "content": Message::TOMBSTONE,
                        "is_deleted": true,
                        "deleted_at": DateTime::now(),
                    }
                },
            )
            .await
    }

    pub async fn push_reaction(
        &self,
        message_id: ObjectId,
        reaction: &Reaction,
    ) -> DaoResult<bool> {
        self.base
            .update_by_id(
                message_id,
                doc! { "$push": { "reactions": bson::to_bson(reaction)? } },
            )
            .await
    }

    pub async fn pull_reaction(
        &self,
        message_id: ObjectId,
        user_id: ObjectId,
        emoji: &str,
    ) -> DaoResult<bool> {
        self.base
            .update_by_id(
                message_id,
                doc! { "$pull": { "reactions": { "user_id": user_id, "emoji": emoji } } },
            )
            .await
    }

    /// Guarded append: the filter excludes messages already read by the
    /// user, so repeated calls cannot duplicate a receipt.
    pub async fn mark_read(&self, message_id: ObjectId, user_id: ObjectId) -> DaoResult<bool> {
        let receipt = ReadReceipt {
            user_id,
            read_at: DateTime::now(),
        };
        self.base
            .update_one(
                doc! { "_id": message_id, "read_by.user_id": { "$ne": user_id } },
                doc! { "$push": { "read_by": bson::to_bson(&receipt)? } },
            )
            .await
    }

    pub async fn mark_read_many(
        &self,
        message_ids: &[ObjectId],
        user_id: ObjectId,
    ) -> DaoResult<u64> {
        if message_ids.is_empty() {
            return Ok(0);
        }
        let receipt = ReadReceipt {
            user_id,
            read_at: DateTime::now(),
        };
        self.base
            .update_many(
                doc! {
                    "_id": { "$in": message_ids },
                    "read_by.user_id": { "$ne": user_id },
                },
                doc! { "$push": { "read_by": bson::to_bson(&receipt)? } },
            )
            .await
    }

    /// Whether any message still references the given stored file.
    pub async fn references_file(&self, file_id: ObjectId) -> DaoResult<bool> {
        let count = self
            .base
            .count(doc! { "attachment.file_id": file_id })
            .await?;
        Ok(count > 0)
    }
}
