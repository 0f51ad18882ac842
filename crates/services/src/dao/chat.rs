use bson::{DateTime, Document, doc, oid::ObjectId};
use careercompass_db::models::{Chat, ParticipantSlot, UnreadCount};
use mongodb::Database;
use tracing::debug;

use super::base::{BaseDao, DaoError, DaoResult};

pub struct ChatDao {
    pub base: BaseDao<Chat>,
}

impl ChatDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, Chat::COLLECTION),
        }
    }

    pub async fn get(&self, chat_id: ObjectId) -> DaoResult<Chat> {
        self.base.find_by_id(chat_id).await
    }

    pub async fn find_by_pair(
        &self,
        mentee_id: ObjectId,
        mentor_id: ObjectId,
    ) -> DaoResult<Option<Chat>> {
        self.base
            .find_one(doc! { "mentee_id": mentee_id, "mentor_id": mentor_id })
            .await
    }

    /// Returns the unique chat for the pair, creating it on first contact.
    /// A concurrent create loses the duplicate-key race on the unique
    /// (mentee_id, mentor_id) index and resolves by re-fetching the winner's
    /// row, so the caller never sees the conflict.
    pub async fn get_or_create(
        &self,
        mentee_id: ObjectId,
        mentor_id: ObjectId,
    ) -> DaoResult<Chat> {
        if let Some(chat) = self.find_by_pair(mentee_id, mentor_id).await? {
            return Ok(chat);
        }

        let now = DateTime::now();
        let chat = Chat {
            id: None,
            mentee_id,
            mentor_id,
            last_message_id: None,
            last_activity_at: now,
            unread_count: UnreadCount::default(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        match self.base.insert_one(&chat).await {
            Ok(id) => self.base.find_by_id(id).await,
            Err(DaoError::DuplicateKey(_)) => {
                debug!(%mentee_id, %mentor_id, "Lost chat-creation race, fetching existing");
                self.find_by_pair(mentee_id, mentor_id)
                    .await?
                    .ok_or(DaoError::NotFound)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn find_for_user(&self, user_id: ObjectId) -> DaoResult<Vec<Chat>> {
        self.base
            .find_many(
                doc! {
                    "$or": [{ "mentee_id": user_id }, { "mentor_id": user_id }],
                    "is_active": true,
                },
                Some(doc! { "last_activity_at": -1 }),
            )
            .await
    }

    /// Applied after the message insert: repoints the last-message summary
    /// and `$inc`s the recipient slot so racing sends both count.
    pub async fn record_message(
        &self,
        chat_id: ObjectId,
        message_id: ObjectId,
        recipient: ParticipantSlot,
    ) -> DaoResult<bool> {
        let mut inc = Document::new();
        inc.insert(recipient.unread_field(), 1);

        self.base
            .update_by_id(
                chat_id,
                doc! {
                    "$set": {
                        "last_message_id": message_id,
                        "last_activity_at": DateTime::now(),
                    },
                    "$inc": inc,
                },
            )
            .await
    }

    pub async fn reset_unread(
        &self,
        chat_id: ObjectId,
        reader: ParticipantSlot,
    ) -> DaoResult<bool> {
        let mut set = Document::new();
        set.insert(reader.unread_field(), 0);

        self.base.update_by_id(chat_id, doc! { "$set": set }).await
    }

    pub async fn set_last_message(
        &self,
        chat_id: ObjectId,
        message_id: Option<ObjectId>,
    ) -> DaoResult<bool> {
        let value = match message_id {
            Some(id) => bson::Bson::ObjectId(id),
            None => bson::Bson::Null,
        };
        self.base
            .update_by_id(chat_id, doc! { "$set": { "last_message_id": value } })
            .await
    }
}
