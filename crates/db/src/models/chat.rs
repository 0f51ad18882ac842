use bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};

/// One conversation per (mentee, mentor) pair, enforced by a unique
/// compound index. Never hard-deleted; `is_active` soft-disables it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub mentee_id: ObjectId,
    pub mentor_id: ObjectId,
    /// Latest non-deleted message; lookup only, listing never joins on it.
    pub last_message_id: Option<ObjectId>,
    pub last_activity_at: DateTime,
    #[serde(default)]
    pub unread_count: UnreadCount,
    #[serde(default = "bool_true")]
    pub is_active: bool,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

/// Per-participant counter of messages that participant has not read yet.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnreadCount {
    #[serde(default)]
    pub mentee: u32,
    #[serde(default)]
    pub mentor: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticipantSlot {
    Mentee,
    Mentor,
}

impl ParticipantSlot {
    /// Dotted field path of this slot's unread counter.
    pub fn unread_field(self) -> &'static str {
        match self {
            ParticipantSlot::Mentee => "unread_count.mentee",
            ParticipantSlot::Mentor => "unread_count.mentor",
        }
    }
}

impl Chat {
    pub const COLLECTION: &'static str = "chats";

    pub fn is_participant(&self, user_id: ObjectId) -> bool {
        self.mentee_id == user_id || self.mentor_id == user_id
    }

    pub fn slot_of(&self, user_id: ObjectId) -> Option<ParticipantSlot> {
        if self.mentee_id == user_id {
            Some(ParticipantSlot::Mentee)
        } else if self.mentor_id == user_id {
            Some(ParticipantSlot::Mentor)
        } else {
            None
        }
    }

    /// Slot of the participant on the other side of `sender_id`.
    pub fn recipient_slot_of(&self, sender_id: ObjectId) -> Option<ParticipantSlot> {
        match self.slot_of(sender_id)? {
            ParticipantSlot::Mentee => Some(ParticipantSlot::Mentor),
            ParticipantSlot::Mentor => Some(ParticipantSlot::Mentee),
        }
    }

    pub fn unread_for(&self, slot: ParticipantSlot) -> u32 {
        match slot {
            ParticipantSlot::Mentee => self.unread_count.mentee,
            ParticipantSlot::Mentor => self.unread_count.mentor,
        }
    }
}

fn bool_true() -> bool {
    true
}
