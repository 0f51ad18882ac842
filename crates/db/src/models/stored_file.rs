use bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};

/// Metadata view of one object in the GridFS bucket. The document itself is
/// owned by the bucket (`uploads.files`); this type is reconstructed from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredFile {
    pub id: ObjectId,
    /// Generated storage key; globally unique within the bucket.
    pub filename: String,
    pub length: u64,
    pub upload_date: DateTime,
    pub metadata: StoredFileMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredFileMetadata {
    pub category: FileCategory,
    pub uploaded_by: ObjectId,
    pub uploaded_at: DateTime,
    pub original_name: String,
    pub content_type: String,
}

/// Classification tag driving both upload validation and the read-time
/// access policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileCategory {
    Resumes,
    Events,
    Avatars,
    Chat,
    Resources,
    General,
}

impl FileCategory {
    /// Private categories require an authenticated principal at read time.
    pub fn is_private(self) -> bool {
        matches!(self, FileCategory::Resumes | FileCategory::Chat)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FileCategory::Resumes => "resumes",
            FileCategory::Events => "events",
            FileCategory::Avatars => "avatars",
            FileCategory::Chat => "chat",
            FileCategory::Resources => "resources",
            FileCategory::General => "general",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "resumes" => Some(FileCategory::Resumes),
            "events" => Some(FileCategory::Events),
            "avatars" => Some(FileCategory::Avatars),
            "chat" => Some(FileCategory::Chat),
            "resources" => Some(FileCategory::Resources),
            "general" => Some(FileCategory::General),
            _ => None,
        }
    }
}

impl StoredFile {
    /// GridFS bucket name; the backing collections are `uploads.files` and
    /// `uploads.chunks`.
    pub const BUCKET: &'static str = "uploads";
}
