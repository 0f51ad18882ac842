use std::path::Path;
use std::sync::Arc;

use bson::{DateTime, oid::ObjectId};
use careercompass_config::UploadSettings;
use careercompass_db::models::{FileCategory, StoredFileMetadata};
use nanoid::nanoid;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use super::object_store::{ObjectStore, ObjectStoreError};

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("File too large: {size} bytes exceeds the {limit} byte limit")]
    FileTooLarge { size: u64, limit: u64 },
    #[error("Too many files: at most {limit} per request")]
    TooManyFiles { limit: usize },
    #[error("Invalid file type '.{extension}': allowed types are {allowed}")]
    InvalidFileType {
        extension: String,
        allowed: &'static str,
    },
    #[error("No file provided")]
    MissingFile,
    #[error(transparent)]
    Store(#[from] ObjectStoreError),
}

const DOCUMENT_EXTENSIONS: &[&str] = &["pdf", "doc", "docx"];
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];
const GENERAL_EXTENSIONS: &[&str] = &[
    "pdf", "doc", "docx", "jpg", "jpeg", "png", "gif", "webp",
];

const DOCUMENT_MIME_TYPES: &[&str] = &[
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
];

/// Per-category upload constraints: which extensions and MIME types a field
/// accepts, and the server-side size ceiling. The category is always passed
/// explicitly by the caller; nothing is inferred from a route path.
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    pub category: FileCategory,
    pub max_size_bytes: u64,
    pub max_files: usize,
}

impl UploadPolicy {
    pub fn for_category(category: FileCategory, settings: &UploadSettings) -> Self {
        Self {
            category,
            max_size_bytes: settings.max_file_size_bytes,
            max_files: settings.max_files_per_request,
        }
    }

    pub fn validate(
        &self,
        original_name: &str,
        content_type: &str,
        size: u64,
    ) -> Result<(), UploadError> {
        if size > self.max_size_bytes {
            return Err(UploadError::FileTooLarge {
                size,
                limit: self.max_size_bytes,
            });
        }

        let extension = extension_of(original_name);
        let allowed = allowed_extensions(self.category);
        if !allowed.contains(&extension.as_str()) || !mime_allowed(self.category, content_type) {
            return Err(UploadError::InvalidFileType {
                extension,
                allowed: allowed_list(self.category),
            });
        }

        Ok(())
    }
}

fn allowed_extensions(category: FileCategory) -> &'static [&'static str] {
    match category {
        FileCategory::Resumes => DOCUMENT_EXTENSIONS,
        FileCategory::Avatars | FileCategory::Events => IMAGE_EXTENSIONS,
        FileCategory::Chat | FileCategory::Resources | FileCategory::General => GENERAL_EXTENSIONS,
    }
}

fn allowed_list(category: FileCategory) -> &'static str {
    match category {
        FileCategory::Resumes => "pdf, doc, docx",
        FileCategory::Avatars | FileCategory::Events => "jpg, jpeg, png, gif, webp",
        FileCategory::Chat | FileCategory::Resources | FileCategory::General => {
            "pdf, doc, docx, jpg, jpeg, png, gif, webp"
        }
    }
}

fn mime_allowed(category: FileCategory, content_type: &str) -> bool {
    match category {
        FileCategory::Resumes => DOCUMENT_MIME_TYPES.contains(&content_type),
        FileCategory::Avatars | FileCategory::Events => content_type.starts_with("image/"),
        FileCategory::Chat | FileCategory::Resources | FileCategory::General => {
            DOCUMENT_MIME_TYPES.contains(&content_type) || content_type.starts_with("image/")
        }
    }
}

fn extension_of(original_name: &str) -> String {
    Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase()
}

/// Unique storage key: sanitized stem, millisecond timestamp, random
/// suffix, original extension.
pub fn storage_key(original_name: &str) -> String {
    let stem = Path::new(original_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("upload");
    let stem: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '-' })
        .take(64)
        .collect();

    let extension = extension_of(original_name);
    let suffix = nanoid!(8, &nanoid::alphabet::SAFE);

    if extension.is_empty() {
        format!("{}-{}-{}", stem, DateTime::now().timestamp_millis(), suffix)
    } else {
        format!(
            "{}-{}-{}.{}",
            stem,
            DateTime::now().timestamp_millis(),
            suffix,
            extension
        )
    }
}

/// Normalized descriptor handed to whatever consumes the upload (message
/// send, profile update, ...). Returned explicitly; the gateway never
/// mutates ambient request state.
#[derive(Debug, Clone, Serialize)]
pub struct UploadedFile {
    pub file_id: ObjectId,
    pub filename: String,
    pub original_name: String,
    pub size: u64,
    pub content_type: String,
    pub url: String,
}

/// Validates incoming files against a policy and writes accepted ones
/// through the object store.
pub struct UploadGateway {
    store: Arc<ObjectStore>,
    settings: UploadSettings,
}

impl UploadGateway {
    pub fn new(store: Arc<ObjectStore>, settings: UploadSettings) -> Self {
        Self { store, settings }
    }

    pub fn policy(&self, category: FileCategory) -> UploadPolicy {
        UploadPolicy::for_category(category, &self.settings)
    }

    pub fn max_files_per_request(&self) -> usize {
        self.settings.max_files_per_request
    }

    pub async fn accept(
        &self,
        policy: &UploadPolicy,
        uploader_id: ObjectId,
        original_name: &str,
        content_type: &str,
        data: &[u8],
    ) -> Result<UploadedFile, UploadError> {
        policy.validate(original_name, content_type, data.len() as u64)?;

        let filename = storage_key(original_name);
        let metadata = StoredFileMetadata {
            category: policy.category,
            uploaded_by: uploader_id,
            uploaded_at: DateTime::now(),
            original_name: original_name.to_string(),
            content_type: content_type.to_string(),
        };

        let file_id = self.store.put(&filename, &metadata, data).await?;

        info!(
            %file_id,
            filename,
            category = policy.category.as_str(),
            size = data.len(),
            "Accepted upload"
        );

        Ok(UploadedFile {
            file_id,
            filename: filename.clone(),
            original_name: original_name.to_string(),
            size: data.len() as u64,
            content_type: content_type.to_string(),
            url: format!("/api/file/{}", filename),
        })
    }
}
