use axum::{
    Json,
    body::Body,
    extract::{Multipart, Path, State},
    response::Response,
};
use bson::oid::ObjectId;
use careercompass_db::models::{FileCategory, StoredFile};
use careercompass_services::storage::{UploadError, UploadedFile};
use mongodb::gridfs::GridFsDownloadStream;
use serde::Serialize;

use crate::{
    error::ApiError,
    extractors::auth::{AuthUser, MaybeAuthUser},
    state::AppState,
};

#[derive(Debug, Serialize)]
pub struct FileResponse {
    pub id: String,
    pub filename: String,
    pub original_name: String,
    pub content_type: String,
    pub size: u64,
    pub category: &'static str,
    pub url: String,
    pub uploaded_at: String,
}

fn to_response(f: StoredFile) -> FileResponse {
    FileResponse {
        id: f.id.to_hex(),
        url: format!("/api/file/{}", f.filename),
        filename: f.filename,
        original_name: f.metadata.original_name,
        content_type: f.metadata.content_type,
        size: f.length,
        category: f.metadata.category.as_str(),
        uploaded_at: f
            .metadata
            .uploaded_at
            .try_to_rfc3339_string()
            .unwrap_or_default(),
    }
}

fn descriptor_response(f: &UploadedFile) -> serde_json::Value {
    serde_json::json!({
        "id": f.file_id.to_hex(),
        "filename": f.filename,
        "original_name": f.original_name,
        "size": f.size,
        "content_type": f.content_type,
        "url": f.url,
    })
}

/// Generic upload endpoint. The multipart form carries one or more `file`
/// parts plus a `category` text field naming the upload's purpose; the
/// category decides the allow-list now and the access policy at read time.
pub async fn upload(
    State(state): State<AppState>,
    auth: AuthUser,
    mut multipart: Multipart,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mut category: Option<FileCategory> = None;
    let mut files: Vec<(String, String, Vec<u8>)> = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Multipart error: {}", e)))?
    {
        match field.name().unwrap_or("") {
            "category" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read field: {}", e)))?;
                category = Some(
                    FileCategory::parse(&text)
                        .ok_or_else(|| ApiError::BadRequest(format!("Unknown category '{}'", text)))?,
                );
            }
            "file" => {
                let limit = state.uploads.max_files_per_request();
                if files.len() >= limit {
                    return Err(UploadError::TooManyFiles { limit }.into());
                }
                let original_name = field.file_name().unwrap_or("unnamed").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read file: {}", e)))?;
                files.push((original_name, content_type, bytes.to_vec()));
            }
            _ => {}
        }
    }

    if files.is_empty() {
        return Err(UploadError::MissingFile.into());
    }

    let category = category.unwrap_or(FileCategory::General);
    let policy = state.uploads.policy(category);

    let mut accepted = Vec::with_capacity(files.len());
    for (original_name, content_type, bytes) in &files {
        let file = state
            .uploads
            .accept(&policy, auth.user_id, original_name, content_type, bytes)
            .await?;
        accepted.push(file);
    }

    let descriptors: Vec<serde_json::Value> = accepted.iter().map(descriptor_response).collect();

    Ok(Json(serde_json::json!({
        "success": true,
        "files": descriptors,
    })))
}

/// Streams a stored object inline. Private categories (resumes, chat
/// attachments) require an authenticated principal; the check runs at
/// lookup time, before any content leaves the store.
pub async fn stream(
    State(state): State<AppState>,
    maybe_auth: MaybeAuthUser,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    let file = state.object_store.metadata_by_filename(&filename).await?;

    if file.metadata.category.is_private() && maybe_auth.0.is_none() {
        return Err(ApiError::Unauthorized(
            "Authentication required".to_string(),
        ));
    }

    let download = state.object_store.open_read_stream(file.id).await?;

    Ok(Response::builder()
        .header("Content-Type", &file.metadata.content_type)
        .header("Content-Length", file.length.to_string())
        .header(
            "Content-Disposition",
            format!("inline; filename=\"{}\"", file.metadata.original_name),
        )
        .body(stream_body(download))
        .unwrap())
}

pub async fn download(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    let file_id = ObjectId::parse_str(&filename)
        .map_err(|_| ApiError::BadRequest("Invalid file_id".to_string()))?;

    let file = state.object_store.metadata_by_id(file_id).await?;
    let download = state.object_store.open_read_stream(file.id).await?;

    Ok(Response::builder()
        .header("Content-Type", &file.metadata.content_type)
        .header("Content-Length", file.length.to_string())
        .header(
            "Content-Disposition",
            format!("attachment; filename=\"{}\"", file.metadata.original_name),
        )
        .body(stream_body(download))
        .unwrap())
}

pub async fn delete(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(filename): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let file_id = ObjectId::parse_str(&filename)
        .map_err(|_| ApiError::BadRequest("Invalid file_id".to_string()))?;

    let file = state.object_store.metadata_by_id(file_id).await?;
    if file.metadata.uploaded_by != auth.user_id && !auth.is_admin() {
        return Err(ApiError::Forbidden(
            "Only the uploader can delete a file".to_string(),
        ));
    }

    state.object_store.delete(file_id).await?;

    Ok(Json(serde_json::json!({ "success": true, "deleted": true })))
}

pub async fn list_for_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(user_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let uid = ObjectId::parse_str(&user_id)
        .map_err(|_| ApiError::BadRequest("Invalid user_id".to_string()))?;

    if uid != auth.user_id && !auth.is_admin() {
        return Err(ApiError::Forbidden(
            "Cannot list another user's files".to_string(),
        ));
    }

    let files = state.object_store.list_by_uploader(uid).await?;
    let items: Vec<FileResponse> = files.into_iter().map(to_response).collect();

    Ok(Json(serde_json::json!({
        "success": true,
        "items": items,
    })))
}

/// Chunked transfer from GridFS; nothing buffers the whole object.
fn stream_body(download: GridFsDownloadStream) -> Body {
    let chunks = futures::stream::try_unfold(download, |mut stream| async move {
        use futures::io::AsyncReadExt;
        let mut buf = vec![0u8; 64 * 1024];
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            Ok::<_, std::io::Error>(None)
        } else {
            buf.truncate(n);
            Ok(Some((buf, stream)))
        }
    });
    Body::from_stream(chunks)
}
