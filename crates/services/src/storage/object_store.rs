use bson::{Bson, doc, oid::ObjectId};
use careercompass_db::models::{FileCategory, StoredFile, StoredFileMetadata};
use futures::TryStreamExt;
use mongodb::Database;
use mongodb::gridfs::{FilesCollectionDocument, GridFsBucket, GridFsDownloadStream};
use mongodb::options::GridFsBucketOptions;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("Object not found")]
    NotFound,
    #[error("Malformed object record: {0}")]
    Malformed(String),
    #[error("MongoDB error: {0}")]
    Mongo(mongodb::error::Error),
    #[error("BSON serialization error: {0}")]
    BsonSer(#[from] bson::ser::Error),
    #[error("BSON deserialization error: {0}")]
    BsonDe(#[from] bson::de::Error),
    #[error("Stream error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<mongodb::error::Error> for ObjectStoreError {
    fn from(err: mongodb::error::Error) -> Self {
        if let mongodb::error::ErrorKind::GridFs(ref kind) = *err.kind {
            if matches!(
                kind,
                mongodb::error::GridFsErrorKind::FileNotFound { .. }
            ) {
                return ObjectStoreError::NotFound;
            }
        }
        ObjectStoreError::Mongo(err)
    }
}

pub type StoreResult<T> = Result<T, ObjectStoreError>;

/// Blob storage over a GridFS bucket. Constructed once at startup and
/// injected wherever uploads or downloads happen; nothing holds the bucket
/// in module-level state.
pub struct ObjectStore {
    bucket: GridFsBucket,
}

impl ObjectStore {
    pub fn new(db: &Database, bucket_name: &str) -> Self {
        let options = GridFsBucketOptions::builder()
            .bucket_name(bucket_name.to_string())
            .build();
        Self {
            bucket: db.gridfs_bucket(options),
        }
    }

    /// Writes blob and metadata under the given storage key. On a failed or
    /// interrupted write the upload is aborted so no partial object stays
    /// addressable.
    pub async fn put(
        &self,
        filename: &str,
        metadata: &StoredFileMetadata,
        data: &[u8],
    ) -> StoreResult<ObjectId> {
        use futures::io::AsyncWriteExt;

        let metadata_doc = bson::to_document(metadata)?;
        let mut stream = self
            .bucket
            .open_upload_stream(filename)
            .metadata(metadata_doc)
            .await?;

        let id = stream
            .id()
            .as_object_id()
            .ok_or_else(|| ObjectStoreError::Malformed("upload id is not an ObjectId".into()))?;

        let write = async {
            stream.write_all(data).await?;
            stream.close().await
        };
        if let Err(err) = write.await {
            let _ = stream.abort().await;
            return Err(ObjectStoreError::Io(err));
        }

        debug!(%id, filename, size = data.len(), "Stored object");
        Ok(id)
    }

    pub async fn metadata_by_filename(&self, filename: &str) -> StoreResult<StoredFile> {
        self.find_first(doc! { "filename": filename }).await
    }

    pub async fn metadata_by_id(&self, id: ObjectId) -> StoreResult<StoredFile> {
        self.find_first(doc! { "_id": id }).await
    }

    async fn find_first(&self, filter: bson::Document) -> StoreResult<StoredFile> {
        let mut cursor = self.bucket.find(filter).limit(1).await?;
        let files_doc = cursor
            .try_next()
            .await
            .map_err(ObjectStoreError::from)?
            .ok_or(ObjectStoreError::NotFound)?;
        stored_file_from(files_doc)
    }

    /// Chunked read of the object's content; never buffers the whole blob.
    pub async fn open_read_stream(&self, id: ObjectId) -> StoreResult<GridFsDownloadStream> {
        Ok(self.bucket.open_download_stream(Bson::ObjectId(id)).await?)
    }

    pub async fn delete(&self, id: ObjectId) -> StoreResult<()> {
        self.bucket.delete(Bson::ObjectId(id)).await?;
        debug!(%id, "Deleted object");
        Ok(())
    }

    /// Snapshot of the caller's uploads, newest first.
    pub async fn list_by_uploader(&self, uploader_id: ObjectId) -> StoreResult<Vec<StoredFile>> {
        let cursor = self
            .bucket
            .find(doc! { "metadata.uploaded_by": uploader_id })
            .sort(doc! { "uploadDate": -1 })
            .await?;
        collect_stored_files(cursor).await
    }

    /// Objects in a category uploaded before the cutoff; feeds the orphan
    /// sweep.
    pub async fn find_older_than(
        &self,
        category: FileCategory,
        cutoff: bson::DateTime,
    ) -> StoreResult<Vec<StoredFile>> {
        let cursor = self
            .bucket
            .find(doc! {
                "metadata.category": category.as_str(),
                "uploadDate": { "$lt": cutoff },
            })
            .await?;
        collect_stored_files(cursor).await
    }
}

async fn collect_stored_files(
    mut cursor: mongodb::Cursor<FilesCollectionDocument>,
) -> StoreResult<Vec<StoredFile>> {
    let mut files = Vec::new();
    while let Some(files_doc) = cursor.try_next().await.map_err(ObjectStoreError::from)? {
        files.push(stored_file_from(files_doc)?);
    }
    Ok(files)
}

fn stored_file_from(files_doc: FilesCollectionDocument) -> StoreResult<StoredFile> {
    let id = files_doc
        .id
        .as_object_id()
        .ok_or_else(|| ObjectStoreError::Malformed("file id is not an ObjectId".into()))?;
    let filename = files_doc
        .filename
        .clone()
        .ok_or_else(|| ObjectStoreError::Malformed("file record has no filename".into()))?;
    let metadata_doc = files_doc
        .metadata
        .clone()
        .ok_or_else(|| ObjectStoreError::Malformed("file record has no metadata".into()))?;
    let metadata: StoredFileMetadata = bson::from_document(metadata_doc)?;

    Ok(StoredFile {
        id,
        filename,
        length: files_doc.length,
        upload_date: files_doc.upload_date,
        metadata,
    })
}
