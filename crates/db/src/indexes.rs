use mongodb::{Database, IndexModel, options::IndexOptions};
use tracing::info;

pub async fn ensure_indexes(db: &Database) -> Result<(), mongodb::error::Error> {
    // Users
    create_indexes(
        db,
        "users",
        vec![
            index_unique(bson::doc! { "email": 1 }),
            index(bson::doc! { "role": 1, "is_active": 1 }),
        ],
    )
    .await?;

    // Chats: one per (mentee, mentor) pair. The unique index is what turns a
    // concurrent first-contact race into a duplicate-key error the DAO can
    // resolve by re-fetching.
    create_indexes(
        db,
        "chats",
        vec![
            index_unique(bson::doc! { "mentee_id": 1, "mentor_id": 1 }),
            index(bson::doc! { "mentee_id": 1, "last_activity_at": -1 }),
            index(bson::doc! { "mentor_id": 1, "last_activity_at": -1 }),
        ],
    )
    .await?;

    // Messages
    create_indexes(
        db,
        "messages",
        vec![
            index(bson::doc! { "chat_id": 1, "created_at": -1 }),
            index(bson::doc! { "chat_id": 1, "is_deleted": 1, "created_at": -1 }),
            index(bson::doc! { "attachment.file_id": 1 }),
        ],
    )
    .await?;

    // GridFS files collection (the bucket itself maintains its chunk
    // indexes; this one serves the per-uploader listing).
    create_indexes(
        db,
        "uploads.files",
        vec![
            index(bson::doc! { "metadata.uploaded_by": 1, "uploadDate": -1 }),
            index(bson::doc! { "metadata.category": 1, "uploadDate": 1 }),
            index(bson::doc! { "filename": 1 }),
        ],
    )
    .await?;

    info!("All indexes ensured");
    Ok(())
}

fn index(keys: bson::Document) -> IndexModel {
    IndexModel::builder().keys(keys).build()
}

fn index_unique(keys: bson::Document) -> IndexModel {
    IndexModel::builder()
        .keys(keys)
        .options(IndexOptions::builder().unique(true).build())
        .build()
}

async fn create_indexes(
    db: &Database,
    collection: &str,
    indexes: Vec<IndexModel>,
) -> Result<(), mongodb::error::Error> {
    db.collection::<bson::Document>(collection)
        .create_indexes(indexes)
        .await?;
    info!(collection, "Indexes created");
    Ok(())
}
