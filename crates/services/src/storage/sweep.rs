use bson::DateTime;
use careercompass_db::models::FileCategory;
use chrono::{Duration, Utc};
use tracing::{debug, info};

use super::object_store::ObjectStore;
use crate::dao::MessageDao;

/// Reconciliation for the send path's accepted gap: an attachment upload
/// that succeeded but whose message insert never did leaves a blob nothing
/// references. Chat-category objects older than `min_age_hours` with no
/// referencing message are deleted.
///
/// The age threshold keeps the sweep from racing an upload whose message
/// insert is still in flight.
pub async fn sweep_orphaned_chat_uploads(
    store: &ObjectStore,
    messages: &MessageDao,
    min_age_hours: i64,
) -> anyhow::Result<u64> {
    let cutoff = DateTime::from_chrono(Utc::now() - Duration::hours(min_age_hours));
    let candidates = store
        .find_older_than(FileCategory::Chat, cutoff)
        .await?;

    let mut removed = 0u64;
    for file in candidates {
        if messages.references_file(file.id).await? {
            continue;
        }
        store.delete(file.id).await?;
        debug!(file_id = %file.id, filename = %file.filename, "Removed orphaned upload");
        removed += 1;
    }

    if removed > 0 {
        info!(removed, "Orphaned chat uploads swept");
    }
    Ok(removed)
}
