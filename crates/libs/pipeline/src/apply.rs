use photo_host::PhotoHost;
use std::sync::Arc;
use tracing::warn;

/// One rename the apply stage should attempt.
pub(crate) struct RenameJob {
    pub item_id: String,
    pub new_name: String,
}

/// Commits one rename. Returns whether it succeeded; failures are logged
/// and tallied by the caller, never propagated.
pub(crate) async fn apply_rename(host: Arc<dyn PhotoHost>, job: RenameJob) -> bool {
    match host.rename(&job.item_id, &job.new_name).await {
        Ok(()) => true,
        Err(error) => {
            warn!("Rename of {} to {:?} failed: {error}", job.item_id, job.new_name);
            false
        }
    }
}
