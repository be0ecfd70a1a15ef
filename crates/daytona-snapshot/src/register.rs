use daytona_common::{CreateSnapshot, ImageReference, SnapshotApi, SnapshotDto, SnapshotRecord};
use tracing::{info, instrument};

use crate::{LifecycleError, Result};

/// Request body for registering `record` against a pushed image.
///
/// The profile is always sent in full so the platform never falls back to
/// its own defaults.
pub fn registration_request(record: &SnapshotRecord, target: &ImageReference) -> CreateSnapshot {
    CreateSnapshot {
        image_name: Some(target.to_string()),
        cpu: Some(record.resources.cpu),
        memory: Some(record.resources.memory),
        disk: Some(record.resources.disk),
        ..CreateSnapshot::new(record.name.clone())
    }
}

#[instrument(skip(api, record), fields(snapshot_name = %record.name))]
pub async fn register_snapshot(
    api: &dyn SnapshotApi,
    record: &SnapshotRecord,
    target: &ImageReference,
) -> Result<SnapshotDto> {
    let created = api
        .create_snapshot(registration_request(record, target))
        .await
        .map_err(LifecycleError::Register)?;
    info!(snapshot_id = %created.id, state = ?created.state, "Snapshot registered");
    Ok(created)
}
