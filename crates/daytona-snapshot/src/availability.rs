//! Wait loops against the platform's view of a snapshot.

use daytona_common::{OpContext, SnapshotApi, SnapshotDto, SnapshotState};
use tracing::{info, instrument};

use crate::poll::{poll_until, PollError, PollSettings, Probe};
use crate::{LifecycleError, Result};

/// Polls until the snapshot is `active`.
///
/// `error` and `build_failed` end the wait immediately; every other state,
/// including ones this client does not know, keeps polling.
#[instrument(skip(api, ctx, settings))]
pub async fn wait_until_active(
    api: &dyn SnapshotApi,
    ctx: &OpContext,
    settings: &PollSettings,
    id_or_name: &str,
) -> Result<SnapshotDto> {
    poll_until(
        ctx,
        settings,
        "Waiting for the snapshot to be processed",
        || async move {
            let snapshot = match api.get_snapshot(id_or_name).await {
                Ok(snapshot) => snapshot,
                Err(e) => return Err(LifecycleError::AvailabilityFetch(e)),
            };
            let state = snapshot.state;
            match state {
                SnapshotState::Active => Ok(Probe::Ready(snapshot)),
                _ if state.is_failed() => Err(match snapshot.error_reason {
                    Some(reason) if !reason.is_empty() => LifecycleError::ProcessingFailed(reason),
                    _ => LifecycleError::ProcessingFailedUnknown,
                }),
                _ => Ok(Probe::Pending),
            }
        },
    )
    .await
    .map_err(|e| match e {
        PollError::Cancelled(cause) => LifecycleError::AvailabilityCancelled(cause),
        PollError::Failed(err) => err,
    })
}

/// Removes the snapshot and waits until lookups return not-found.
///
/// A snapshot that is already gone counts as deleted.
#[instrument(skip(api, ctx, settings))]
pub async fn delete_and_wait(
    api: &dyn SnapshotApi,
    ctx: &OpContext,
    settings: &PollSettings,
    id: &str,
) -> Result<()> {
    match api.remove_snapshot(id).await {
        Ok(()) => {}
        Err(e) if e.is_not_found() => return Ok(()),
        Err(e) => return Err(LifecycleError::Delete(e)),
    }

    poll_until(
        ctx,
        settings,
        "Waiting for snapshot to be deleted",
        || async move {
            match api.get_snapshot(id).await {
                Err(e) if e.is_not_found() => Ok(Probe::Ready(())),
                Err(e) => Err(LifecycleError::DeletionVerification(e)),
                Ok(_) => Ok(Probe::Pending),
            }
        },
    )
    .await
    .map_err(|e| match e {
        PollError::Cancelled(cause) => LifecycleError::DeletionCancelled(cause),
        PollError::Failed(err) => err,
    })?;

    info!("Snapshot successfully deleted");
    Ok(())
}
