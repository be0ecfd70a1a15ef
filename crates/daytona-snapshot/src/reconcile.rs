//! Clears a leftover snapshot from an earlier, interrupted create.
//!
//! Snapshot names are unique on the platform, so whatever still holds the
//! target name has to go before a new registration can succeed.

use daytona_common::{Diagnostics, OpContext, SnapshotApi};
use std::convert::Infallible;
use tracing::{debug, info, instrument};

use crate::poll::{poll_until, PollError, PollSettings, Probe};
use crate::{LifecycleError, Result};

/// Deletes any snapshot currently holding `name` and waits until it is gone.
///
/// A failed delete only produces a warning; the caller carries on and lets
/// registration report the conflict if there still is one.
#[instrument(skip(api, ctx, settings, diags))]
pub async fn cleanup_stale_attempt(
    api: &dyn SnapshotApi,
    ctx: &OpContext,
    settings: &PollSettings,
    name: &str,
    diags: &mut Diagnostics,
) -> Result<()> {
    let existing = match api.get_snapshot(name).await {
        Ok(snapshot) => snapshot,
        Err(e) if e.is_not_found() => return Ok(()),
        Err(e) => return Err(LifecycleError::StaleCheck(e)),
    };

    info!(
        snapshot_id = %existing.id,
        snapshot_name = %existing.name,
        snapshot_state = ?existing.state,
        "Found existing snapshot, deleting it"
    );

    match api.remove_snapshot(&existing.id).await {
        Ok(()) => {}
        Err(e) if e.is_not_found() => return Ok(()),
        Err(e) => {
            diags.add_warning(
                "Cleanup Warning",
                format!("Failed to delete existing failed snapshot {name:?}: {e}"),
            );
            return Ok(());
        }
    }

    let id = existing.id.as_str();
    poll_until(
        ctx,
        settings,
        "Waiting for the existing snapshot to be deleted",
        || async move {
            match api.get_snapshot(id).await {
                Err(e) if e.is_not_found() => Ok::<_, Infallible>(Probe::Ready(())),
                Err(e) => {
                    debug!(error = %e, "Transient error while confirming deletion");
                    Ok(Probe::Pending)
                }
                Ok(_) => Ok(Probe::Pending),
            }
        },
    )
    .await
    .map_err(|e| match e {
        PollError::Cancelled(cause) => LifecycleError::StaleCleanupCancelled {
            name: name.to_string(),
            cause,
        },
        PollError::Failed(never) => match never {},
    })?;

    info!("Snapshot successfully deleted");
    Ok(())
}
