//! Pushes a local image into the platform registry.

use chrono::{DateTime, Local};
use daytona_common::{
    Diagnostics, ImageEngine, ImageReference, OpContext, PushAccess, RegistryAuth, SnapshotApi,
};
use std::sync::Mutex;
use tracing::{info, instrument, warn};

use crate::poll::{poll_until, PollError, PollSettings, Probe};
use crate::{LifecycleError, Result};

const TAG_FORMAT: &str = "%Y%m%d%H%M%S";

/// Unix second of the last tag handed out by this process.
static LAST_TAG_SECOND: Mutex<Option<i64>> = Mutex::new(None);

/// Tag time for a new publish attempt, strictly later (at second
/// precision) than every earlier one in this process.
///
/// Concurrent creates from the same local image would otherwise share a
/// local tag, and the first to finish would remove it under the other.
pub fn issue_tag_time(now: DateTime<Local>) -> DateTime<Local> {
    let mut last = LAST_TAG_SECOND
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    let issued = match *last {
        Some(prev) if now.timestamp() <= prev => {
            now + chrono::Duration::seconds(prev - now.timestamp() + 1)
        }
        _ => now,
    };
    *last = Some(issued.timestamp());
    issued
}

/// `registry/project/<base name>:<timestamp>` for a local image.
///
/// The base name is the last path segment of everything before the first
/// `:`; the timestamp makes every attempt land on a fresh tag.
pub fn target_reference(access: &PushAccess, local_image: &str, at: DateTime<Local>) -> ImageReference {
    let repository = local_image.split(':').next().unwrap_or(local_image);
    let base_name = repository.rsplit('/').next().unwrap_or(repository);

    ImageReference::new(
        format!("{}/{}/{}", access.registry_url, access.project, base_name),
        at.format(TAG_FORMAT).to_string(),
    )
}

/// Tags `local_image` under a fresh registry reference, pushes it and waits
/// for the manifest to become readable.
///
/// On success the caller owns the local tag and must remove it with
/// [`remove_local_tag`]. On failure after tagging the tag is removed here.
#[instrument(skip(api, engine, ctx, settings, diags))]
pub async fn publish_image(
    api: &dyn SnapshotApi,
    engine: &dyn ImageEngine,
    ctx: &OpContext,
    settings: &PollSettings,
    local_image: &str,
    diags: &mut Diagnostics,
) -> Result<ImageReference> {
    // credentials are single use: always ask for a fresh set
    let access = api
        .get_transient_push_access()
        .await
        .map_err(LifecycleError::PushAccess)?;
    let registry_auth = RegistryAuth::from_push_access(&access)
        .encode()
        .map_err(LifecycleError::AuthEncoding)?;

    engine
        .inspect_image(local_image)
        .await
        .map_err(|source| LifecycleError::ImageNotFound {
            image: local_image.to_string(),
            source,
        })?;

    let target = target_reference(&access, local_image, issue_tag_time(Local::now()));
    info!(%target, "Tagging image for the platform registry");
    engine
        .tag_image(local_image, &target)
        .await
        .map_err(LifecycleError::Tag)?;

    if let Err(err) = push_and_wait(engine, ctx, settings, &target, &registry_auth).await {
        remove_local_tag(engine, &target, diags).await;
        return Err(err);
    }

    Ok(target)
}

async fn push_and_wait(
    engine: &dyn ImageEngine,
    ctx: &OpContext,
    settings: &PollSettings,
    target: &ImageReference,
    registry_auth: &str,
) -> Result<()> {
    engine
        .push_image(target, registry_auth)
        .await
        .map_err(LifecycleError::Push)?;

    // registries may ack the push before the manifest is readable
    poll_until(
        ctx,
        settings,
        "Waiting for the image to become available",
        || async move {
            Ok::<_, std::convert::Infallible>(
                match engine.inspect_manifest(target, registry_auth).await {
                    Ok(()) => Probe::Ready(()),
                    Err(_) => Probe::Pending,
                },
            )
        },
    )
    .await
    .map_err(|e| match e {
        PollError::Cancelled(cause) => LifecycleError::ImageWaitCancelled(cause),
        PollError::Failed(never) => match never {},
    })
}

/// Best-effort removal of the tag created by [`publish_image`].
pub async fn remove_local_tag(
    engine: &dyn ImageEngine,
    target: &ImageReference,
    diags: &mut Diagnostics,
) {
    if let Err(e) = engine.remove_image(&target.to_string()).await {
        warn!(%target, error = %e, "Failed to remove tagged image");
        diags.add_warning(
            "Cleanup Warning",
            format!("Failed to remove tagged image {target}: {e}"),
        );
    }
}
