//! The `daytona_snapshot` resource: create, read, update, delete and import.
//!
//! Every operation returns an [`Outcome`]; failures never escape as `Err`,
//! they become error diagnostics next to whatever state is left.

use daytona_common::{
    Diagnostics, ImageEngine, OpContext, SnapshotApi, SnapshotRecord, PROVIDER_TYPE_NAME,
};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::availability::{delete_and_wait, wait_until_active};
use crate::poll::PollSettings;
use crate::publish::{publish_image, remove_local_tag};
use crate::reconcile::cleanup_stale_attempt;
use crate::register::register_snapshot;
use crate::{LifecycleError, Result};

/// State plus diagnostics produced by one lifecycle operation.
#[derive(Debug, Clone, Default)]
pub struct Outcome {
    /// `None` means the resource no longer exists (or was never created).
    pub state: Option<SnapshotRecord>,
    pub diagnostics: Diagnostics,
}

impl Outcome {
    fn new(state: Option<SnapshotRecord>, diagnostics: Diagnostics) -> Self {
        Self { state, diagnostics }
    }

    pub fn has_error(&self) -> bool {
        self.diagnostics.has_error()
    }
}

#[derive(Clone)]
enum EngineSlot {
    Ready(Arc<dyn ImageEngine>),
    Unavailable(String),
}

#[derive(Clone)]
pub struct SnapshotResource {
    api: Arc<dyn SnapshotApi>,
    engine: EngineSlot,
    poll: PollSettings,
}

impl SnapshotResource {
    pub fn new(api: Arc<dyn SnapshotApi>, engine: Arc<dyn ImageEngine>) -> Self {
        Self {
            api,
            engine: EngineSlot::Ready(engine),
            poll: PollSettings::default(),
        }
    }

    /// A resource whose creates fail with "Docker Client Error".
    ///
    /// Read, delete and import never touch the engine and keep working.
    pub fn without_engine(api: Arc<dyn SnapshotApi>, reason: impl Into<String>) -> Self {
        Self {
            api,
            engine: EngineSlot::Unavailable(reason.into()),
            poll: PollSettings::default(),
        }
    }

    pub fn with_poll_settings(mut self, poll: PollSettings) -> Self {
        self.poll = poll;
        self
    }

    pub fn type_name() -> String {
        format!("{PROVIDER_TYPE_NAME}_snapshot")
    }

    fn engine(&self) -> Result<&dyn ImageEngine> {
        match &self.engine {
            EngineSlot::Ready(engine) => Ok(engine.as_ref()),
            EngineSlot::Unavailable(reason) => Err(LifecycleError::EngineUnavailable(reason.clone())),
        }
    }

    /// Publishes the local image and registers it as a new snapshot.
    ///
    /// Whatever already holds `planned.name` remotely is deleted first. With
    /// `keep_remotely` and an unchanged name during a replacement, that still
    /// removes the old snapshot since the name has to be free.
    #[instrument(skip(self, ctx, planned), fields(snapshot_name = %planned.name, image = %planned.local_image))]
    pub async fn create(&self, ctx: &OpContext, planned: SnapshotRecord) -> Outcome {
        let mut diags = Diagnostics::new();
        match self.create_inner(ctx, planned, &mut diags).await {
            Ok(record) => {
                info!(snapshot_id = record.id_or_empty(), "Snapshot created");
                Outcome::new(Some(record), diags)
            }
            Err(e) => {
                record_failure(&mut diags, e);
                Outcome::new(None, diags)
            }
        }
    }

    async fn create_inner(
        &self,
        ctx: &OpContext,
        mut planned: SnapshotRecord,
        diags: &mut Diagnostics,
    ) -> Result<SnapshotRecord> {
        let api = self.api.as_ref();

        cleanup_stale_attempt(api, ctx, &self.poll, &planned.name, diags).await?;

        let engine = self.engine()?;
        let target = publish_image(api, engine, ctx, &self.poll, &planned.local_image, diags).await?;

        let registered = match register_snapshot(api, &planned, &target).await {
            Ok(_) => wait_until_active(api, ctx, &self.poll, &planned.name).await,
            Err(e) => Err(e),
        };
        // the pushed copy lives on in the registry; the local tag is only scaffolding
        remove_local_tag(engine, &target, diags).await;

        let snapshot = registered?;
        planned.apply_remote(&snapshot);
        Ok(planned)
    }

    /// Refreshes `current` from the platform.
    ///
    /// A record without an id, or one the platform no longer knows, comes
    /// back unchanged.
    #[instrument(skip(self, current), fields(snapshot_id = current.id_or_empty()))]
    pub async fn read(&self, current: SnapshotRecord) -> Outcome {
        let mut diags = Diagnostics::new();
        let Some(id) = current.id.clone() else {
            return Outcome::new(Some(current), diags);
        };

        match self.api.get_snapshot(&id).await {
            Ok(snapshot) => {
                let mut record = current;
                record.apply_remote(&snapshot);
                Outcome::new(Some(record), diags)
            }
            Err(e) if e.is_not_found() => Outcome::new(Some(current), diags),
            Err(e) => {
                record_failure(&mut diags, LifecycleError::Read(e));
                Outcome::new(Some(current), diags)
            }
        }
    }

    #[instrument(skip(self, ctx, prior, planned), fields(snapshot_id = prior.id_or_empty()))]
    pub async fn update(
        &self,
        ctx: &OpContext,
        prior: SnapshotRecord,
        mut planned: SnapshotRecord,
    ) -> Outcome {
        if !requires_replacement(&prior, &planned) {
            if planned.id.is_none() {
                planned.id = prior.id.clone();
            }
            if planned.name.is_empty() {
                planned.name = prior.name.clone();
            }
            return self.read(planned).await;
        }

        let mut diags = Diagnostics::new();
        if planned.keep_remotely {
            info!(
                old_snapshot_id = prior.id_or_empty(),
                old_snapshot_name = %prior.name,
                "Skipping old snapshot deletion during recreation due to keep_remotely=true"
            );
        } else if let Some(old_id) = prior.id.as_deref() {
            if let Err(e) = delete_and_wait(self.api.as_ref(), ctx, &self.poll, old_id).await {
                record_failure(&mut diags, e);
                return Outcome::new(Some(prior), diags);
            }
        }

        let mut created = self.create(ctx, planned).await;
        diags.append(std::mem::take(&mut created.diagnostics));
        Outcome::new(created.state, diags)
    }

    #[instrument(skip(self, ctx, current), fields(snapshot_id = current.id_or_empty()))]
    pub async fn delete(&self, ctx: &OpContext, current: SnapshotRecord) -> Outcome {
        let mut diags = Diagnostics::new();
        if current.keep_remotely {
            info!(
                snapshot_name = %current.name,
                "Skipping snapshot deletion due to keep_remotely=true"
            );
            return Outcome::new(None, diags);
        }

        let Some(id) = current.id.as_deref() else {
            return Outcome::new(None, diags);
        };

        match delete_and_wait(self.api.as_ref(), ctx, &self.poll, id).await {
            Ok(()) => Outcome::new(None, diags),
            Err(e) => {
                record_failure(&mut diags, e);
                Outcome::new(Some(current), diags)
            }
        }
    }

    /// Binds an existing remote snapshot, looked up by id or name.
    #[instrument(skip(self))]
    pub async fn import(&self, id: &str) -> Outcome {
        let mut diags = Diagnostics::new();
        match self.api.get_snapshot(id).await {
            Ok(snapshot) => Outcome::new(Some(SnapshotRecord::imported(&snapshot)), diags),
            Err(e) => {
                let err = if e.is_not_found() {
                    LifecycleError::ImportNotFound(id.to_string())
                } else {
                    LifecycleError::Import {
                        id: id.to_string(),
                        source: e,
                    }
                };
                record_failure(&mut diags, err);
                Outcome::new(None, diags)
            }
        }
    }
}

fn record_failure(diags: &mut Diagnostics, err: LifecycleError) {
    match err.cancel_cause() {
        Some(cause) => warn!(%cause, "Operation stopped before completion"),
        None => warn!(error = %err, "Operation failed"),
    }
    diags.push(err.into());
}

/// Whether moving from `prior` to `planned` needs a new snapshot.
///
/// An empty prior image is what import leaves behind; filling it in is not
/// a change.
pub fn requires_replacement(prior: &SnapshotRecord, planned: &SnapshotRecord) -> bool {
    let image_changed = prior.local_image != planned.local_image
        && !(prior.local_image.is_empty() && !planned.local_image.is_empty());

    image_changed
        || prior.name != planned.name
        || prior.resources.cpu != planned.resources.cpu
        || prior.resources.memory != planned.resources.memory
        || prior.resources.disk != planned.resources.disk
}
