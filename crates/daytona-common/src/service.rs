//! Seams to the external systems the lifecycle talks to.
//!
//! Production code plugs in the HTTP platform client and the Docker engine;
//! tests substitute in-memory fakes.

use async_trait::async_trait;
use std::fmt;

use crate::remote::{CreateSnapshot, PushAccess, SnapshotDto};
use crate::{ApiResult, EngineResult};

#[async_trait]
pub trait SnapshotApi: Send + Sync {
    /// Looks a snapshot up by id or by name.
    async fn get_snapshot(&self, id_or_name: &str) -> ApiResult<SnapshotDto>;

    async fn create_snapshot(&self, request: CreateSnapshot) -> ApiResult<SnapshotDto>;

    async fn remove_snapshot(&self, id: &str) -> ApiResult<()>;

    async fn get_transient_push_access(&self) -> ApiResult<PushAccess>;
}

/// `repository:tag` split the way the engine API wants it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageReference {
    pub repository: String,
    pub tag: String,
}

impl ImageReference {
    pub fn new(repository: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            tag: tag.into(),
        }
    }

}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.repository, self.tag)
    }
}

/// Local container engine plus the registry it pushes to.
///
/// `registry_auth` is the encoded token produced by
/// [`RegistryAuth::encode`](crate::RegistryAuth::encode).
#[async_trait]
pub trait ImageEngine: Send + Sync {
    /// Fails if the image is not present locally.
    async fn inspect_image(&self, reference: &str) -> EngineResult<()>;

    async fn tag_image(&self, source: &str, target: &ImageReference) -> EngineResult<()>;

    async fn remove_image(&self, reference: &str) -> EngineResult<()>;

    /// Pushes and drains the progress stream; errors reported mid-stream fail the push.
    async fn push_image(&self, target: &ImageReference, registry_auth: &str) -> EngineResult<()>;

    /// Succeeds once the registry serves the manifest for `target`.
    async fn inspect_manifest(&self, target: &ImageReference, registry_auth: &str)
        -> EngineResult<()>;
}
