use daytona_common::{ApiError, CancelCause, Diagnostic, EngineError};
use thiserror::Error;

pub mod availability;
pub mod docker;
pub mod poll;
pub mod publish;
pub mod reconcile;
pub mod register;
pub mod resource;

pub use docker::DockerEngine;
pub use poll::{PollError, PollSettings, Probe};
pub use resource::{requires_replacement, Outcome, SnapshotResource};

// --- Custom Error Type ---
#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("Unable to check for if snapshot exists: {0}")]
    StaleCheck(#[source] ApiError),
    #[error("Cancelled while waiting for existing snapshot {name:?} to be deleted: {cause}")]
    StaleCleanupCancelled { name: String, cause: CancelCause },
    #[error("Unable to create Docker client: {0}")]
    EngineUnavailable(String),
    #[error("Unable to get push access token: {0}")]
    PushAccess(#[source] ApiError),
    #[error("Unable to encode docker auth config: {0}")]
    AuthEncoding(#[source] serde_json::Error),
    #[error("Local image {image:?} not found: {source}")]
    ImageNotFound {
        image: String,
        #[source]
        source: EngineError,
    },
    #[error("Unable to tag image: {0}")]
    Tag(#[source] EngineError),
    #[error("Error during image push: {0}")]
    Push(#[source] EngineError),
    #[error("Cancelled during waiting for image to become available: {0}")]
    ImageWaitCancelled(CancelCause),
    #[error("Unable to create snapshot, got error: {0}")]
    Register(#[source] ApiError),
    #[error("Unable to fetch snapshot: {0}")]
    AvailabilityFetch(#[source] ApiError),
    #[error("Snapshot processing failed: {0}")]
    ProcessingFailed(String),
    #[error("Snapshot processing failed with unknown reason")]
    ProcessingFailedUnknown,
    #[error("Cancelled during waiting for snapshot to become available: {0}")]
    AvailabilityCancelled(CancelCause),
    #[error("Unable to read snapshot: {0}")]
    Read(#[source] ApiError),
    #[error("Unable to delete snapshot, got error: {0}")]
    Delete(#[source] ApiError),
    #[error("Unable to verify snapshot deletion: {0}")]
    DeletionVerification(#[source] ApiError),
    #[error("Cancelled while waiting for snapshot deletion: {0}")]
    DeletionCancelled(CancelCause),
    #[error("Snapshot with ID/name {0:?} not found")]
    ImportNotFound(String),
    #[error("Unable to fetch snapshot {id:?}: {source}")]
    Import {
        id: String,
        #[source]
        source: ApiError,
    },
}

impl LifecycleError {
    /// Stable diagnostic title for the failure site.
    pub fn summary(&self) -> &'static str {
        use LifecycleError::*;
        match self {
            StaleCheck(_) | StaleCleanupCancelled { .. } => "Snapshot Check",
            EngineUnavailable(_) => "Docker Client Error",
            PushAccess(_) => "API Error",
            AuthEncoding(_) => "Auth Error",
            ImageNotFound { .. } => "Image Not Found",
            Tag(_) => "Tag Error",
            Push(_) => "Push Error",
            ImageWaitCancelled(_) => "Image Availability Error",
            Register(_) | Read(_) | Delete(_) => "Client Error",
            AvailabilityFetch(_)
            | ProcessingFailed(_)
            | ProcessingFailedUnknown
            | AvailabilityCancelled(_) => "Snapshot Availability Error",
            DeletionVerification(_) => "Deletion Verification Error",
            DeletionCancelled(_) => "Deletion Error",
            ImportNotFound(_) => "Snapshot Not Found",
            Import { .. } => "Import Error",
        }
    }

    /// Set when the failure is the context ending rather than the platform.
    pub fn cancel_cause(&self) -> Option<CancelCause> {
        use LifecycleError::*;
        match self {
            StaleCleanupCancelled { cause, .. } => Some(*cause),
            ImageWaitCancelled(cause) | AvailabilityCancelled(cause) | DeletionCancelled(cause) => {
                Some(*cause)
            }
            _ => None,
        }
    }

}

impl From<LifecycleError> for Diagnostic {
    fn from(err: LifecycleError) -> Self {
        Diagnostic::error(err.summary(), err.to_string())
    }
}

// Define local Result using the crate's Error type
pub type Result<T> = std::result::Result<T, LifecycleError>;
