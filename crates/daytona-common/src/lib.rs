// Re-export dependencies used in public interfaces of common types

pub use async_trait::async_trait;
pub use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod context;
pub mod diagnostics;
pub mod record;
pub mod remote;
pub mod service;

pub use context::{CancelCause, CancelHandle, OpContext};
pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use record::{ResourceProfile, SnapshotRecord};
pub use remote::{CreateSnapshot, PushAccess, RegistryAuth, SnapshotDto, SnapshotState};
pub use service::{ImageEngine, ImageReference, SnapshotApi};

/// Terraform type name of the provider; resources append their own suffix.
pub const PROVIDER_TYPE_NAME: &str = "daytona";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("404 Not Found: {0}")]
    NotFound(String),

    #[error("{status} {message}")]
    Status { status: u16, message: String },

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Unable to decode response: {0}")]
    Decode(String),
}

impl ApiError {
    /// The platform signals missing snapshots with a 404; callers branch on it.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound(_))
    }
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Docker API error: {0}")]
    Docker(String),

    #[error("{0}")]
    Reported(String),
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
pub type EngineResult<T> = std::result::Result<T, EngineError>;
