//! Wire types exchanged with the platform API and the container registry.

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotState {
    BuildPending,
    Building,
    Pending,
    Pulling,
    PendingValidation,
    Validating,
    Active,
    Error,
    BuildFailed,
    Removing,
    #[serde(other)]
    Unknown,
}

impl SnapshotState {
    /// `error` and `build_failed` are final: such a snapshot is never repaired.
    pub fn is_failed(self) -> bool {
        matches!(self, SnapshotState::Error | SnapshotState::BuildFailed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotDto {
    pub id: String,
    pub name: String,
    pub state: SnapshotState,
    pub cpu: i32,
    pub gpu: i32,
    pub mem: i32,
    pub disk: i32,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSnapshot {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk: Option<i32>,
}

impl CreateSnapshot {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image_name: None,
            cpu: None,
            memory: None,
            disk: None,
        }
    }
}

/// Single-use registry credentials handed out per publish attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushAccess {
    pub username: String,
    pub secret: String,
    pub registry_url: String,
    pub project: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
}

/// Registry credentials as the container engine expects them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryAuth {
    pub username: String,
    pub password: String,
    pub server_address: String,
}

impl RegistryAuth {
    pub fn from_push_access(access: &PushAccess) -> Self {
        Self {
            username: access.username.clone(),
            password: access.secret.clone(),
            server_address: access.registry_url.clone(),
        }
    }

    /// URL-safe base64 of the JSON payload, the `X-Registry-Auth` header format.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        let json = serde_json::to_vec(self)?;
        Ok(URL_SAFE.encode(json))
    }

    pub fn decode(token: &str) -> Result<Self, String> {
        let json = URL_SAFE.decode(token).map_err(|e| e.to_string())?;
        serde_json::from_slice(&json).map_err(|e| e.to_string())
    }
}
