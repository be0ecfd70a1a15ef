//! The persisted resource record.
//!
//! Field names are the stable state schema; changing one is a state migration.

use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};

use crate::remote::SnapshotDto;

pub const DEFAULT_CPU: i32 = 1;
pub const DEFAULT_MEMORY: i32 = 1;
pub const DEFAULT_DISK: i32 = 3;

/// Resource allocation handed to sandboxes started from the snapshot.
///
/// `cpu`, `memory` and `disk` are user settable at creation; `gpu` is always
/// assigned by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceProfile {
    #[serde(default = "default_cpu")]
    pub cpu: i32,
    #[serde(default = "default_memory")]
    pub memory: i32,
    #[serde(default = "default_disk")]
    pub disk: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpu: Option<i32>,
}

impl Default for ResourceProfile {
    fn default() -> Self {
        Self {
            cpu: DEFAULT_CPU,
            memory: DEFAULT_MEMORY,
            disk: DEFAULT_DISK,
            gpu: None,
        }
    }
}

fn default_cpu() -> i32 {
    DEFAULT_CPU
}

fn default_memory() -> i32 {
    DEFAULT_MEMORY
}

fn default_disk() -> i32 {
    DEFAULT_DISK
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    /// Remote identifier; `None` until registration succeeded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Empty means "not yet known" in a planned record.
    #[serde(default)]
    pub name: String,
    /// Local image tag; empty for imported records.
    #[serde(default, rename = "image_name")]
    pub local_image: String,
    #[serde(default, rename = "remote_image_name", skip_serializing_if = "Option::is_none")]
    pub remote_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
    #[serde(flatten)]
    pub resources: ResourceProfile,
    #[serde(default, rename = "size", skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default)]
    pub keep_remotely: bool,
}

impl SnapshotRecord {
    pub fn new(name: impl Into<String>, local_image: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            local_image: local_image.into(),
            remote_image: None,
            organization_id: None,
            resources: ResourceProfile::default(),
            size_bytes: None,
            created_at: None,
            keep_remotely: false,
        }
    }

    pub fn with_resources(mut self, cpu: i32, memory: i32, disk: i32) -> Self {
        self.resources.cpu = cpu;
        self.resources.memory = memory;
        self.resources.disk = disk;
        self
    }

    pub fn keep_remotely(mut self, keep: bool) -> Self {
        self.keep_remotely = keep;
        self
    }

    pub fn id_or_empty(&self) -> &str {
        self.id.as_deref().unwrap_or_default()
    }

    /// Folds the platform's view into the record.
    ///
    /// Optional remote fields are only overwritten when the platform
    /// returned them.
    pub fn apply_remote(&mut self, snapshot: &SnapshotDto) {
        self.id = Some(snapshot.id.clone());
        self.name = snapshot.name.clone();
        self.resources.cpu = snapshot.cpu;
        self.resources.gpu = Some(snapshot.gpu);
        self.resources.memory = snapshot.mem;
        self.resources.disk = snapshot.disk;
        self.created_at = Some(format_timestamp(snapshot));

        if let Some(org) = &snapshot.organization_id {
            self.organization_id = Some(org.clone());
        }
        if let Some(image) = &snapshot.image_name {
            self.remote_image = Some(image.clone());
        }
        if let Some(size) = snapshot.size {
            self.size_bytes = Some(size);
        }
    }

    /// A record bound from an existing remote snapshot.
    ///
    /// The local image cannot be recovered from the platform and is left
    /// empty; the next plan fills it in without forcing replacement.
    pub fn imported(snapshot: &SnapshotDto) -> Self {
        let mut record = Self::new(String::new(), String::new());
        record.apply_remote(snapshot);
        record
    }
}

fn format_timestamp(snapshot: &SnapshotDto) -> String {
    snapshot.created_at.to_rfc3339_opts(SecondsFormat::Secs, true)
}
