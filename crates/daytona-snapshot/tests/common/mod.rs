//! In-memory stand-ins for the platform API and the Docker daemon.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use daytona_common::{
    ApiError, ApiResult, CreateSnapshot, EngineError, EngineResult, ImageEngine, ImageReference,
    PushAccess, SnapshotApi, SnapshotDto, SnapshotState,
};
use daytona_snapshot::PollSettings;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

pub fn fast_poll() -> PollSettings {
    PollSettings::with_interval(Duration::from_millis(10))
}

pub fn snapshot_dto(id: &str, name: &str, state: SnapshotState) -> SnapshotDto {
    SnapshotDto {
        id: id.to_string(),
        name: name.to_string(),
        state,
        cpu: 1,
        gpu: 0,
        mem: 1,
        disk: 3,
        created_at: Utc.with_ymd_and_hms(2025, 3, 4, 5, 6, 7).unwrap(),
        organization_id: Some("org-1".to_string()),
        image_name: None,
        size: None,
        error_reason: None,
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ApiCall {
    Get(String),
    Create(CreateSnapshot),
    Remove(String),
    PushAccess,
}

#[derive(Clone, Debug)]
struct Entry {
    dto: SnapshotDto,
    /// States handed out by successive lookups; the last one sticks.
    progression: VecDeque<SnapshotState>,
    /// Lookups that still see the entry after it was removed.
    lingering: Option<usize>,
}

#[derive(Clone, Debug)]
pub struct ApiBehavior {
    /// States a freshly registered snapshot goes through, one per lookup.
    pub build_states: Vec<SnapshotState>,
    pub error_reason: Option<String>,
    /// Lookups that still find a snapshot after its removal was accepted.
    pub removal_lag: usize,
    pub remove_status: Option<u16>,
    pub get_status: Option<u16>,
    pub create_status: Option<u16>,
    pub push_access_status: Option<u16>,
    /// Lookups that fail with a 503 right after an accepted removal.
    pub flaky_gets_after_remove: usize,
}

impl Default for ApiBehavior {
    fn default() -> Self {
        Self {
            build_states: vec![SnapshotState::Building, SnapshotState::Active],
            error_reason: None,
            removal_lag: 0,
            remove_status: None,
            get_status: None,
            create_status: None,
            push_access_status: None,
            flaky_gets_after_remove: 0,
        }
    }
}

#[derive(Clone)]
pub struct FakeApi {
    pub calls: Arc<Mutex<Vec<ApiCall>>>,
    entries: Arc<Mutex<Vec<Entry>>>,
    flaky_remaining: Arc<Mutex<usize>>,
    pub behavior: Arc<Mutex<ApiBehavior>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            entries: Arc::new(Mutex::new(Vec::new())),
            flaky_remaining: Arc::new(Mutex::new(0)),
            behavior: Arc::new(Mutex::new(ApiBehavior::default())),
        }
    }

    pub async fn set_behavior(&self, behavior: ApiBehavior) {
        *self.behavior.lock().await = behavior;
    }

    pub async fn seed(&self, dto: SnapshotDto) {
        self.entries.lock().await.push(Entry {
            dto,
            progression: VecDeque::new(),
            lingering: None,
        });
    }

    /// Seeds a snapshot whose successive lookups walk through `states`.
    pub async fn seed_progressing(&self, dto: SnapshotDto, states: &[SnapshotState]) {
        self.entries.lock().await.push(Entry {
            dto,
            progression: states.iter().copied().collect(),
            lingering: None,
        });
    }

    pub async fn calls(&self) -> Vec<ApiCall> {
        self.calls.lock().await.clone()
    }

    pub async fn removed_ids(&self) -> Vec<String> {
        self.calls()
            .await
            .into_iter()
            .filter_map(|c| match c {
                ApiCall::Remove(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    pub async fn created(&self) -> Vec<CreateSnapshot> {
        self.calls()
            .await
            .into_iter()
            .filter_map(|c| match c {
                ApiCall::Create(req) => Some(req),
                _ => None,
            })
            .collect()
    }

    pub async fn get_count(&self) -> usize {
        self.calls()
            .await
            .iter()
            .filter(|c| matches!(c, ApiCall::Get(_)))
            .count()
    }
}

fn status(code: u16) -> ApiError {
    ApiError::Status {
        status: code,
        message: "Internal Server Error".to_string(),
    }
}

#[async_trait]
impl SnapshotApi for FakeApi {
    async fn get_snapshot(&self, id_or_name: &str) -> ApiResult<SnapshotDto> {
        self.calls.lock().await.push(ApiCall::Get(id_or_name.to_string()));
        if let Some(code) = self.behavior.lock().await.get_status {
            return Err(status(code));
        }
        {
            let mut flaky = self.flaky_remaining.lock().await;
            if *flaky > 0 {
                *flaky -= 1;
                return Err(status(503));
            }
        }

        let mut entries = self.entries.lock().await;
        let Some(pos) = entries
            .iter()
            .position(|e| e.dto.id == id_or_name || e.dto.name == id_or_name)
        else {
            return Err(ApiError::NotFound(format!("snapshot {id_or_name} not found")));
        };

        let entry = &mut entries[pos];
        if let Some(next) = entry.progression.pop_front() {
            entry.dto.state = next;
        }
        let dto = entry.dto.clone();
        let lingering = entry.lingering;
        match lingering {
            Some(0) => {
                entries.remove(pos);
                Err(ApiError::NotFound(format!("snapshot {id_or_name} not found")))
            }
            Some(n) => {
                entries[pos].lingering = Some(n - 1);
                Ok(dto)
            }
            None => Ok(dto),
        }
    }

    async fn create_snapshot(&self, request: CreateSnapshot) -> ApiResult<SnapshotDto> {
        self.calls.lock().await.push(ApiCall::Create(request.clone()));
        let behavior = self.behavior.lock().await.clone();
        if let Some(code) = behavior.create_status {
            return Err(status(code));
        }

        let mut dto = snapshot_dto(
            &uuid::Uuid::new_v4().to_string(),
            &request.name,
            SnapshotState::Pending,
        );
        dto.cpu = request.cpu.unwrap_or(1);
        dto.mem = request.memory.unwrap_or(1);
        dto.disk = request.disk.unwrap_or(3);
        dto.image_name = request.image_name.clone();
        dto.size = Some(512.0);
        dto.error_reason = behavior.error_reason.clone();

        self.entries.lock().await.push(Entry {
            dto: dto.clone(),
            progression: behavior.build_states.into_iter().collect(),
            lingering: None,
        });
        Ok(dto)
    }

    async fn remove_snapshot(&self, id: &str) -> ApiResult<()> {
        self.calls.lock().await.push(ApiCall::Remove(id.to_string()));
        let behavior = self.behavior.lock().await.clone();
        if let Some(code) = behavior.remove_status {
            return Err(status(code));
        }

        let mut entries = self.entries.lock().await;
        let Some(pos) = entries.iter().position(|e| e.dto.id == id && e.lingering.is_none()) else {
            return Err(ApiError::NotFound(format!("snapshot {id} not found")));
        };
        if behavior.removal_lag == 0 {
            entries.remove(pos);
        } else {
            entries[pos].lingering = Some(behavior.removal_lag);
        }
        *self.flaky_remaining.lock().await = behavior.flaky_gets_after_remove;
        Ok(())
    }

    async fn get_transient_push_access(&self) -> ApiResult<PushAccess> {
        self.calls.lock().await.push(ApiCall::PushAccess);
        if let Some(code) = self.behavior.lock().await.push_access_status {
            return Err(status(code));
        }
        Ok(PushAccess {
            username: "robot$push".to_string(),
            secret: "s3cr3t".to_string(),
            registry_url: "registry.example".to_string(),
            project: "proj".to_string(),
            registry_id: None,
            expires_at: None,
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum EngineCall {
    Inspect(String),
    Tag { source: String, target: String },
    Remove(String),
    Push(String),
    Manifest(String),
}

#[derive(Clone, Debug, Default)]
pub struct EngineBehavior {
    pub push_error: Option<String>,
    pub remove_error: Option<String>,
    /// Manifest probes that fail before the registry serves the image.
    pub manifest_lag: usize,
    /// Never serve the manifest.
    pub manifest_missing: bool,
}

#[derive(Clone)]
pub struct FakeEngine {
    pub calls: Arc<Mutex<Vec<EngineCall>>>,
    images: Arc<Mutex<HashSet<String>>>,
    pub behavior: Arc<Mutex<EngineBehavior>>,
}

impl FakeEngine {
    pub fn with_images(images: &[&str]) -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            images: Arc::new(Mutex::new(images.iter().map(|s| s.to_string()).collect())),
            behavior: Arc::new(Mutex::new(EngineBehavior::default())),
        }
    }

    pub async fn set_behavior(&self, behavior: EngineBehavior) {
        *self.behavior.lock().await = behavior;
    }

    pub async fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().await.clone()
    }

    pub async fn has_image(&self, reference: &str) -> bool {
        self.images.lock().await.contains(reference)
    }

    pub async fn tagged(&self) -> Vec<String> {
        self.calls()
            .await
            .into_iter()
            .filter_map(|c| match c {
                EngineCall::Tag { target, .. } => Some(target),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl ImageEngine for FakeEngine {
    async fn inspect_image(&self, reference: &str) -> EngineResult<()> {
        self.calls.lock().await.push(EngineCall::Inspect(reference.to_string()));
        if self.images.lock().await.contains(reference) {
            Ok(())
        } else {
            Err(EngineError::Docker(format!("No such image: {reference}")))
        }
    }

    async fn tag_image(&self, source: &str, target: &ImageReference) -> EngineResult<()> {
        self.calls.lock().await.push(EngineCall::Tag {
            source: source.to_string(),
            target: target.to_string(),
        });
        self.images.lock().await.insert(target.to_string());
        Ok(())
    }

    async fn remove_image(&self, reference: &str) -> EngineResult<()> {
        self.calls.lock().await.push(EngineCall::Remove(reference.to_string()));
        if let Some(error) = self.behavior.lock().await.remove_error.clone() {
            return Err(EngineError::Docker(error));
        }
        self.images.lock().await.remove(reference);
        Ok(())
    }

    async fn push_image(&self, target: &ImageReference, registry_auth: &str) -> EngineResult<()> {
        assert!(!registry_auth.is_empty());
        self.calls.lock().await.push(EngineCall::Push(target.to_string()));
        match self.behavior.lock().await.push_error.clone() {
            Some(error) => Err(EngineError::Reported(error)),
            None => Ok(()),
        }
    }

    async fn inspect_manifest(&self, target: &ImageReference, _registry_auth: &str) -> EngineResult<()> {
        self.calls.lock().await.push(EngineCall::Manifest(target.to_string()));
        let mut behavior = self.behavior.lock().await;
        if behavior.manifest_missing {
            return Err(EngineError::Docker("manifest unknown".to_string()));
        }
        if behavior.manifest_lag > 0 {
            behavior.manifest_lag -= 1;
            return Err(EngineError::Docker("manifest unknown".to_string()));
        }
        Ok(())
    }
}
