//! In-memory gateway.
//!
//! Holds a fixed inventory, applies creations and deletions to it, and records
//! every call so tests can assert on exactly what reached the provider.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::traits::{Gateway, GatewayError, SnapshotFilter, VolumeFilter};
use crate::domain::{Instance, Snapshot, TagMap, Volume};

/// A call as it reached the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    ListInstances,
    ListVolumes(VolumeFilter),
    ListSnapshots(SnapshotFilter),
    CreateSnapshot { volume_id: String, description: String },
    TagResource { resource_id: String, tags: TagMap },
    DeleteSnapshot(String),
}

impl GatewayCall {
    /// Create, tag and delete calls.
    pub fn is_mutating(&self) -> bool {
        matches!(
            self,
            GatewayCall::CreateSnapshot { .. } | GatewayCall::TagResource { .. } | GatewayCall::DeleteSnapshot(_)
        )
    }
}

/// Scripted failure: status and provider code to answer with.
#[derive(Debug, Clone)]
struct Failure {
    status: u16,
    code: String,
}

impl Failure {
    fn to_error(&self, subject: &str) -> GatewayError {
        GatewayError::Api {
            status: self.status,
            code: self.code.clone(),
            message: format!("scripted failure for {}", subject),
        }
    }
}

#[derive(Debug, Default)]
struct MockState {
    instances: Vec<Instance>,
    volumes: Vec<Volume>,
    snapshots: Vec<Snapshot>,
    calls: Vec<GatewayCall>,
    delete_failures: HashMap<String, Failure>,
    fail_creates: Option<Failure>,
    fail_tags: Option<Failure>,
    fail_listings: Option<Failure>,
    next_snapshot: usize,
}

/// Gateway backed by an in-memory inventory.
#[derive(Debug)]
pub struct MockGateway {
    now: DateTime<Utc>,
    state: Mutex<MockState>,
}

impl MockGateway {
    /// Empty inventory; created snapshots get `now` as their start time.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now,
            state: Mutex::new(MockState::default()),
        }
    }

    pub fn with_instance(self, instance: Instance) -> Self {
        self.lock().instances.push(instance);
        self
    }

    pub fn with_volume(self, volume: Volume) -> Self {
        self.lock().volumes.push(volume);
        self
    }

    pub fn with_snapshot(self, snapshot: Snapshot) -> Self {
        self.lock().snapshots.push(snapshot);
        self
    }

    /// Make deleting `snapshot_id` fail with the given status and code.
    pub fn failing_delete(self, snapshot_id: impl Into<String>, status: u16, code: impl Into<String>) -> Self {
        self.lock().delete_failures.insert(
            snapshot_id.into(),
            Failure {
                status,
                code: code.into(),
            },
        );
        self
    }

    pub fn failing_creates(self, status: u16, code: impl Into<String>) -> Self {
        self.lock().fail_creates = Some(Failure {
            status,
            code: code.into(),
        });
        self
    }

    pub fn failing_tags(self, status: u16, code: impl Into<String>) -> Self {
        self.lock().fail_tags = Some(Failure {
            status,
            code: code.into(),
        });
        self
    }

    pub fn failing_listings(self, status: u16, code: impl Into<String>) -> Self {
        self.lock().fail_listings = Some(Failure {
            status,
            code: code.into(),
        });
        self
    }

    pub fn calls(&self) -> Vec<GatewayCall> {
        self.lock().calls.clone()
    }

    pub fn mutating_calls(&self) -> Vec<GatewayCall> {
        self.lock().calls.iter().filter(|c| c.is_mutating()).cloned().collect()
    }

    /// Snapshots currently in the inventory.
    pub fn snapshots(&self) -> Vec<Snapshot> {
        self.lock().snapshots.clone()
    }

    pub fn snapshot_ids(&self) -> Vec<String> {
        self.lock().snapshots.iter().map(|s| s.id.clone()).collect()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        // A poisoned lock only means another test thread panicked mid-call.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl Gateway for MockGateway {
    async fn list_instances(&self) -> Result<Vec<Instance>, GatewayError> {
        let mut state = self.lock();
        state.calls.push(GatewayCall::ListInstances);
        if let Some(failure) = &state.fail_listings {
            return Err(failure.to_error("DescribeInstances"));
        }
        Ok(state.instances.clone())
    }

    async fn list_volumes(&self, filter: &VolumeFilter) -> Result<Vec<Volume>, GatewayError> {
        let mut state = self.lock();
        state.calls.push(GatewayCall::ListVolumes(filter.clone()));
        if let Some(failure) = &state.fail_listings {
            return Err(failure.to_error("DescribeVolumes"));
        }
        let volumes = state
            .volumes
            .iter()
            .filter(|v| match filter {
                VolumeFilter::All => true,
                VolumeFilter::Ids(ids) => ids.contains(&v.id),
                VolumeFilter::State(s) => v.state == *s,
            })
            .cloned()
            .collect();
        Ok(volumes)
    }

    async fn list_snapshots(&self, filter: &SnapshotFilter) -> Result<Vec<Snapshot>, GatewayError> {
        let mut state = self.lock();
        state.calls.push(GatewayCall::ListSnapshots(filter.clone()));
        if let Some(failure) = &state.fail_listings {
            return Err(failure.to_error("DescribeSnapshots"));
        }
        let snapshots = state
            .snapshots
            .iter()
            .filter(|s| match filter {
                SnapshotFilter::OwnedBySelf => true,
                SnapshotFilter::VolumeIds(ids) => ids.contains(&s.volume_id),
            })
            .cloned()
            .collect();
        Ok(snapshots)
    }

    async fn create_snapshot(&self, volume_id: &str, description: &str) -> Result<Snapshot, GatewayError> {
        let mut state = self.lock();
        state.calls.push(GatewayCall::CreateSnapshot {
            volume_id: volume_id.to_string(),
            description: description.to_string(),
        });
        if let Some(failure) = &state.fail_creates {
            return Err(failure.to_error(volume_id));
        }
        state.next_snapshot += 1;
        let snapshot = Snapshot::new(format!("snap-mock-{:04}", state.next_snapshot), volume_id, self.now);
        state.snapshots.push(snapshot.clone());
        Ok(snapshot)
    }

    async fn tag_resource(&self, resource_id: &str, tags: &TagMap) -> Result<(), GatewayError> {
        let mut state = self.lock();
        state.calls.push(GatewayCall::TagResource {
            resource_id: resource_id.to_string(),
            tags: tags.clone(),
        });
        if let Some(failure) = &state.fail_tags {
            return Err(failure.to_error(resource_id));
        }
        if let Some(snapshot) = state.snapshots.iter_mut().find(|s| s.id == resource_id) {
            for (key, value) in tags.iter() {
                snapshot.tags.insert(key, value);
            }
        }
        Ok(())
    }

    async fn delete_snapshot(&self, snapshot_id: &str) -> Result<(), GatewayError> {
        let mut state = self.lock();
        state.calls.push(GatewayCall::DeleteSnapshot(snapshot_id.to_string()));
        if let Some(failure) = state.delete_failures.get(snapshot_id) {
            return Err(failure.to_error(snapshot_id));
        }
        let before = state.snapshots.len();
        state.snapshots.retain(|s| s.id != snapshot_id);
        if state.snapshots.len() == before {
            return Err(GatewayError::Api {
                status: 400,
                code: "InvalidSnapshot.NotFound".to_string(),
                message: format!("The snapshot '{}' does not exist.", snapshot_id),
            });
        }
        Ok(())
    }
}
