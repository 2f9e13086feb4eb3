//! Gateway trait definitions, filters and errors.

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{Instance, Snapshot, TagMap, Volume, VolumeState};

/// Volume listing filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VolumeFilter {
    /// Every volume in the region
    All,
    /// Only the given volume ids
    Ids(Vec<String>),
    /// Only volumes in the given state
    State(VolumeState),
}

/// Snapshot listing filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotFilter {
    /// Snapshots taken from any of these volumes
    VolumeIds(Vec<String>),
    /// Every snapshot owned by the calling account
    OwnedBySelf,
}

/// Operations snapshotting and purging need from the cloud provider.
///
/// Calls are issued one at a time; implementations need not be reentrant.
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn list_instances(&self) -> Result<Vec<Instance>, GatewayError>;

    async fn list_volumes(&self, filter: &VolumeFilter) -> Result<Vec<Volume>, GatewayError>;

    async fn list_snapshots(&self, filter: &SnapshotFilter) -> Result<Vec<Snapshot>, GatewayError>;

    /// Start a snapshot of `volume_id`. The provider assigns the id and start time.
    async fn create_snapshot(&self, volume_id: &str, description: &str) -> Result<Snapshot, GatewayError>;

    async fn tag_resource(&self, resource_id: &str, tags: &TagMap) -> Result<(), GatewayError>;

    async fn delete_snapshot(&self, snapshot_id: &str) -> Result<(), GatewayError>;
}

/// Errors that can occur during gateway operations
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("API error {status} ({code}): {message}")]
    Api { status: u16, code: String, message: String },

    #[error("Command failed: {0}")]
    Command(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GatewayError {
    /// Provider status code, when the provider answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            GatewayError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Client-side rejection such as deleting a snapshot that is still in use.
    pub fn is_bad_request(&self) -> bool {
        self.status() == Some(400)
    }
}
