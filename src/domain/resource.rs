//! Inventory resources observed through the gateway.
//!
//! Instances and volumes are only ever read. Snapshots are read, created and
//! deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::tags::TagMap;

/// A device attached to an instance, backed by a block-storage volume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockDevice {
    /// Device name as seen by the instance (e.g. /dev/xvda)
    pub device_name: String,
    pub volume_id: String,
}

/// A compute instance and its attached volumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    pub id: String,
    /// Lifecycle state name (running, stopped, ...)
    pub state: String,
    pub tags: TagMap,
    pub block_devices: Vec<BlockDevice>,
}

impl Instance {
    pub fn new(id: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            state: state.into(),
            tags: TagMap::new(),
            block_devices: Vec::new(),
        }
    }

    /// Attach a volume under the given device name
    pub fn with_device(mut self, device_name: impl Into<String>, volume_id: impl Into<String>) -> Self {
        self.block_devices.push(BlockDevice {
            device_name: device_name.into(),
            volume_id: volume_id.into(),
        });
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key, value);
        self
    }
}

/// Attachment status of a volume. Deleted volumes are simply absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VolumeState {
    /// Attached to an instance
    InUse,
    /// Not attached to any instance
    Available,
    /// Transitional or provider-specific state (creating, deleting, error, ...)
    Other(String),
}

impl VolumeState {
    pub fn parse(state: &str) -> Self {
        match state {
            "in-use" => VolumeState::InUse,
            "available" => VolumeState::Available,
            other => VolumeState::Other(other.to_string()),
        }
    }

    /// Provider filter value for this state
    pub fn as_str(&self) -> &str {
        match self {
            VolumeState::InUse => "in-use",
            VolumeState::Available => "available",
            VolumeState::Other(s) => s,
        }
    }
}

/// A block-storage volume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Volume {
    pub id: String,
    pub state: VolumeState,
    pub tags: TagMap,
}

impl Volume {
    pub fn new(id: impl Into<String>, state: VolumeState) -> Self {
        Self {
            id: id.into(),
            state,
            tags: TagMap::new(),
        }
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key, value);
        self
    }
}

/// A point-in-time snapshot of a volume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: String,
    /// Source volume; may no longer exist
    pub volume_id: String,
    pub start_time: DateTime<Utc>,
    pub tags: TagMap,
}

impl Snapshot {
    pub fn new(id: impl Into<String>, volume_id: impl Into<String>, start_time: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            volume_id: volume_id.into(),
            start_time,
            tags: TagMap::new(),
        }
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key, value);
        self
    }

    /// Created by this tool's backup pass
    pub fn is_automated(&self) -> bool {
        self.tags.is_automated()
    }
}
