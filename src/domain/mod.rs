//! Domain types for snapkeep
//!
//! This module contains the provider-neutral inventory types:
//! - TagMap: key/value tags with last-wins duplicate handling
//! - Instance, Volume, Snapshot: the resources read from the gateway
//! - RunSummary: deletion and creation counters for one run

pub mod resource;
pub mod summary;
pub mod tags;

pub use resource::{BlockDevice, Instance, Snapshot, Volume, VolumeState};
pub use summary::RunSummary;
pub use tags::{TagMap, AUTOMATED_BACKUP, BACKUP_TAG, CREATED_BY_TAG, NAME_TAG};
