//! Run outcome counters.

use std::ops::AddAssign;

/// Counters reported once a run completes.
///
/// Stages return their own summary and the orchestrator adds them up, so no
/// counter is shared between stages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub snapshots_deleted: usize,
    pub volumes_snapshotted: usize,
}

impl RunSummary {
    pub fn deleted(count: usize) -> Self {
        Self {
            snapshots_deleted: count,
            volumes_snapshotted: 0,
        }
    }

    pub fn snapshotted(count: usize) -> Self {
        Self {
            snapshots_deleted: 0,
            volumes_snapshotted: count,
        }
    }
}

impl AddAssign for RunSummary {
    fn add_assign(&mut self, other: Self) {
        self.snapshots_deleted += other.snapshots_deleted;
        self.volumes_snapshotted += other.volumes_snapshotted;
    }
}
