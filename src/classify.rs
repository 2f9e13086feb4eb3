//! Separates snapshots created by the backup pass from manual ones.

use crate::domain::Snapshot;

/// Keep only snapshots tagged `CreatedBy=AutomatedBackup`, in input order.
pub fn automated_only(snapshots: Vec<Snapshot>) -> Vec<Snapshot> {
    snapshots.into_iter().filter(Snapshot::is_automated).collect()
}
