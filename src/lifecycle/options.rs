//! Resolved options for one run.

/// Pipeline stage, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Backup and purge of volumes attached to instances
    Attached,
    /// Purge of snapshots whose volume no longer exists
    Orphaned,
    /// Purge of snapshots of volumes not attached to any instance
    Unattached,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Attached => "attached volumes",
            Stage::Orphaned => "no longer existing volumes",
            Stage::Unattached => "unattached volumes",
        };
        write!(f, "{}", name)
    }
}

/// Everything the orchestrator needs to know about what to do.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    pub region: String,
    /// Snapshot attached volumes
    pub backup_enabled: bool,
    /// Only snapshot volumes tagged `Backup=true`
    pub tagged_only: bool,
    /// Purge snapshots of attached volumes
    pub purge_attached: bool,
    /// Never touch snapshots without the provenance tag
    pub purge_automated_only: bool,
    /// Purge snapshots of volumes that no longer exist
    pub purge_orphaned: bool,
    /// Purge snapshots of volumes in the `available` state
    pub purge_unattached: bool,
    /// Report creations and deletions without issuing them
    pub dry_run: bool,
}

impl RunOptions {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            ..Default::default()
        }
    }

    /// Stages that will run, in order.
    pub fn stages(&self) -> Vec<Stage> {
        let mut stages = Vec::new();
        if self.backup_enabled || self.purge_attached {
            stages.push(Stage::Attached);
        }
        if self.purge_orphaned {
            stages.push(Stage::Orphaned);
        }
        if self.purge_unattached {
            stages.push(Stage::Unattached);
        }
        stages
    }

    /// Human-readable description of the run, one line per item.
    pub fn describe(&self) -> Vec<String> {
        const POLICY: &str = "current month, 1st day of each month and 1st day of each year are kept";
        let mut lines = Vec::new();

        if self.backup_enabled {
            lines.push("Will perform backups".to_string());
            if self.tagged_only {
                lines.push("Only volumes tagged with Backup=true will be backed up".to_string());
            }
        } else {
            lines.push("Will NOT perform backups".to_string());
        }

        for (enabled, stage) in [
            (self.purge_attached, Stage::Attached),
            (self.purge_orphaned, Stage::Orphaned),
            (self.purge_unattached, Stage::Unattached),
        ] {
            if enabled {
                lines.push(format!("Purging old snapshots of {} ({})", stage, POLICY));
            } else {
                lines.push(format!("Won't purge snapshots of {}", stage));
            }
        }

        let purging = self.purge_attached || self.purge_orphaned || self.purge_unattached;
        if purging && self.purge_automated_only {
            lines.push("Purging automated backups only".to_string());
        }
        if self.dry_run {
            lines.push("Dry run. Creation and deletion of snapshots will be simulated".to_string());
        }
        lines
    }
}
