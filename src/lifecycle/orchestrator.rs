//! Lifecycle orchestrator - runs backup and purge stages against a gateway.
//!
//! Stages run strictly in order, one gateway call at a time:
//! 1. attached volumes: per volume, purge its snapshots then maybe back it up
//! 2. orphaned: purge snapshots whose volume id no longer exists
//! 3. unattached: purge snapshots of volumes in the `available` state
//!
//! The three populations come from separate listings with no shared view of the
//! inventory. A volume that changes state between listings can be handled by
//! two stages or by none.

use std::collections::HashSet;
use std::sync::Arc;

use log::{debug, info, warn};

use crate::classify;
use crate::domain::{
    AUTOMATED_BACKUP, CREATED_BY_TAG, Instance, NAME_TAG, RunSummary, Snapshot, TagMap, Volume, VolumeState,
};
use crate::error::Result;
use crate::gateway::{Gateway, GatewayError, SnapshotFilter, VolumeFilter};
use crate::retention::{Clock, SystemClock, keep_reason};

use super::options::{RunOptions, Stage};

/// Drives one snapshot lifecycle run.
pub struct Orchestrator<G>
where
    G: Gateway,
{
    gateway: Arc<G>,
    options: RunOptions,
    clock: Arc<dyn Clock>,
}

impl<G> Orchestrator<G>
where
    G: Gateway,
{
    pub fn new(gateway: Arc<G>, options: RunOptions) -> Self {
        Self::with_clock(gateway, options, Arc::new(SystemClock))
    }

    pub fn with_clock(gateway: Arc<G>, options: RunOptions, clock: Arc<dyn Clock>) -> Self {
        Self {
            gateway,
            options,
            clock,
        }
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    /// Run every enabled stage.
    ///
    /// Any error other than a bad-request deletion ends the run immediately;
    /// counters gathered so far are discarded with it.
    pub async fn run(&self) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        for stage in self.options.stages() {
            info!("Stage: {}", stage);
            summary += match stage {
                Stage::Attached => self.process_attached().await?,
                Stage::Orphaned => self.purge_orphaned().await?,
                Stage::Unattached => self.purge_unattached().await?,
            };
        }

        info!(
            "Run complete: {} snapshots deleted, {} volume snapshots created",
            summary.snapshots_deleted, summary.volumes_snapshotted
        );
        Ok(summary)
    }

    async fn process_attached(&self) -> Result<RunSummary> {
        let instances = self.gateway.list_instances().await?;
        info!("Number of instances: {}", instances.len());

        let mut summary = RunSummary::default();
        for instance in &instances {
            summary += self.process_instance(instance).await?;
        }
        Ok(summary)
    }

    async fn process_instance(&self, instance: &Instance) -> Result<RunSummary> {
        info!("Instance {} - state: {}", instance.id, instance.state);
        for (key, value) in instance.tags.iter() {
            debug!("  tag {} = {}", key, value);
        }

        let mut summary = RunSummary::default();
        for device in &instance.block_devices {
            info!("  device {} - volume {}", device.device_name, device.volume_id);
            let volumes = self
                .gateway
                .list_volumes(&VolumeFilter::Ids(vec![device.volume_id.clone()]))
                .await?;
            for volume in &volumes {
                summary += self.process_volume(volume).await?;
            }
        }
        Ok(summary)
    }

    /// Purge before backup, so a snapshot created in this run is never a purge candidate.
    async fn process_volume(&self, volume: &Volume) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        if self.options.purge_attached {
            let snapshots = self
                .gateway
                .list_snapshots(&SnapshotFilter::VolumeIds(vec![volume.id.clone()]))
                .await?;
            summary += self.purge(snapshots).await?;
        }

        for (key, value) in volume.tags.iter() {
            debug!("    volume tag {} = {}", key, value);
        }

        if !self.options.backup_enabled {
            return Ok(summary);
        }
        if self.options.tagged_only && !volume.tags.backup_requested() {
            info!("    skipping volume {}: not tagged Backup=true", volume.id);
            return Ok(summary);
        }

        self.create_backup(volume).await?;
        summary += RunSummary::snapshotted(1);
        Ok(summary)
    }

    async fn purge_orphaned(&self) -> Result<RunSummary> {
        let volumes = self.gateway.list_volumes(&VolumeFilter::All).await?;
        info!("Total number of alive volumes: {}", volumes.len());
        let alive: HashSet<&str> = volumes.iter().map(|v| v.id.as_str()).collect();

        let snapshots = self.gateway.list_snapshots(&SnapshotFilter::OwnedBySelf).await?;
        let orphaned: Vec<Snapshot> = snapshots
            .into_iter()
            .filter(|s| !alive.contains(s.volume_id.as_str()))
            .collect();
        info!("Total number of snapshots with no volume: {}", orphaned.len());

        self.purge(orphaned).await
    }

    async fn purge_unattached(&self) -> Result<RunSummary> {
        let volumes = self
            .gateway
            .list_volumes(&VolumeFilter::State(VolumeState::Available))
            .await?;
        info!("Total number of available volumes: {}", volumes.len());
        if volumes.is_empty() {
            return Ok(RunSummary::default());
        }

        let ids = volumes.into_iter().map(|v| v.id).collect();
        let snapshots = self.gateway.list_snapshots(&SnapshotFilter::VolumeIds(ids)).await?;
        info!("Total number of snapshots of available volumes: {}", snapshots.len());

        self.purge(snapshots).await
    }

    /// Apply the automated-only filter and retention policy, deleting what is not kept.
    async fn purge(&self, snapshots: Vec<Snapshot>) -> Result<RunSummary> {
        let candidates = if self.options.purge_automated_only {
            classify::automated_only(snapshots)
        } else {
            snapshots
        };

        let mut deleted = 0;
        for snapshot in &candidates {
            info!("Checking snapshot {} with date {}", snapshot.id, snapshot.start_time);
            if let Some(reason) = keep_reason(snapshot.start_time, self.clock.now()) {
                debug!("  keeping {} ({:?})", snapshot.id, reason);
                continue;
            }

            match self.delete_snapshot(&snapshot.id).await {
                Ok(()) => deleted += 1,
                Err(e) if e.is_bad_request() => {
                    warn!("Could not delete snapshot {}, ignoring it: {}", snapshot.id, e);
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(RunSummary::deleted(deleted))
    }

    async fn delete_snapshot(&self, snapshot_id: &str) -> std::result::Result<(), GatewayError> {
        info!("Deleting snapshot {}", snapshot_id);
        if self.options.dry_run {
            info!("!!!SIMULATION ONLY!!!");
            return Ok(());
        }
        self.gateway.delete_snapshot(snapshot_id).await
    }

    /// Snapshot a volume and mark it as ours. Failure of either call is fatal.
    async fn create_backup(&self, volume: &Volume) -> Result<()> {
        info!("Creating snapshot of volume {}", volume.id);
        if self.options.dry_run {
            info!("!!!SIMULATION ONLY!!!");
            return Ok(());
        }

        let snapshot = self.gateway.create_snapshot(&volume.id, &volume.id).await?;
        info!("Created snapshot {} - date of creation: {}", snapshot.id, snapshot.start_time);

        let tags = TagMap::from_pairs([(NAME_TAG, volume.tags.name()), (CREATED_BY_TAG, AUTOMATED_BACKUP)]);
        self.gateway.tag_resource(&snapshot.id, &tags).await?;
        Ok(())
    }
}
