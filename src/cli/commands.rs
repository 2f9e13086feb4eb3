//! CLI definitions using clap.
//!
//! A single invocation runs the enabled backup and purge stages once for one
//! region and exits.

use clap::Parser;
use std::path::PathBuf;

use snapkeep::lifecycle::RunOptions;

/// Snapshot backup and retention for EBS volumes
#[derive(Parser, Debug)]
#[command(name = "snapkeep")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// AWS region (falls back to the config file)
    pub region: Option<String>,

    /// Optional config file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Verbose mode: log to stderr instead of the log file
    #[arg(short, long)]
    pub verbose: bool,

    /// Perform backup
    #[arg(short, long)]
    pub backup: bool,

    /// Backup only volumes tagged with the Backup=true tag
    #[arg(short, long)]
    pub tagged: bool,

    /// Purge old backups of attached volumes
    #[arg(short, long)]
    pub purge: bool,

    /// Purge automated backups only. Will ignore manual backups
    #[arg(short = 'a', long = "purgeauto")]
    pub purge_auto: bool,

    /// Purge snapshots of no longer existing volumes
    #[arg(short = 'x', long = "nonexistingvolumes")]
    pub non_existing_volumes: bool,

    /// Purge snapshots of volumes no longer attached to instances
    #[arg(short = 'n', long = "notusedvolumes")]
    pub not_used_volumes: bool,

    /// Simulates creation and deletion of snapshots
    #[arg(short, long = "dryrun")]
    pub dry_run: bool,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Resolve flags into run options for `region`
    pub fn run_options(&self, region: impl Into<String>) -> RunOptions {
        RunOptions {
            region: region.into(),
            backup_enabled: self.backup,
            tagged_only: self.tagged,
            purge_attached: self.purge,
            purge_automated_only: self.purge_auto,
            purge_orphaned: self.non_existing_volumes,
            purge_unattached: self.not_used_volumes,
            dry_run: self.dry_run,
        }
    }
}
