//! Snapshot lifecycle - backup and retention-based purge
//!
//! The orchestrator walks three snapshot populations (attached, orphaned and
//! unattached volumes) against a [`Gateway`](crate::gateway::Gateway) and
//! reports what it created and deleted.

pub mod options;
pub mod orchestrator;

pub use options::{RunOptions, Stage};
pub use orchestrator::Orchestrator;
