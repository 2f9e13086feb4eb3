//! snapkeep - EBS snapshot backup and retention
//!
//! Creates snapshots of volumes attached to instances and purges aged
//! snapshots of attached, unattached and deleted volumes according to a
//! monthly/yearly retention policy.

pub mod classify;
pub mod config;
pub mod domain;
pub mod error;
pub mod gateway;
pub mod lifecycle;
pub mod retention;

pub use error::{Result, SnapkeepError};
