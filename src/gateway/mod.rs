//! Gateway layer - access to the compute/volume/snapshot API
//!
//! This module provides:
//! - Gateway trait for API abstraction
//! - GatewayError with bad-request classification
//! - Throttle strategies and the Throttled decorator
//! - AwsCliGateway implementation backed by the `aws` CLI
//! - MockGateway in-memory implementation for tests and rehearsals

pub mod aws_cli;
pub mod mock;
pub mod throttle;
pub mod traits;

pub use aws_cli::{AwsCliConfig, AwsCliGateway};
pub use mock::{GatewayCall, MockGateway};
pub use throttle::{FixedDelay, NoDelay, Throttle, Throttled};
pub use traits::{Gateway, GatewayError, SnapshotFilter, VolumeFilter};
