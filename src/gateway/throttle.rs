//! Inter-call pacing.
//!
//! The provider enforces per-account rate limits, so every gateway call waits
//! for the throttle first. The strategy is injected so tests run without delay.

use std::time::Duration;

use async_trait::async_trait;
use log::trace;

use super::traits::{Gateway, GatewayError, SnapshotFilter, VolumeFilter};
use crate::domain::{Instance, Snapshot, TagMap, Volume};

/// Delay strategy applied before each gateway call.
#[async_trait]
pub trait Throttle: Send + Sync {
    async fn pause(&self);
}

/// Sleep a fixed duration before every call.
#[derive(Debug, Clone, Copy)]
pub struct FixedDelay(pub Duration);

impl FixedDelay {
    pub fn from_millis(ms: u64) -> Self {
        Self(Duration::from_millis(ms))
    }
}

#[async_trait]
impl Throttle for FixedDelay {
    async fn pause(&self) {
        if !self.0.is_zero() {
            trace!("Throttling for {:?}", self.0);
            tokio::time::sleep(self.0).await;
        }
    }
}

/// No delay at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

#[async_trait]
impl Throttle for NoDelay {
    async fn pause(&self) {}
}

/// Gateway decorator that waits on a [`Throttle`] before delegating.
pub struct Throttled<G, T> {
    inner: G,
    throttle: T,
}

impl<G, T> Throttled<G, T>
where
    G: Gateway,
    T: Throttle,
{
    pub fn new(inner: G, throttle: T) -> Self {
        Self { inner, throttle }
    }

    pub fn inner(&self) -> &G {
        &self.inner
    }
}

#[async_trait]
impl<G, T> Gateway for Throttled<G, T>
where
    G: Gateway,
    T: Throttle,
{
    async fn list_instances(&self) -> Result<Vec<Instance>, GatewayError> {
        self.throttle.pause().await;
        self.inner.list_instances().await
    }

    async fn list_volumes(&self, filter: &VolumeFilter) -> Result<Vec<Volume>, GatewayError> {
        self.throttle.pause().await;
        self.inner.list_volumes(filter).await
    }

    async fn list_snapshots(&self, filter: &SnapshotFilter) -> Result<Vec<Snapshot>, GatewayError> {
        self.throttle.pause().await;
        self.inner.list_snapshots(filter).await
    }

    async fn create_snapshot(&self, volume_id: &str, description: &str) -> Result<Snapshot, GatewayError> {
        self.throttle.pause().await;
        self.inner.create_snapshot(volume_id, description).await
    }

    async fn tag_resource(&self, resource_id: &str, tags: &TagMap) -> Result<(), GatewayError> {
        self.throttle.pause().await;
        self.inner.tag_resource(resource_id, tags).await
    }

    async fn delete_snapshot(&self, snapshot_id: &str) -> Result<(), GatewayError> {
        self.throttle.pause().await;
        self.inner.delete_snapshot(snapshot_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::VolumeState;
    use crate::gateway::MockGateway;
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    /// Counts pauses instead of sleeping.
    #[derive(Default)]
    struct CountingThrottle {
        pauses: AtomicUsize,
    }

    #[async_trait]
    impl Throttle for CountingThrottle {
        async fn pause(&self) {
            self.pauses.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn mock() -> MockGateway {
        MockGateway::new(Utc.with_ymd_and_hms(2024, 6, 20, 0, 0, 0).unwrap())
            .with_volume(Volume::new("vol-1", VolumeState::InUse))
    }

    #[tokio::test]
    async fn test_pauses_before_every_call() {
        let gateway = Throttled::new(mock(), CountingThrottle::default());

        gateway.list_instances().await.unwrap();
        gateway.list_volumes(&VolumeFilter::All).await.unwrap();
        gateway.list_snapshots(&SnapshotFilter::OwnedBySelf).await.unwrap();
        let snap = gateway.create_snapshot("vol-1", "vol-1").await.unwrap();
        gateway.tag_resource(&snap.id, &TagMap::new()).await.unwrap();
        gateway.delete_snapshot(&snap.id).await.unwrap();

        assert_eq!(gateway.throttle.pauses.load(Ordering::SeqCst), 6);
        assert_eq!(gateway.inner().calls().len(), 6);
    }

    #[tokio::test]
    async fn test_pauses_even_when_call_fails() {
        let gateway = Throttled::new(mock(), CountingThrottle::default());

        assert!(gateway.delete_snapshot("snap-missing").await.is_err());
        assert_eq!(gateway.throttle.pauses.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fixed_delay_sleeps() {
        let delay = FixedDelay::from_millis(20);
        let start = Instant::now();
        delay.pause().await;
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[tokio::test]
    async fn test_zero_delay_returns_immediately() {
        let start = Instant::now();
        FixedDelay::from_millis(0).pause().await;
        NoDelay.pause().await;
        assert!(start.elapsed() < Duration::from_millis(20));
    }
}
