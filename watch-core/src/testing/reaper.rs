//! Reaper that records what it was asked to remove.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use watch_types::WatchError;

use crate::lock;
use crate::source::{CleanupTarget, Reaper};

#[derive(Debug, Default)]
struct Inner {
    reaped: Vec<CleanupTarget>,
    failing: HashSet<CleanupTarget>,
}

/// Records reaped targets and the peak number of concurrent removals.
#[derive(Debug, Clone, Default)]
pub struct RecordingReaper {
    inner: Arc<Mutex<Inner>>,
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
    latency: Duration,
}

impl RecordingReaper {
    /// Reaper whose removals complete immediately.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reaper whose removals each take `latency`.
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }

    /// Make removal of `target` fail.
    pub fn fail_on(&self, target: CleanupTarget) {
        lock(&self.inner).failing.insert(target);
    }

    /// Targets removed so far, in completion order (failures included).
    pub fn reaped(&self) -> Vec<CleanupTarget> {
        lock(&self.inner).reaped.clone()
    }

    /// Largest number of removals observed in flight at once.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Reaper for RecordingReaper {
    async fn reap(&self, target: &CleanupTarget) -> Result<(), WatchError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        let mut inner = lock(&self.inner);
        inner.reaped.push(target.clone());
        if inner.failing.contains(target) {
            return Err(WatchError::Cleanup {
                resource: target.to_string(),
                reason: "scripted failure".into(),
            });
        }
        Ok(())
    }
}
