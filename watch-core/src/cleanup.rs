//! Best-effort teardown fan-out.
//!
//! One task per target, all joined before returning. Individual failures are
//! logged and counted, never surfaced as errors.

use std::sync::Arc;
use tokio::task::JoinSet;

use crate::source::{CleanupTarget, Reaper};

/// Outcome of a cleanup pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Number of removals issued.
    pub attempted: usize,
    /// Number of removals that failed (or whose task died).
    pub failed: usize,
}

impl CleanupReport {
    /// Combine two reports.
    pub fn merge(self, other: CleanupReport) -> CleanupReport {
        CleanupReport {
            attempted: self.attempted + other.attempted,
            failed: self.failed + other.failed,
        }
    }
}

/// Reap every target concurrently and wait for all of them.
pub async fn reap_all(targets: Vec<CleanupTarget>, reaper: Arc<dyn Reaper>) -> CleanupReport {
    let mut report = CleanupReport {
        attempted: targets.len(),
        failed: 0,
    };
    let mut tasks = JoinSet::new();

    for target in targets {
        let reaper = Arc::clone(&reaper);
        tasks.spawn(async move {
            let outcome = reaper.reap(&target).await;
            (target, outcome)
        });
    }

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((target, Ok(()))) => tracing::debug!(%target, "reaped"),
            Ok((target, Err(e))) => {
                tracing::debug!(%target, error = %e, "cleanup failed, ignoring");
                report.failed += 1;
            }
            Err(e) => {
                tracing::debug!(error = %e, "cleanup task died, ignoring");
                report.failed += 1;
            }
        }
    }

    report
}
