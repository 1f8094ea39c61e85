//! Watcher: background consumption tasks plus an event log and the
//! expectations declared against it.
//!
//! # Lifecycle
//!
//! ```text
//! Created ──start()──► Running ──stop()──► Stopped
//!                         │                   ▲
//!                         └─────abort()───────┘
//! ```
//!
//! - `start()` anchors the log and spawns one consumer task per source.
//! - `stop()` verifies every declared expectation in declaration order (the
//!   first failure skips the rest), then hard-cancels the consumers.
//! - `abort()` hard-cancels without verifying.
//!
//! Consumers never give up on their own: a failed subscription or a stream
//! error is logged and the source is subscribed again. Cancellation drops
//! whatever call is in flight, so a consumer blocked on a long-poll stops
//! immediately. Dropping a running watcher cancels it as well.

use futures_util::StreamExt;
use std::fmt;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use watch_types::{SourceKind, WatchError};

use crate::cache::IdentityCache;
use crate::cleanup::{reap_all, CleanupReport};
use crate::config::WatchConfig;
use crate::expectation::{await_match, Expectation};
use crate::lock;
use crate::log::{Candidate, EventLog};
use crate::source::{EventSource, MetadataResolver, Reaper};

/// Lifecycle state of a [`Watcher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherState {
    /// Built, not consuming yet.
    Created,
    /// Consumer tasks are running.
    Running,
    /// Terminal.
    Stopped,
}

impl fmt::Display for WatcherState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WatcherState::Created => write!(f, "created"),
            WatcherState::Running => write!(f, "running"),
            WatcherState::Stopped => write!(f, "stopped"),
        }
    }
}

#[derive(Debug)]
struct Inner {
    state: WatcherState,
    expectations: Vec<Expectation>,
    tasks: Vec<JoinHandle<()>>,
}

/// Consumes event feeds into an [`EventLog`] and verifies expectations on stop.
pub struct Watcher {
    label: String,
    sources: Vec<Arc<dyn EventSource>>,
    log: Arc<EventLog>,
    config: WatchConfig,
    shutdown: CancellationToken,
    inner: Mutex<Inner>,
}

impl Watcher {
    /// Create a watcher with no sources and no identity resolution.
    pub fn new(label: impl Into<String>, config: WatchConfig) -> Self {
        Self {
            label: label.into(),
            sources: Vec::new(),
            log: Arc::new(EventLog::new(Arc::new(IdentityCache::disabled()))),
            config,
            shutdown: CancellationToken::new(),
            inner: Mutex::new(Inner {
                state: WatcherState::Created,
                expectations: Vec::new(),
                tasks: Vec::new(),
            }),
        }
    }

    /// Consume `source` once started.
    pub fn with_source(mut self, source: Arc<dyn EventSource>) -> Self {
        self.sources.push(source);
        self
    }

    /// Resolve container ids through `resolver`.
    pub fn with_resolver(mut self, resolver: Arc<dyn MetadataResolver>) -> Self {
        self.log = Arc::new(EventLog::new(Arc::new(IdentityCache::new(resolver))));
        self
    }

    /// Label used in log output.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Current lifecycle state.
    pub fn state(&self) -> WatcherState {
        lock(&self.inner).state
    }

    /// The event log.
    pub fn log(&self) -> &Arc<EventLog> {
        &self.log
    }

    /// Timing configuration.
    pub fn config(&self) -> &WatchConfig {
        &self.config
    }

    /// Anchor the log and spawn one consumer task per source.
    pub fn start(&self) -> Result<(), WatchError> {
        let mut inner = lock(&self.inner);
        if inner.state != WatcherState::Created {
            return Err(WatchError::InvalidState(format!(
                "cannot start {} watcher '{}'",
                inner.state, self.label
            )));
        }
        if self.sources.is_empty() {
            return Err(WatchError::InvalidState(format!(
                "watcher '{}' has no sources",
                self.label
            )));
        }

        self.log.anchor();
        for source in &self.sources {
            inner.tasks.push(spawn_consumer(
                self.label.clone(),
                Arc::clone(source),
                Arc::clone(&self.log),
                self.shutdown.clone(),
                self.config.clone(),
            ));
        }
        inner.state = WatcherState::Running;
        tracing::debug!(watcher = %self.label, sources = self.sources.len(), "watcher started");
        Ok(())
    }

    /// Declare an expectation, verified when the watcher stops.
    pub fn expect(&self, expectation: Expectation) -> Result<(), WatchError> {
        let mut inner = lock(&self.inner);
        if inner.state == WatcherState::Stopped {
            return Err(WatchError::InvalidState(format!(
                "watcher '{}' already stopped, cannot expect {}",
                self.label, expectation
            )));
        }
        inner.expectations.push(expectation);
        Ok(())
    }

    /// Declared expectations, with their resolved flags.
    pub fn expectations(&self) -> Vec<Expectation> {
        lock(&self.inner).expectations.clone()
    }

    /// Block until an event of `kind` with `action` for `target` is in the log.
    pub async fn await_event(&self, kind: SourceKind, action: &str, target: &str) -> Candidate {
        tracing::debug!(watcher = %self.label, %kind, action, target, "waiting for event");
        await_match(&self.log, kind, action, target, self.config.poll_interval()).await
    }

    /// Drop buffered events. Consumption and the anchor are unaffected.
    pub async fn clear(&self) {
        self.log.clear().await;
    }

    /// Activity lines for everything buffered so far.
    pub async fn activity(&self) -> Vec<String> {
        self.log.activity().await
    }

    /// Write the activity log to the tracing output.
    pub async fn dump_activity(&self) {
        let activity = self.activity().await;
        tracing::info!(watcher = %self.label, events = activity.len(), "events seen");
        for line in activity {
            tracing::info!(watcher = %self.label, "{}", line);
        }
    }

    /// Verify declared expectations in order, then hard-cancel consumption.
    ///
    /// Consumers are cancelled whether or not verification passes.
    pub async fn stop(&self) -> Result<(), WatchError> {
        let mut expectations = {
            let mut inner = lock(&self.inner);
            if inner.state != WatcherState::Running {
                return Err(WatchError::InvalidState(format!(
                    "cannot stop {} watcher '{}'",
                    inner.state, self.label
                )));
            }
            std::mem::take(&mut inner.expectations)
        };

        let outcome = self.verify_in_order(&mut expectations).await;
        lock(&self.inner).expectations = expectations;
        self.abort().await;
        outcome
    }

    async fn verify_in_order(&self, expectations: &mut [Expectation]) -> Result<(), WatchError> {
        for expectation in expectations.iter_mut() {
            tracing::debug!(watcher = %self.label, %expectation, "verifying");
            expectation.verify(&self.log, &self.config).await?;
            expectation.mark_resolved();
        }
        Ok(())
    }

    /// Hard-cancel consumption without verifying anything.
    pub async fn abort(&self) {
        self.shutdown.cancel();
        let tasks = {
            let mut inner = lock(&self.inner);
            inner.state = WatcherState::Stopped;
            std::mem::take(&mut inner.tasks)
        };
        for task in tasks {
            task.abort();
            if let Err(e) = task.await {
                if e.is_panic() {
                    tracing::error!(watcher = %self.label, error = %e, "consumer task panicked");
                }
            }
        }
        tracing::debug!(watcher = %self.label, "watcher stopped");
    }

    /// Remove every resource this watcher saw being created.
    pub async fn clean_up(&self, reaper: Arc<dyn Reaper>) -> CleanupReport {
        let targets = self.log.cleanup_targets().await;
        tracing::info!(watcher = %self.label, targets = targets.len(), "cleaning up");
        reap_all(targets, reaper).await
    }
}

impl Drop for Watcher {
    fn drop(&mut self) {
        self.shutdown.cancel();
        for task in &lock(&self.inner).tasks {
            task.abort();
        }
    }
}

impl fmt::Debug for Watcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Watcher")
            .field("label", &self.label)
            .field("sources", &self.sources.len())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

fn spawn_consumer(
    label: String,
    source: Arc<dyn EventSource>,
    log: Arc<EventLog>,
    shutdown: CancellationToken,
    config: WatchConfig,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let kind = source.kind();
        tracing::debug!(watcher = %label, source = %kind, "consumer started");

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                outcome = consume(source.as_ref(), &log) => match outcome {
                    Ok(()) => {
                        tracing::debug!(watcher = %label, source = %kind, "stream ended, re-subscribing")
                    }
                    Err(e) => tracing::warn!(
                        watcher = %label,
                        source = %kind,
                        error = %e,
                        "stream failed, re-subscribing"
                    ),
                },
            }

            let delay = config.resubscribe_delay();
            if delay.is_zero() {
                tokio::task::yield_now().await;
            } else {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }

        tracing::debug!(watcher = %label, source = %kind, "consumer cancelled");
    })
}

/// Drain one subscription into the log, resolving new ids inline.
async fn consume(source: &dyn EventSource, log: &EventLog) -> Result<(), WatchError> {
    let mut events = source.subscribe().await?;
    while let Some(event) = events.next().await {
        let event = event?;
        let id = event.resolution_id().map(str::to_owned);
        log.append(event).await;
        if let Some(id) = id {
            log.identities().resolve(&id).await;
        }
    }
    Ok(())
}
