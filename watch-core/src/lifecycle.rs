//! Suite and test-case lifecycle.
//!
//! A [`SuiteContext`] owns two suite-scoped watchers (containers, mutations)
//! that run for the whole test run and exist only to know what to clean up
//! at the end. Each test case gets its own fresh pair through
//! [`SuiteContext::begin_case`]; the [`TestCase`] handle is what test bodies
//! use to declare expectations and synchronise.
//!
//! ```text
//! SuiteContext::start ─► begin_case ─► body ─► TestCase::finish ─► ... ─► teardown
//!        │                   │                     (verify in order)        (cleanup)
//!   suite watchers      case watchers
//! ```

use std::future::Future;
use std::sync::Arc;
use watch_types::{SourceKind, WatchError};

use crate::cleanup::CleanupReport;
use crate::config::WatchConfig;
use crate::expectation::Expectation;
use crate::log::Candidate;
use crate::source::{EventSource, MetadataResolver, Reaper};
use crate::watcher::Watcher;

/// The external collaborators a suite runs against.
#[derive(Clone)]
pub struct Feeds {
    /// Container lifecycle feed.
    pub containers: Arc<dyn EventSource>,
    /// Name/environment lookups for container ids.
    pub resolver: Arc<dyn MetadataResolver>,
    /// Key mutation feed.
    pub mutations: Arc<dyn EventSource>,
    /// Removes leftovers at suite teardown.
    pub reaper: Arc<dyn Reaper>,
}

impl Feeds {
    fn container_watcher(&self, label: &str, config: &WatchConfig) -> Watcher {
        Watcher::new(label, config.clone())
            .with_source(Arc::clone(&self.containers))
            .with_resolver(Arc::clone(&self.resolver))
    }

    fn mutation_watcher(&self, label: &str, config: &WatchConfig) -> Watcher {
        Watcher::new(label, config.clone()).with_source(Arc::clone(&self.mutations))
    }
}

impl std::fmt::Debug for Feeds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Feeds")
            .field("containers", &self.containers.kind())
            .field("mutations", &self.mutations.kind())
            .finish_non_exhaustive()
    }
}

/// Suite-scoped context, threaded explicitly to every test case.
#[derive(Debug)]
pub struct SuiteContext {
    feeds: Feeds,
    config: WatchConfig,
    containers: Watcher,
    mutations: Watcher,
}

impl SuiteContext {
    /// Start the suite-level watchers.
    pub fn start(feeds: Feeds, config: WatchConfig) -> Result<Self, WatchError> {
        let containers = feeds.container_watcher("suite-containers", &config);
        let mutations = feeds.mutation_watcher("suite-mutations", &config);
        containers.start()?;
        mutations.start()?;
        tracing::info!("suite watchers started");

        Ok(Self {
            feeds,
            config,
            containers,
            mutations,
        })
    }

    /// The collaborators this suite was started with.
    pub fn feeds(&self) -> &Feeds {
        &self.feeds
    }

    /// Timing configuration handed to every watcher.
    pub fn config(&self) -> &WatchConfig {
        &self.config
    }

    /// Start a fresh pair of watchers for one test case.
    pub fn begin_case(&self, name: &str) -> Result<TestCase, WatchError> {
        let containers = self
            .feeds
            .container_watcher(&format!("{}/containers", name), &self.config);
        let mutations = self
            .feeds
            .mutation_watcher(&format!("{}/mutations", name), &self.config);
        containers.start()?;
        mutations.start()?;
        tracing::debug!(case = name, "test case started");

        Ok(TestCase {
            name: Arc::from(name),
            containers: Arc::new(containers),
            mutations: Arc::new(mutations),
        })
    }

    /// Run one test case: start watchers, run `body`, then verify.
    ///
    /// If the body itself fails its error is returned and the case watchers
    /// are cancelled without verification.
    pub async fn run_case<F, Fut, T, E>(&self, name: &str, body: F) -> Result<T, E>
    where
        F: FnOnce(TestCase) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<WatchError>,
    {
        let case = self.begin_case(name)?;
        match body(case.clone()).await {
            Ok(value) => {
                case.finish().await?;
                tracing::info!(case = name, "passed");
                Ok(value)
            }
            Err(e) => {
                case.abort().await;
                tracing::info!(case = name, "body failed, expectations skipped");
                Err(e)
            }
        }
    }

    /// Stop the suite watchers and remove everything they saw created.
    ///
    /// Failures are counted in the report, never raised.
    pub async fn teardown(self) -> CleanupReport {
        self.containers.abort().await;
        self.mutations.abort().await;

        let reaper = &self.feeds.reaper;
        let (containers, mutations) = tokio::join!(
            self.containers.clean_up(Arc::clone(reaper)),
            self.mutations.clean_up(Arc::clone(reaper)),
        );
        let report = containers.merge(mutations);
        tracing::info!(
            attempted = report.attempted,
            failed = report.failed,
            "suite cleanup finished"
        );
        report
    }
}

/// Handle for one test case's watchers.
#[derive(Debug, Clone)]
pub struct TestCase {
    name: Arc<str>,
    containers: Arc<Watcher>,
    mutations: Arc<Watcher>,
}

impl TestCase {
    /// Test case name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Container watcher for this case.
    pub fn containers(&self) -> &Watcher {
        &self.containers
    }

    /// Mutation watcher for this case.
    pub fn mutations(&self) -> &Watcher {
        &self.mutations
    }

    /// Declare an expectation on the watcher matching its kind.
    pub fn expect(&self, expectation: Expectation) -> Result<(), WatchError> {
        match expectation.kind() {
            SourceKind::Container => self.containers.expect(expectation),
            SourceKind::Mutation => self.mutations.expect(expectation),
        }
    }

    /// Expect a container event, verified at [`TestCase::finish`].
    pub fn expect_container(&self, expectation: Expectation) -> Result<(), WatchError> {
        Self::require_kind(&expectation, SourceKind::Container)?;
        self.containers.expect(expectation)
    }

    /// Expect a key mutation, verified at [`TestCase::finish`].
    pub fn expect_mutation(&self, expectation: Expectation) -> Result<(), WatchError> {
        Self::require_kind(&expectation, SourceKind::Mutation)?;
        self.mutations.expect(expectation)
    }

    fn require_kind(expectation: &Expectation, kind: SourceKind) -> Result<(), WatchError> {
        if expectation.kind() != kind {
            return Err(WatchError::InvalidState(format!(
                "{} is not a {} expectation",
                expectation, kind
            )));
        }
        Ok(())
    }

    /// Block until the container `name` reports `action`. No timeout.
    pub async fn await_container(&self, action: &str, name: &str) -> Candidate {
        self.containers
            .await_event(SourceKind::Container, action, name)
            .await
    }

    /// Block until `key` sees `action`. No timeout.
    pub async fn await_mutation(&self, action: &str, key: &str) -> Candidate {
        self.mutations
            .await_event(SourceKind::Mutation, action, key)
            .await
    }

    /// Forget container events seen so far, keeping the window anchor.
    pub async fn reset_container_events(&self) {
        self.containers.clear().await;
    }

    /// Activity lines from both watchers, containers first.
    pub async fn activity(&self) -> Vec<String> {
        let mut lines = self.containers.activity().await;
        lines.extend(self.mutations.activity().await);
        lines
    }

    /// Write both activity logs to the tracing output.
    pub async fn dump_activity(&self) {
        self.containers.dump_activity().await;
        self.mutations.dump_activity().await;
    }

    /// Verify container expectations, then mutation expectations.
    ///
    /// The first failure wins; the other watcher is cancelled unverified.
    pub async fn finish(&self) -> Result<(), WatchError> {
        if let Err(e) = self.containers.stop().await {
            self.mutations.abort().await;
            tracing::warn!(case = %self.name, error = %e, "verification failed");
            return Err(e);
        }
        self.mutations.stop().await.inspect_err(|e| {
            tracing::warn!(case = %self.name, error = %e, "verification failed");
        })
    }

    /// Cancel both watchers without verifying.
    pub async fn abort(&self) {
        self.containers.abort().await;
        self.mutations.abort().await;
    }
}
