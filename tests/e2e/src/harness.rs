//! Live scenario harness.
//!
//! Wires the real docker/etcd adapters into a [`SuiteContext`] and hands each
//! scenario body a [`Convoy`] handle (a unique convoy name plus the clients
//! needed to drive the orchestrator) and the [`TestCase`] to declare
//! expectations on.

use rand::RngCore;
use std::future::Future;
use thiserror::Error;
use tokio::sync::{Mutex, MutexGuard};
use tracing_subscriber::EnvFilter;
use watch_client::{live_feeds, ClientError, ConfigError, DockerClient, EtcdClient};
use watch_core::{SuiteContext, TestCase};
use watch_types::{ConvoyRequest, WatchError, CONVOY_QUEUE};

use crate::config;

/// Errors that can occur while running a live scenario.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// Config could not be loaded.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Docker or etcd call failed.
    #[error("client error: {0}")]
    Client(#[from] ClientError),

    /// Watcher misuse or a failed expectation.
    #[error("{0}")]
    Watch(#[from] WatchError),
}

/// Held for the whole life of a suite. Teardown reaps every container and key
/// prefix the suite saw, including ones created by a concurrently running
/// scenario, so suites in one process must not overlap.
static SUITE_SLOT: Mutex<()> = Mutex::const_new(());

/// Wait until no other suite is running in this process.
pub async fn exclusive_suite() -> MutexGuard<'static, ()> {
    SUITE_SLOT.lock().await
}

/// A random convoy name, `example_<32 hex chars>`.
pub fn convoy_id() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!("example_{}", hex::encode(bytes))
}

/// One uniquely named convoy and the clients to drive it.
#[derive(Debug, Clone)]
pub struct Convoy {
    id: String,
    docker: DockerClient,
    etcd: EtcdClient,
}

impl Convoy {
    /// Convoy name.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Name of the first container of `app`.
    pub fn container(&self, app: &str) -> String {
        format!("{}_{}_1", self.id, app)
    }

    /// Name of the pre-task container of `app`.
    pub fn pretasks(&self, app: &str) -> String {
        format!("{}_{}_pretasks", self.id, app)
    }

    /// Name of the environment dependency `name`.
    pub fn dependency(&self, name: &str) -> String {
        format!("{}_{}", self.id, name)
    }

    /// Orchestrator state key (`desired` or `actual`) for `container`.
    pub fn key(&self, container: &str, leaf: &str) -> String {
        format!("/navy/containers/{}/{}", container, leaf)
    }

    /// Hostname the proxy publishes for `app` on `cluster`.
    pub fn host_addr(&self, app: &str, cluster: &str) -> String {
        format!("https://{}-{}-{}", self.id, app, cluster)
    }

    /// Ask the orchestrator to launch this convoy from `manifest`.
    pub async fn create(&self, manifest: &str) -> Result<(), HarnessError> {
        self.etcd
            .queue_json(CONVOY_QUEUE, &ConvoyRequest::create(&self.id, manifest))
            .await?;
        tracing::info!(convoy = %self.id, "create queued");
        Ok(())
    }

    /// Ask the orchestrator to tear this convoy down.
    pub async fn destroy(&self) -> Result<(), HarnessError> {
        self.etcd
            .queue_json(CONVOY_QUEUE, &ConvoyRequest::destroy(&self.id))
            .await?;
        tracing::info!(convoy = %self.id, "destroy queued");
        Ok(())
    }

    /// Force-remove a container behind the orchestrator's back.
    pub async fn kill_container(&self, name: &str) -> Result<(), HarnessError> {
        self.docker.remove_container(name).await?;
        tracing::info!(container = name, "container killed");
        Ok(())
    }
}

/// Suite context plus the convoy a scenario runs against.
#[derive(Debug)]
pub struct NavyHarness {
    suite: SuiteContext,
    convoy: Convoy,
}

impl NavyHarness {
    /// Connect to docker and etcd and start the suite watchers.
    pub async fn start() -> Result<Self, HarnessError> {
        let config = config::load()?;
        let feeds = live_feeds(&config)?;
        let convoy = Convoy {
            id: convoy_id(),
            docker: DockerClient::connect(&config.docker)?,
            etcd: EtcdClient::new(&config.etcd)?,
        };
        let suite = SuiteContext::start(feeds, config.watch)?;
        tracing::info!(convoy = %convoy.id, "harness ready");

        Ok(Self { suite, convoy })
    }

    /// The convoy this harness drives.
    pub fn convoy(&self) -> &Convoy {
        &self.convoy
    }

    /// Run one test case, then tear the suite down whatever the outcome.
    pub async fn run<F, Fut>(self, name: &str, body: F) -> Result<(), HarnessError>
    where
        F: FnOnce(Convoy, TestCase) -> Fut,
        Fut: Future<Output = Result<(), HarnessError>>,
    {
        let convoy = self.convoy.clone();
        let outcome = self
            .suite
            .run_case(name, |case| body(convoy, case))
            .await;

        let report = self.suite.teardown().await;
        tracing::info!(
            attempted = report.attempted,
            failed = report.failed,
            "cleaned up"
        );
        outcome
    }
}

/// Start a harness, run `body` as test case `name`, and panic with the full
/// diagnostic if anything failed.
pub async fn scenario<F, Fut>(name: &str, body: F)
where
    F: FnOnce(Convoy, TestCase) -> Fut,
    Fut: Future<Output = Result<(), HarnessError>>,
{
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_test_writer()
        .try_init();

    let _slot = exclusive_suite().await;
    let harness = match NavyHarness::start().await {
        Ok(harness) => harness,
        Err(e) => panic!("failed to start harness: {}", e),
    };
    if let Err(e) = harness.run(name, body).await {
        panic!("{} failed:\n{}", name, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn convoy_ids_are_unique_and_well_formed() {
        let a = convoy_id();
        let b = convoy_id();
        assert_ne!(a, b);
        assert!(a.starts_with("example_"));
        let suffix = &a["example_".len()..];
        assert_eq!(suffix.len(), 32);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[tokio::test]
    async fn suites_do_not_overlap() {
        let first = exclusive_suite().await;
        let waiting = tokio::spawn(async {
            let _second = exclusive_suite().await;
        });
        tokio::task::yield_now().await;
        assert!(!waiting.is_finished());
        assert!(SUITE_SLOT.try_lock().is_err());

        drop(first);
        waiting.await.unwrap();
        assert!(SUITE_SLOT.try_lock().is_ok());
    }
}
