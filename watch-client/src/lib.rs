//! # watch-client
//!
//! Live adapters for the navy convoy watcher.
//!
//! - [`DockerEventSource`], [`DockerInspector`] - Container runtime feed and id lookups (bollard)
//! - [`EtcdEventSource`], [`EtcdClient`] - Coordination store watch, deletes and queue pushes (etcd v2)
//! - [`LiveReaper`] - Teardown of containers and key prefixes
//! - [`ClientConfig`] - Connection settings from TOML or the environment
//!
//! [`live_feeds`] wires all of them into a [`watch_core::Feeds`] ready for
//! [`watch_core::SuiteContext::start`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod docker;
pub mod error;
pub mod etcd;
pub mod reaper;

pub use config::{ClientConfig, ConfigError, DockerConfig, EtcdConfig};
pub use docker::{DockerClient, DockerEventSource, DockerInspector};
pub use error::ClientError;
pub use etcd::{parse_mutation, EtcdClient, EtcdEventSource};
pub use reaper::LiveReaper;

use std::sync::Arc;
use watch_core::Feeds;

/// Connect both clients and wrap them as engine feeds.
pub fn live_feeds(config: &ClientConfig) -> Result<Feeds, ClientError> {
    let docker = DockerClient::connect(&config.docker)?;
    let etcd = EtcdClient::new(&config.etcd)?;
    tracing::debug!(etcd = etcd.endpoint(), "clients configured");

    Ok(Feeds {
        containers: Arc::new(DockerEventSource::new(docker.clone())),
        resolver: Arc::new(DockerInspector::new(docker.clone())),
        mutations: Arc::new(EtcdEventSource::new(etcd.clone())),
        reaper: Arc::new(LiveReaper::new(docker, etcd)),
    })
}
