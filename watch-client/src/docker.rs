//! Container runtime adapter built on `bollard`.
//!
//! - [`DockerEventSource`] subscribes to container lifecycle events.
//! - [`DockerInspector`] resolves container ids to name and environment.
//! - [`DockerClient::remove_container`] force-removes a container.

use async_trait::async_trait;
use bollard::container::{InspectContainerOptions, RemoveContainerOptions};
use bollard::models::{ContainerInspectResponse, EventMessage};
use bollard::system::EventsOptions;
use bollard::Docker;
use futures_util::stream::{BoxStream, StreamExt};
use std::collections::HashMap;
use watch_core::{EventSource, EventStream, MetadataResolver};
use watch_types::{ContainerEvent, RawEvent, ResolvedIdentity, SourceKind, WatchError};

use crate::config::DockerConfig;
use crate::error::ClientError;

/// Thin wrapper around a [`Docker`] connection.
#[derive(Debug, Clone)]
pub struct DockerClient {
    docker: Docker,
}

impl DockerClient {
    /// Connect to the configured socket, or the local defaults.
    pub fn connect(config: &DockerConfig) -> Result<Self, ClientError> {
        let docker = match &config.socket {
            Some(path) => Docker::connect_with_unix(
                &path.to_string_lossy(),
                config.timeout_secs,
                bollard::API_DEFAULT_VERSION,
            )?,
            None => Docker::connect_with_local_defaults()?,
        };
        Ok(Self { docker })
    }

    /// Container lifecycle events from now on.
    ///
    /// Messages without a container id are skipped.
    pub fn events(&self) -> BoxStream<'static, Result<ContainerEvent, ClientError>> {
        let options = EventsOptions::<String> {
            filters: HashMap::from([("type".to_string(), vec!["container".to_string()])]),
            ..Default::default()
        };
        self.docker
            .events(Some(options))
            .filter_map(|message| async move {
                match message {
                    Ok(message) => container_event(message).map(Ok),
                    Err(e) => Some(Err(ClientError::from(e))),
                }
            })
            .boxed()
    }

    /// Name and environment of container `id`.
    pub async fn inspect(&self, id: &str) -> Result<ResolvedIdentity, ClientError> {
        let response = self
            .docker
            .inspect_container(id, None::<InspectContainerOptions>)
            .await?;
        Ok(identity_from(response))
    }

    /// Force-remove a container by id or name.
    pub async fn remove_container(&self, id: &str) -> Result<(), ClientError> {
        let options = RemoveContainerOptions {
            force: true,
            ..Default::default()
        };
        self.docker.remove_container(id, Some(options)).await?;
        tracing::debug!(container = id, "container removed");
        Ok(())
    }
}

fn container_event(message: EventMessage) -> Option<ContainerEvent> {
    let action = message.action?;
    let id = message.actor.and_then(|actor| actor.id)?;
    Some(ContainerEvent::new(id, action))
}

fn identity_from(response: ContainerInspectResponse) -> ResolvedIdentity {
    let env = response
        .config
        .and_then(|config| config.env)
        .unwrap_or_default();
    ResolvedIdentity::new(response.name.unwrap_or_default(), env)
}

/// Container lifecycle feed.
#[derive(Debug, Clone)]
pub struct DockerEventSource {
    client: DockerClient,
}

impl DockerEventSource {
    /// Feed backed by `client`.
    pub fn new(client: DockerClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl EventSource for DockerEventSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Container
    }

    async fn subscribe(&self) -> Result<EventStream, WatchError> {
        let events = self.client.events().map(|event| {
            event
                .map(RawEvent::from)
                .map_err(|e| e.into_transient(SourceKind::Container))
        });
        Ok(events.boxed())
    }
}

/// Resolves container ids through the inspect endpoint.
#[derive(Debug, Clone)]
pub struct DockerInspector {
    client: DockerClient,
}

impl DockerInspector {
    /// Resolver backed by `client`.
    pub fn new(client: DockerClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MetadataResolver for DockerInspector {
    async fn fetch(&self, id: &str) -> Result<ResolvedIdentity, WatchError> {
        self.client.inspect(id).await.map_err(|e| e.into_metadata(id))
    }
}
