//! Live removal of leftover containers and keys.

use async_trait::async_trait;
use watch_core::{CleanupTarget, Reaper};
use watch_types::WatchError;

use crate::docker::DockerClient;
use crate::etcd::EtcdClient;

/// Force-removes containers and recursively deletes key prefixes.
#[derive(Debug, Clone)]
pub struct LiveReaper {
    docker: DockerClient,
    etcd: EtcdClient,
}

impl LiveReaper {
    /// Reaper using the given clients.
    pub fn new(docker: DockerClient, etcd: EtcdClient) -> Self {
        Self { docker, etcd }
    }
}

#[async_trait]
impl Reaper for LiveReaper {
    async fn reap(&self, target: &CleanupTarget) -> Result<(), WatchError> {
        match target {
            CleanupTarget::Container(id) => self
                .docker
                .remove_container(id)
                .await
                .map_err(|e| e.into_cleanup(target.to_string())),
            CleanupTarget::KeyPrefix(prefix) if prefix.trim_end_matches('/').is_empty() => {
                Err(WatchError::Cleanup {
                    resource: target.to_string(),
                    reason: "refusing to delete the store root".into(),
                })
            }
            CleanupTarget::KeyPrefix(prefix) => self
                .etcd
                .delete_recursive(prefix)
                .await
                .map_err(|e| e.into_cleanup(target.to_string())),
        }
    }
}
