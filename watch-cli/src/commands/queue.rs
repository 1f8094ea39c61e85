//! Push convoy requests onto the orchestrator queue.

use anyhow::{Context, Result};
use std::path::Path;
use watch_client::{ClientConfig, EtcdClient};
use watch_types::{ConvoyRequest, CONVOY_QUEUE};

/// Queue a `create` request with the manifest read from `manifest`.
pub async fn create(config: &ClientConfig, name: &str, manifest: &Path) -> Result<()> {
    let manifest = tokio::fs::read_to_string(manifest)
        .await
        .with_context(|| format!("Failed to read manifest {}", manifest.display()))?;
    send(config, &ConvoyRequest::create(name, manifest)).await
}

/// Queue a `destroy` request.
pub async fn destroy(config: &ClientConfig, name: &str) -> Result<()> {
    send(config, &ConvoyRequest::destroy(name)).await
}

async fn send(config: &ClientConfig, request: &ConvoyRequest) -> Result<()> {
    let etcd = EtcdClient::new(&config.etcd).context("Failed to build etcd client")?;
    let entry = etcd
        .queue_json(CONVOY_QUEUE, request)
        .await
        .with_context(|| format!("Failed to queue request for {}", request.name))?;
    println!("Queued {:?} for {} at {}", request.request, request.name, entry.key);
    Ok(())
}
