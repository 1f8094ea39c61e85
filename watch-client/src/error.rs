//! Error types for the live adapters.

use watch_types::{SourceKind, WatchError};

use crate::config::ConfigError;

/// Errors from talking to the container runtime or the coordination store.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Container runtime call failed.
    #[error("docker error: {0}")]
    Docker(#[from] bollard::errors::Error),

    /// HTTP transport failure talking to etcd.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body could not be decoded.
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// etcd answered with an error status.
    #[error("etcd returned {status}: {body}")]
    Etcd {
        /// HTTP status code.
        status: u16,
        /// Response body (etcd error document).
        body: String,
    },

    /// Configuration could not be loaded.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

impl ClientError {
    /// True if etcd reported that the key does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            ClientError::Etcd { status, .. } => *status == 404,
            ClientError::Docker(bollard::errors::Error::DockerResponseServerError {
                status_code,
                ..
            }) => *status_code == 404,
            _ => false,
        }
    }

    /// True if etcd reported that the requested `waitIndex` has been
    /// compacted out of its event history (error code 401).
    pub fn is_index_cleared(&self) -> bool {
        match self {
            ClientError::Etcd { body, .. } => serde_json::from_str::<serde_json::Value>(body)
                .map(|doc| doc["errorCode"] == 401)
                .unwrap_or(false),
            _ => false,
        }
    }

    /// A subscription or poll on `kind` failed.
    pub fn into_transient(self, kind: SourceKind) -> WatchError {
        WatchError::StreamTransient {
            source_kind: kind,
            reason: self.to_string(),
        }
    }

    /// Looking up `id` failed.
    pub fn into_metadata(self, id: &str) -> WatchError {
        WatchError::MetadataFetch {
            id: id.to_string(),
            reason: self.to_string(),
        }
    }

    /// Removing `resource` failed.
    pub fn into_cleanup(self, resource: impl Into<String>) -> WatchError {
        WatchError::Cleanup {
            resource: resource.into(),
            reason: self.to_string(),
        }
    }
}
