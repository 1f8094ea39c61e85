//! Requests pushed onto the orchestrator's convoy queue.

use serde::{Deserialize, Serialize};

/// Queue key the orchestrator consumes convoy requests from.
pub const CONVOY_QUEUE: &str = "/navy/queues/convoys";

/// Kind of convoy request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestKind {
    /// Launch a convoy from a manifest.
    Create,
    /// Tear a convoy down.
    Destroy,
}

/// A request document. The watcher never interprets the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvoyRequest {
    /// Request kind.
    pub request: RequestKind,
    /// Convoy name.
    pub name: String,
    /// Manifest body (YAML), only for `create`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest: Option<String>,
}

impl ConvoyRequest {
    /// A `create` request for `name` with the given manifest.
    pub fn create(name: impl Into<String>, manifest: impl Into<String>) -> Self {
        Self {
            request: RequestKind::Create,
            name: name.into(),
            manifest: Some(manifest.into()),
        }
    }

    /// A `destroy` request for `name`.
    pub fn destroy(name: impl Into<String>) -> Self {
        Self {
            request: RequestKind::Destroy,
            name: name.into(),
            manifest: None,
        }
    }
}
