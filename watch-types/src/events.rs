//! Raw events delivered by the container runtime and the coordination store.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which feed an event (or a source) belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Container lifecycle events from the container runtime.
    Container,
    /// Key mutation events from the coordination store.
    Mutation,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Container => write!(f, "container"),
            SourceKind::Mutation => write!(f, "mutation"),
        }
    }
}

/// A container lifecycle event (`create`, `start`, `die`, `destroy`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerEvent {
    /// Opaque container id assigned by the runtime.
    pub id: String,
    /// Lifecycle verb.
    pub status: String,
}

impl ContainerEvent {
    /// Create a container event.
    pub fn new(id: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: status.into(),
        }
    }
}

/// A key mutation observed on the coordination store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationEvent {
    /// Mutation verb (`set`, `delete`, `create`, `expire`, ...).
    pub action: String,
    /// Full key path, e.g. `/navy/containers/x_app_1/actual`.
    pub key: String,
    /// Stored value. Absent for deletes and directory nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Store index at which the mutation happened.
    #[serde(rename = "modifiedIndex")]
    pub modified_index: u64,
}

impl MutationEvent {
    /// Create a mutation event.
    pub fn new(
        action: impl Into<String>,
        key: impl Into<String>,
        value: Option<String>,
        modified_index: u64,
    ) -> Self {
        Self {
            action: action.into(),
            key: key.into(),
            value,
            modified_index,
        }
    }

    /// Decode the stored value as JSON.
    ///
    /// Returns `None` when there is no value or it is not valid JSON.
    pub fn json(&self) -> Option<serde_json::Value> {
        self.value
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
    }
}

impl fmt::Display for MutationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.action, self.key)
    }
}

/// One event from either feed. Immutable once appended to a log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RawEvent {
    /// Container runtime event.
    Container(ContainerEvent),
    /// Coordination store mutation.
    Mutation(MutationEvent),
}

impl RawEvent {
    /// The action/verb of the event.
    pub fn action(&self) -> &str {
        match self {
            RawEvent::Container(event) => &event.status,
            RawEvent::Mutation(event) => &event.action,
        }
    }

    /// Which feed produced this event.
    pub fn kind(&self) -> SourceKind {
        match self {
            RawEvent::Container(_) => SourceKind::Container,
            RawEvent::Mutation(_) => SourceKind::Mutation,
        }
    }

    /// Opaque id that needs identity resolution, if any.
    ///
    /// Only container events carry one; mutation keys are already meaningful.
    pub fn resolution_id(&self) -> Option<&str> {
        match self {
            RawEvent::Container(event) => Some(&event.id),
            RawEvent::Mutation(_) => None,
        }
    }
}

impl From<ContainerEvent> for RawEvent {
    fn from(event: ContainerEvent) -> Self {
        RawEvent::Container(event)
    }
}

impl From<MutationEvent> for RawEvent {
    fn from(event: MutationEvent) -> Self {
        RawEvent::Mutation(event)
    }
}

/// Parent of a key path: `/navy/containers/x/actual` → `/navy/containers/x`.
///
/// The root and single-segment keys map to `/`.
pub fn parent_key(key: &str) -> String {
    let trimmed = key.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(pos) => trimmed[..pos].to_string(),
    }
}
