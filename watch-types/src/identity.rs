//! Identity information resolved for opaque container ids.

use serde::{Deserialize, Serialize};

/// Placeholder shown in activity logs for ids that never resolved.
pub const UNKNOWN_NAME: &str = "????";

/// Name and environment of a container, fetched once per id.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResolvedIdentity {
    /// Container name without the runtime's leading `/`.
    pub name: String,
    /// Environment entries in `KEY=VALUE` form, in runtime order.
    pub env: Vec<String>,
}

impl ResolvedIdentity {
    /// Build an identity, stripping a leading `/` from the runtime's name.
    pub fn new(name: impl Into<String>, env: Vec<String>) -> Self {
        let name = name.into();
        let name = match name.strip_prefix('/') {
            Some(stripped) => stripped.to_string(),
            None => name,
        };
        Self { name, env }
    }

    /// True if `entry` (a `KEY=VALUE` string) appears verbatim in the environment.
    pub fn has_env(&self, entry: &str) -> bool {
        self.env.iter().any(|e| e == entry)
    }
}
