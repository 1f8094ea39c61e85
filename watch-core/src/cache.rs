//! Lazily-filled identity cache scoped to one watcher.

use dashmap::DashMap;
use std::sync::Arc;
use watch_types::ResolvedIdentity;

use crate::source::MetadataResolver;

/// Caches [`ResolvedIdentity`] per opaque id.
///
/// Resolution is best effort: a failed fetch leaves the id unresolved and is
/// not retried until another event for the same id asks again. Concurrent
/// resolution of one id may fetch twice; the second insert overwrites the
/// first with an equal value.
pub struct IdentityCache {
    resolver: Option<Arc<dyn MetadataResolver>>,
    entries: DashMap<String, ResolvedIdentity>,
}

impl IdentityCache {
    /// Cache backed by `resolver`.
    pub fn new(resolver: Arc<dyn MetadataResolver>) -> Self {
        Self {
            resolver: Some(resolver),
            entries: DashMap::new(),
        }
    }

    /// Cache that never resolves anything (for feeds without opaque ids).
    pub fn disabled() -> Self {
        Self {
            resolver: None,
            entries: DashMap::new(),
        }
    }

    /// Cached identity for `id`, without fetching.
    pub fn get(&self, id: &str) -> Option<ResolvedIdentity> {
        self.entries.get(id).map(|entry| entry.value().clone())
    }

    /// Cached identity for `id`, fetching it on a miss.
    pub async fn resolve(&self, id: &str) -> Option<ResolvedIdentity> {
        if let Some(hit) = self.get(id) {
            return Some(hit);
        }
        let resolver = self.resolver.as_ref()?;

        match resolver.fetch(id).await {
            Ok(identity) => {
                tracing::trace!(id, name = %identity.name, "identity resolved");
                self.entries.insert(id.to_string(), identity.clone());
                Some(identity)
            }
            Err(e) => {
                tracing::debug!(id, error = %e, "identity left unresolved");
                None
            }
        }
    }

    /// Number of resolved ids.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing has been resolved yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for IdentityCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityCache")
            .field("resolving", &self.resolver.is_some())
            .field("entries", &self.entries.len())
            .finish()
    }
}
