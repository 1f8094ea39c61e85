//! Identity lookups from a fixed table.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use watch_types::{ResolvedIdentity, WatchError};

use crate::lock;
use crate::source::MetadataResolver;

#[derive(Debug, Default)]
struct Inner {
    identities: HashMap<String, ResolvedIdentity>,
    fetches: HashMap<String, usize>,
}

/// Resolver backed by an in-memory table. Unknown ids fail to resolve.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    inner: Arc<Mutex<Inner>>,
}

impl StaticResolver {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the identity for `id`.
    pub fn insert(&self, id: impl Into<String>, identity: ResolvedIdentity) {
        lock(&self.inner).identities.insert(id.into(), identity);
    }

    /// Forget `id`, so later fetches fail.
    pub fn remove(&self, id: &str) {
        lock(&self.inner).identities.remove(id);
    }

    /// How many times `id` has been fetched.
    pub fn fetch_count(&self, id: &str) -> usize {
        lock(&self.inner).fetches.get(id).copied().unwrap_or(0)
    }
}

#[async_trait]
impl MetadataResolver for StaticResolver {
    async fn fetch(&self, id: &str) -> Result<ResolvedIdentity, WatchError> {
        let mut inner = lock(&self.inner);
        *inner.fetches.entry(id.to_string()).or_default() += 1;
        inner
            .identities
            .get(id)
            .cloned()
            .ok_or_else(|| WatchError::MetadataFetch {
                id: id.to_string(),
                reason: "no such container".into(),
            })
    }
}
