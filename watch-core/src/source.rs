//! Seams to the outside world: event feeds, metadata lookups, resource removal.
//!
//! # Design
//!
//! - `EventSource::subscribe()` opens a fresh, lazy, unbounded event sequence.
//!   A sequence is not restartable; after it fails or ends the watcher simply
//!   subscribes again.
//! - `MetadataResolver::fetch()` looks up the identity behind an opaque id.
//! - `Reaper::reap()` removes one resource during suite teardown.

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use std::fmt;
use watch_types::{RawEvent, ResolvedIdentity, SourceKind, WatchError};

/// A subscription: events in arrival order, or a transient error.
pub type EventStream = BoxStream<'static, Result<RawEvent, WatchError>>;

/// One external event feed.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Which feed this source wraps.
    fn kind(&self) -> SourceKind;

    /// Open a new subscription.
    ///
    /// Errors here and errors yielded by the stream are treated the same way:
    /// logged, then the watcher re-subscribes.
    async fn subscribe(&self) -> Result<EventStream, WatchError>;
}

/// Lookup of the identity behind an opaque id.
#[async_trait]
pub trait MetadataResolver: Send + Sync {
    /// Fetch the identity for `id`.
    async fn fetch(&self, id: &str) -> Result<ResolvedIdentity, WatchError>;
}

/// A resource to remove during suite teardown.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CleanupTarget {
    /// A container created while the suite ran (by id).
    Container(String),
    /// A coordination-store directory, deleted recursively.
    KeyPrefix(String),
}

impl fmt::Display for CleanupTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CleanupTarget::Container(id) => write!(f, "container {}", id),
            CleanupTarget::KeyPrefix(prefix) => write!(f, "keys under {}", prefix),
        }
    }
}

/// Removes resources left behind by a test run.
#[async_trait]
pub trait Reaper: Send + Sync {
    /// Remove one resource. Failures are reported but never retried.
    async fn reap(&self, target: &CleanupTarget) -> Result<(), WatchError>;
}
