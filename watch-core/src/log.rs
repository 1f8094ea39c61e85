//! Append-only, time-anchored event buffer.
//!
//! The log is written only by its watcher's consumer tasks and read
//! concurrently by verification, `await` polls and cleanup. Appends take the
//! write lock; every read copies what it needs under the read lock, so a scan
//! never observes a half-written entry.

use std::collections::BTreeSet;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use watch_types::{parent_key, RawEvent, ResolvedIdentity, SourceKind, UNKNOWN_NAME};

use crate::cache::IdentityCache;
use crate::source::CleanupTarget;

/// An appended event with its arrival instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// The event as delivered.
    pub event: RawEvent,
    /// When the consumer task appended it.
    pub received_at: Instant,
}

/// A log entry joined with its resolved identity, as seen by predicates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// The event as delivered.
    pub event: RawEvent,
    /// Identity for container events whose id resolved.
    pub identity: Option<ResolvedIdentity>,
    /// When the event was appended.
    pub received_at: Instant,
}

/// Event buffer for one watcher.
#[derive(Debug)]
pub struct EventLog {
    started_at: OnceLock<Instant>,
    entries: RwLock<Vec<LogEntry>>,
    identities: Arc<IdentityCache>,
}

impl EventLog {
    /// Create an unanchored log whose container ids resolve through `identities`.
    pub fn new(identities: Arc<IdentityCache>) -> Self {
        Self {
            started_at: OnceLock::new(),
            entries: RwLock::new(Vec::new()),
            identities,
        }
    }

    /// Fix `startedAt` to now. Later calls return the original instant.
    pub fn anchor(&self) -> Instant {
        *self.started_at.get_or_init(Instant::now)
    }

    /// The anchor, once set.
    pub fn started_at(&self) -> Option<Instant> {
        self.started_at.get().copied()
    }

    /// Last instant of a window of `window` starting at the anchor.
    pub fn window_end(&self, window: Duration) -> Option<Instant> {
        self.started_at().map(|start| start + window)
    }

    /// True iff now lies in `[startedAt, startedAt + window]`.
    pub fn within_window(&self, window: Duration) -> bool {
        self.within_window_at(Instant::now(), window)
    }

    /// True iff `at` lies in `[startedAt, startedAt + window]` (edges inclusive).
    pub fn within_window_at(&self, at: Instant, window: Duration) -> bool {
        match self.started_at() {
            Some(start) => at >= start && at <= start + window,
            None => false,
        }
    }

    /// Identity cache used for container ids.
    pub fn identities(&self) -> &Arc<IdentityCache> {
        &self.identities
    }

    /// Append an event, stamping its arrival time.
    pub async fn append(&self, event: RawEvent) -> Instant {
        let received_at = Instant::now();
        self.entries.write().await.push(LogEntry { event, received_at });
        received_at
    }

    /// Drop every buffered event. The anchor and consumption are unaffected.
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    /// Copy of the buffer in arrival order.
    pub async fn snapshot(&self) -> Vec<LogEntry> {
        self.entries.read().await.clone()
    }

    /// Number of buffered events.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// True if nothing is buffered.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Name an event is matched by: the resolved container name, or the key.
    pub fn identity_name(&self, event: &RawEvent) -> Option<String> {
        match event {
            RawEvent::Container(container) => {
                self.identities.get(&container.id).map(|identity| identity.name)
            }
            RawEvent::Mutation(mutation) => Some(mutation.key.clone()),
        }
    }

    /// Buffered events of `kind` with the given action whose identity is `target`.
    ///
    /// Container events whose id has not resolved never match.
    pub async fn find_matching(
        &self,
        kind: SourceKind,
        action: &str,
        target: &str,
    ) -> Vec<Candidate> {
        let entries = self.entries.read().await;
        entries
            .iter()
            .filter(|entry| entry.event.kind() == kind && entry.event.action() == action)
            .filter_map(|entry| {
                let identity = match &entry.event {
                    RawEvent::Container(container) => {
                        let identity = self.identities.get(&container.id)?;
                        if identity.name != target {
                            return None;
                        }
                        Some(identity)
                    }
                    RawEvent::Mutation(mutation) => {
                        if mutation.key != target {
                            return None;
                        }
                        None
                    }
                };
                Some(Candidate {
                    event: entry.event.clone(),
                    identity,
                    received_at: entry.received_at,
                })
            })
            .collect()
    }

    /// One line per event: `"<action>: <name or ????>"`.
    pub async fn activity(&self) -> Vec<String> {
        let entries = self.entries.read().await;
        entries
            .iter()
            .map(|entry| {
                let name = self
                    .identity_name(&entry.event)
                    .unwrap_or_else(|| UNKNOWN_NAME.to_string());
                format!("{}: {}", entry.event.action(), name)
            })
            .collect()
    }

    /// Distinct resources created while this log was recording.
    ///
    /// Containers come from `create` events; store prefixes are the parent of
    /// every observed key, never the root.
    pub async fn cleanup_targets(&self) -> Vec<CleanupTarget> {
        let entries = self.entries.read().await;
        let targets: BTreeSet<CleanupTarget> = entries
            .iter()
            .filter_map(|entry| match &entry.event {
                RawEvent::Container(container) if container.status == "create" => {
                    Some(CleanupTarget::Container(container.id.clone()))
                }
                RawEvent::Container(_) => None,
                RawEvent::Mutation(mutation) => {
                    let prefix = parent_key(&mutation.key);
                    (prefix != "/").then_some(CleanupTarget::KeyPrefix(prefix))
                }
            })
            .collect();
        targets.into_iter().collect()
    }
}
