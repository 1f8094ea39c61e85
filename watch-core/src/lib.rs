//! # watch-core
//!
//! The event-watching and expectation-verification engine behind the navy
//! convoy tests.
//!
//! A [`Watcher`] consumes one or more unbounded event feeds in background
//! tasks and appends everything it sees to an [`EventLog`] anchored at the
//! moment the watcher started. Test bodies declare [`Expectation`]s ("this
//! must / must not happen within W") against the watcher; they are verified in
//! declaration order when the watcher stops.
//!
//! ```text
//!  EventSource ──subscribe──► consumer task ──append──► EventLog ◄──poll── Expectation::verify
//!                                   │                      ▲
//!                                   └── IdentityCache ─────┘ (name/env lookups)
//! ```
//!
//! The engine never talks to the network itself. Feeds, metadata lookups and
//! resource removal come in through the [`EventSource`], [`MetadataResolver`]
//! and [`Reaper`] traits; `watch-client` provides the live implementations and
//! [`testing`] provides scripted ones.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cache;
pub mod cleanup;
pub mod config;
pub mod expectation;
pub mod lifecycle;
pub mod log;
pub mod predicate;
pub mod source;
pub mod testing;
pub mod watcher;

pub use cache::IdentityCache;
pub use cleanup::{reap_all, CleanupReport};
pub use config::WatchConfig;
pub use expectation::{await_match, Expectation, Polarity};
pub use lifecycle::{Feeds, SuiteContext, TestCase};
pub use log::{Candidate, EventLog, LogEntry};
pub use predicate::StructuralPredicate;
pub use source::{CleanupTarget, EventSource, EventStream, MetadataResolver, Reaper};
pub use watcher::{Watcher, WatcherState};

use std::sync::{Mutex, MutexGuard};

/// Lock a mutex, recovering the data if a panicking thread poisoned it.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
