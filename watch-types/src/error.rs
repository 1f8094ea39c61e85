//! Error types for the convoy watcher.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::SourceKind;

/// Diagnostic context attached to a failed expectation.
///
/// Rendered into the error message so a failure can be diagnosed without
/// re-running the scenario.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureReport {
    /// Feed the expectation was declared against.
    pub kind: SourceKind,
    /// Expected action/verb.
    pub action: String,
    /// Target identity (container name or store key).
    pub target: String,
    /// Window the expectation was evaluated over.
    pub window: Duration,
    /// Rendered structural predicates.
    pub predicates: Vec<String>,
    /// Chronological activity log captured at the time of failure.
    pub activity: Vec<String>,
}

impl fmt::Display for FailureReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, " action: {}", self.action)?;
        writeln!(f, " target: {}", self.target)?;
        writeln!(f, " window: {}ms", self.window.as_millis())?;
        writeln!(f, "predicates:")?;
        if self.predicates.is_empty() {
            writeln!(f, " (none)")?;
        }
        for predicate in &self.predicates {
            writeln!(f, " - {}", predicate)?;
        }
        writeln!(f)?;
        write!(f, "activity seen:")?;
        for line in &self.activity {
            write!(f, "\n{}", line)?;
        }
        Ok(())
    }
}

/// Errors raised by watchers, adapters and expectation verification.
///
/// Only [`WatchError::ExpectationNotMet`] and [`WatchError::UnexpectedOccurrence`]
/// are fatal to a test case; the others are logged and absorbed by the
/// background consumption loops and the cleanup fan-out.
#[derive(Debug, Error)]
pub enum WatchError {
    /// A single subscription or poll failed; the source re-subscribes.
    #[error("{source_kind} stream failed: {reason}")]
    StreamTransient {
        /// Feed that failed.
        source_kind: SourceKind,
        /// Underlying failure.
        reason: String,
    },

    /// Fetching or decoding metadata for an id failed; the id stays unresolved.
    #[error("metadata fetch failed for {id}: {reason}")]
    MetadataFetch {
        /// Opaque id being resolved.
        id: String,
        /// Underlying failure.
        reason: String,
    },

    /// A must-occur expectation's window elapsed without a match.
    #[error("unable to find expected {} activity\n{0}", .0.kind)]
    ExpectationNotMet(Box<FailureReport>),

    /// A must-not-occur expectation matched.
    #[error("unexpected {} activity\n{0}", .0.kind)]
    UnexpectedOccurrence(Box<FailureReport>),

    /// A best-effort delete during teardown failed.
    #[error("cleanup of {resource} failed: {reason}")]
    Cleanup {
        /// Resource being removed.
        resource: String,
        /// Underlying failure.
        reason: String,
    },

    /// Lifecycle operation called in the wrong state.
    #[error("invalid watcher state: {0}")]
    InvalidState(String),
}

impl WatchError {
    /// True for errors that must fail the owning test case.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            WatchError::ExpectationNotMet(_) | WatchError::UnexpectedOccurrence(_)
        )
    }

    /// The failure report, for expectation failures.
    pub fn report(&self) -> Option<&FailureReport> {
        match self {
            WatchError::ExpectationNotMet(report) | WatchError::UnexpectedOccurrence(report) => {
                Some(report)
            }
            _ => None,
        }
    }
}
