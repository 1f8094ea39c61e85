//! Declarative, time-bounded assertions over an [`EventLog`].
//!
//! An expectation names a feed, an action and a target identity, optionally
//! narrowed by structural predicates. It is evaluated by polling the log:
//!
//! - `MustOccur` succeeds as soon as a matching event is seen and fails with
//!   [`WatchError::ExpectationNotMet`] once the window has fully elapsed.
//! - `MustNotOccur` fails with [`WatchError::UnexpectedOccurrence`] as soon as
//!   a matching event is seen and succeeds only after the full window.
//!
//! Polling only bounds latency. Whether an event counts is decided by its
//! arrival instant: events appended at or before `startedAt + window` count,
//! later ones don't, including those that land in the same poll tick as the
//! window edge.
//!
//! # Example
//!
//! ```ignore
//! use watch_types::seconds;
//!
//! let expectation = Expectation::mutation("set", "/navy/containers/c_app_1/actual")
//!     .within(seconds(3))
//!     .json_including([("state", "running")]);
//! watcher.expect(expectation)?;
//! ```

use serde_json::{Map, Value};
use std::fmt;
use std::time::Duration;
use watch_types::{FailureReport, SourceKind, WatchError};

use crate::config::WatchConfig;
use crate::log::{Candidate, EventLog};
use crate::predicate::{all_match, StructuralPredicate};

/// Whether the expected event must or must not happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    /// A matching event must arrive within the window.
    MustOccur,
    /// No matching event may arrive within the window.
    MustNotOccur,
}

/// A declared expectation.
#[derive(Debug, Clone, PartialEq)]
pub struct Expectation {
    kind: SourceKind,
    action: String,
    target: String,
    polarity: Polarity,
    predicates: Vec<StructuralPredicate>,
    window: Option<Duration>,
    resolved: bool,
}

impl Expectation {
    /// Expect `action` on the feed `kind` for `target`.
    pub fn new(kind: SourceKind, action: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            kind,
            action: action.into(),
            target: target.into(),
            polarity: Polarity::MustOccur,
            predicates: Vec::new(),
            window: None,
            resolved: false,
        }
    }

    /// Expect a container lifecycle event for the container named `name`.
    pub fn container(action: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(SourceKind::Container, action, name)
    }

    /// Expect a mutation of exactly `key`.
    pub fn mutation(action: impl Into<String>, key: impl Into<String>) -> Self {
        Self::new(SourceKind::Mutation, action, key)
    }

    /// Evaluate over `window` instead of the configured default.
    pub fn within(mut self, window: Duration) -> Self {
        self.window = Some(window);
        self
    }

    /// Invert: the event must not happen within the window.
    pub fn never(mut self) -> Self {
        self.polarity = Polarity::MustNotOccur;
        self
    }

    /// Require the mutation's JSON value to include these top-level fields.
    pub fn json_including<I, K, V>(self, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let map: Map<String, Value> = fields
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        self.with_predicate(StructuralPredicate::JsonIncluding(map))
    }

    /// Require the container environment to contain `entry` (`KEY=VALUE`).
    ///
    /// Repeated calls accumulate into one predicate.
    pub fn env_including(mut self, entry: impl Into<String>) -> Self {
        let entry = entry.into();
        for predicate in &mut self.predicates {
            if let StructuralPredicate::EnvIncluding(entries) = predicate {
                entries.push(entry);
                return self;
            }
        }
        self.with_predicate(StructuralPredicate::EnvIncluding(vec![entry]))
    }

    /// Add an arbitrary structural predicate.
    pub fn with_predicate(mut self, predicate: StructuralPredicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// Feed this expectation is about.
    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    /// Expected action.
    pub fn action(&self) -> &str {
        &self.action
    }

    /// Target identity.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Polarity.
    pub fn polarity(&self) -> Polarity {
        self.polarity
    }

    /// Declared predicates.
    pub fn predicates(&self) -> &[StructuralPredicate] {
        &self.predicates
    }

    /// Declared window, or the configured default.
    pub fn window(&self, config: &WatchConfig) -> Duration {
        self.window.unwrap_or_else(|| config.default_window())
    }

    /// True once verification has run to success.
    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    pub(crate) fn mark_resolved(&mut self) {
        self.resolved = true;
    }

    /// Verify against `log`, blocking the caller until the outcome is known.
    pub async fn verify(&self, log: &EventLog, config: &WatchConfig) -> Result<(), WatchError> {
        let window = self.window(config);
        let Some(cutoff) = log.window_end(window) else {
            return Err(WatchError::InvalidState(
                "cannot verify against a log that was never started".into(),
            ));
        };

        while log.within_window(window) {
            if self.first_match(log, cutoff).await.is_some() {
                return self.on_match(log, window).await;
            }
            tokio::time::sleep(config.poll_interval()).await;
        }

        // The window has closed; settle events that arrived in the last tick.
        match self.first_match(log, cutoff).await {
            Some(_) => self.on_match(log, window).await,
            None => self.on_absent(log, window).await,
        }
    }

    async fn first_match(&self, log: &EventLog, cutoff: tokio::time::Instant) -> Option<Candidate> {
        log.find_matching(self.kind, &self.action, &self.target)
            .await
            .into_iter()
            .find(|candidate| {
                candidate.received_at <= cutoff && all_match(&self.predicates, candidate)
            })
    }

    async fn on_match(&self, log: &EventLog, window: Duration) -> Result<(), WatchError> {
        match self.polarity {
            Polarity::MustOccur => Ok(()),
            Polarity::MustNotOccur => Err(WatchError::UnexpectedOccurrence(Box::new(
                self.report(log, window).await,
            ))),
        }
    }

    async fn on_absent(&self, log: &EventLog, window: Duration) -> Result<(), WatchError> {
        match self.polarity {
            Polarity::MustOccur => Err(WatchError::ExpectationNotMet(Box::new(
                self.report(log, window).await,
            ))),
            Polarity::MustNotOccur => Ok(()),
        }
    }

    async fn report(&self, log: &EventLog, window: Duration) -> FailureReport {
        FailureReport {
            kind: self.kind,
            action: self.action.clone(),
            target: self.target.clone(),
            window,
            predicates: self.predicates.iter().map(ToString::to_string).collect(),
            activity: log.activity().await,
        }
    }
}

impl fmt::Display for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self.polarity {
            Polarity::MustOccur => "expect",
            Polarity::MustNotOccur => "never",
        };
        write!(f, "{} {} {}: {}", verb, self.kind, self.action, self.target)
    }
}

/// Block until `log` holds an event of `kind` with `action` for `target`.
///
/// Unbounded and predicate-free; meant for setup synchronization only.
pub async fn await_match(
    log: &EventLog,
    kind: SourceKind,
    action: &str,
    target: &str,
    poll_interval: Duration,
) -> Candidate {
    loop {
        if let Some(found) = log
            .find_matching(kind, action, target)
            .await
            .into_iter()
            .next()
        {
            return found;
        }
        tokio::time::sleep(poll_interval).await;
    }
}
