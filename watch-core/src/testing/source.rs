//! Scripted event feed.

use async_trait::async_trait;
use futures_util::stream;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, Notify};
use watch_types::{RawEvent, SourceKind, WatchError};

use crate::lock;
use crate::source::{EventSource, EventStream};

#[derive(Debug)]
enum Step {
    Event { delay: Duration, event: RawEvent },
    Error(String),
}

#[derive(Debug, Default)]
struct Inner {
    script: VecDeque<Step>,
    subscriptions: usize,
    fail_next_subscribe: Option<String>,
}

/// Event feed that replays a script.
///
/// Each step waits for its delay (relative to the previous delivery) and then
/// yields an event or an error. When the script runs dry the subscription
/// idles like a quiet connection until more steps are pushed.
#[derive(Debug, Clone)]
pub struct ScriptedSource {
    kind: SourceKind,
    inner: Arc<Mutex<Inner>>,
    wakeup: Arc<Notify>,
}

impl ScriptedSource {
    /// Create an empty feed of the given kind.
    pub fn new(kind: SourceKind) -> Self {
        Self {
            kind,
            inner: Arc::new(Mutex::new(Inner::default())),
            wakeup: Arc::new(Notify::new()),
        }
    }

    /// Deliver `event` immediately after the previous step.
    pub fn push(&self, event: impl Into<RawEvent>) -> &Self {
        self.push_after(Duration::ZERO, event)
    }

    /// Deliver `event` `delay` after the previous step.
    pub fn push_after(&self, delay: Duration, event: impl Into<RawEvent>) -> &Self {
        lock(&self.inner).script.push_back(Step::Event {
            delay,
            event: event.into(),
        });
        self.wakeup.notify_one();
        self
    }

    /// Break the current subscription with a transient error.
    pub fn push_error(&self, reason: &str) -> &Self {
        lock(&self.inner)
            .script
            .push_back(Step::Error(reason.to_string()));
        self.wakeup.notify_one();
        self
    }

    /// Cause the next `subscribe()` to fail.
    pub fn fail_next_subscribe(&self, reason: &str) {
        lock(&self.inner).fail_next_subscribe = Some(reason.to_string());
    }

    /// Number of subscriptions opened so far (successful or not).
    pub fn subscriptions(&self) -> usize {
        lock(&self.inner).subscriptions
    }

    /// Steps not yet delivered.
    pub fn remaining(&self) -> usize {
        lock(&self.inner).script.len()
    }
}

#[async_trait]
impl EventSource for ScriptedSource {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    async fn subscribe(&self) -> Result<EventStream, WatchError> {
        let failure = {
            let mut inner = lock(&self.inner);
            inner.subscriptions += 1;
            inner.fail_next_subscribe.take()
        };
        if let Some(reason) = failure {
            return Err(WatchError::StreamTransient {
                source_kind: self.kind,
                reason,
            });
        }

        let kind = self.kind;
        let state = (Arc::clone(&self.inner), Arc::clone(&self.wakeup), false);
        let events = stream::unfold(state, move |(inner, wakeup, broken)| async move {
            if broken {
                return None;
            }
            loop {
                let step = lock(&inner).script.pop_front();
                match step {
                    Some(Step::Event { delay, event }) => {
                        tokio::time::sleep(delay).await;
                        return Some((Ok(event), (inner, wakeup, false)));
                    }
                    Some(Step::Error(reason)) => {
                        let err = WatchError::StreamTransient {
                            source_kind: kind,
                            reason,
                        };
                        return Some((Err(err), (inner, wakeup, true)));
                    }
                    None => wakeup.notified().await,
                }
            }
        });
        Ok(Box::pin(events))
    }
}

/// Live-style feed: every subscription sees only events published after it
/// subscribed, like a container runtime event stream.
#[derive(Debug, Clone)]
pub struct BroadcastSource {
    kind: SourceKind,
    tx: broadcast::Sender<RawEvent>,
}

impl BroadcastSource {
    /// Create a feed of the given kind with no subscribers.
    pub fn new(kind: SourceKind) -> Self {
        let (tx, _) = broadcast::channel(1024);
        Self { kind, tx }
    }

    /// Deliver `event` to every open subscription. Returns how many saw it.
    pub fn publish(&self, event: impl Into<RawEvent>) -> usize {
        self.tx.send(event.into()).unwrap_or(0)
    }

    /// Number of open subscriptions.
    pub fn subscribers(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[async_trait]
impl EventSource for BroadcastSource {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    async fn subscribe(&self) -> Result<EventStream, WatchError> {
        let kind = self.kind;
        let events = stream::unfold(self.tx.subscribe(), move |mut rx| async move {
            match rx.recv().await {
                Ok(event) => Some((Ok(event), rx)),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    let err = WatchError::StreamTransient {
                        source_kind: kind,
                        reason: format!("subscriber lagged by {} events", missed),
                    };
                    Some((Err(err), rx))
                }
                Err(broadcast::error::RecvError::Closed) => None,
            }
        });
        Ok(Box::pin(events))
    }
}
