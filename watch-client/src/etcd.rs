//! Coordination store adapter: the etcd v2 keys API over `reqwest`.
//!
//! Watching works by long-polling: read the current `X-Etcd-Index` once,
//! then repeatedly `GET /v2/keys/?wait=true&recursive=true&waitIndex=N+1`,
//! advancing `N` to each response's `modifiedIndex`.
//!
//! A failed poll is retried from the same `N`, so nothing committed during an
//! outage is skipped. Only when etcd has compacted `N` out of its history
//! (error 401) is the index read again.

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use reqwest::{Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use watch_core::{EventSource, EventStream};
use watch_types::{MutationEvent, RawEvent, SourceKind, WatchError};

use crate::config::EtcdConfig;
use crate::error::ClientError;

const INDEX_HEADER: &str = "X-Etcd-Index";

/// Response document for key operations.
#[derive(Debug, Deserialize)]
struct KeyResponse {
    action: String,
    node: Node,
}

#[derive(Debug, Deserialize)]
struct Node {
    key: String,
    #[serde(default)]
    value: Option<String>,
    #[serde(rename = "modifiedIndex")]
    modified_index: u64,
}

/// Decode a key operation response into a mutation event.
pub fn parse_mutation(body: &[u8]) -> Result<MutationEvent, ClientError> {
    let response: KeyResponse = serde_json::from_slice(body)?;
    Ok(MutationEvent::new(
        response.action,
        response.node.key,
        response.node.value,
        response.node.modified_index,
    ))
}

/// Client for the v2 keys API.
#[derive(Debug, Clone)]
pub struct EtcdClient {
    http: reqwest::Client,
    endpoint: String,
    request_timeout: Duration,
}

impl EtcdClient {
    /// Build a client for the configured endpoint.
    ///
    /// No client-wide timeout is set, so watches can block indefinitely;
    /// other calls use the configured request timeout.
    pub fn new(config: &EtcdConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self {
            http,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            request_timeout: config.request_timeout(),
        })
    }

    /// Base URL this client talks to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn keys_url(&self, key: &str) -> String {
        if key.starts_with('/') {
            format!("{}/v2/keys{}", self.endpoint, key)
        } else {
            format!("{}/v2/keys/{}", self.endpoint, key)
        }
    }

    /// Current store index, from the `X-Etcd-Index` header of a root read.
    pub async fn current_index(&self) -> Result<u64, ClientError> {
        let response = self
            .http
            .get(self.keys_url("/"))
            .timeout(self.request_timeout)
            .send()
            .await?;
        let response = check(response).await?;
        parse_index(response.headers().get(INDEX_HEADER).map(|v| v.as_bytes()))
    }

    /// Block until the first mutation under `prefix` at or after `wait_index`.
    pub async fn watch(&self, prefix: &str, wait_index: u64) -> Result<MutationEvent, ClientError> {
        let response = self
            .http
            .get(self.keys_url(prefix))
            .query(&[
                ("wait", "true".to_string()),
                ("recursive", "true".to_string()),
                ("waitIndex", wait_index.to_string()),
            ])
            .send()
            .await?;
        let body = check(response).await?.bytes().await?;
        parse_mutation(&body)
    }

    /// Delete `key` and everything below it. A missing key is not an error.
    pub async fn delete_recursive(&self, key: &str) -> Result<(), ClientError> {
        let response = self
            .http
            .delete(self.keys_url(key))
            .query(&[("recursive", "true")])
            .timeout(self.request_timeout)
            .send()
            .await?;
        match check(response).await {
            Ok(_) => {
                tracing::debug!(key, "key deleted");
                Ok(())
            }
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Push `document` as JSON onto the in-order queue at `queue`.
    ///
    /// Returns the created queue entry.
    pub async fn queue_json<T: Serialize>(
        &self,
        queue: &str,
        document: &T,
    ) -> Result<MutationEvent, ClientError> {
        let value = serde_json::to_string(document)?;
        let response = self
            .http
            .post(self.keys_url(queue))
            .form(&[("value", value)])
            .timeout(self.request_timeout)
            .send()
            .await?;
        let body = check(response).await?.bytes().await?;
        let entry = parse_mutation(&body)?;
        tracing::debug!(queue, key = %entry.key, "queued");
        Ok(entry)
    }
}

async fn check(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ClientError::Etcd {
        status: status.as_u16(),
        body,
    })
}

fn parse_index(header: Option<&[u8]>) -> Result<u64, ClientError> {
    header
        .and_then(|raw| std::str::from_utf8(raw).ok())
        .and_then(|raw| raw.trim().parse().ok())
        .ok_or_else(|| ClientError::Etcd {
            status: StatusCode::OK.as_u16(),
            body: format!("missing or invalid {} header", INDEX_HEADER),
        })
}

const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Key mutation feed over a recursive long-poll watch.
#[derive(Debug, Clone)]
pub struct EtcdEventSource {
    client: EtcdClient,
    prefix: String,
    retry_delay: Duration,
}

impl EtcdEventSource {
    /// Watch the whole namespace.
    pub fn new(client: EtcdClient) -> Self {
        Self::with_prefix(client, "/")
    }

    /// Watch everything under `prefix`.
    pub fn with_prefix(client: EtcdClient, prefix: impl Into<String>) -> Self {
        Self {
            client,
            prefix: prefix.into(),
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    /// Pause between a failed poll and the next attempt (default: 1s).
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }
}

/// Resume state of one subscription.
struct Cursor {
    client: EtcdClient,
    prefix: String,
    retry_delay: Duration,
    /// `None` once etcd has cleared the index we were waiting on.
    last_index: Option<u64>,
}

impl Cursor {
    /// Poll until a mutation arrives, retrying failures from the same index.
    async fn next_event(&mut self) -> MutationEvent {
        loop {
            match self.poll().await {
                Ok(event) => return event,
                Err(e) if e.is_index_cleared() => {
                    tracing::warn!(
                        prefix = %self.prefix,
                        index = ?self.last_index,
                        "etcd index cleared, re-reading current index"
                    );
                    self.last_index = None;
                }
                Err(e) => {
                    tracing::warn!(
                        prefix = %self.prefix,
                        index = ?self.last_index,
                        error = %e,
                        "etcd poll failed, retrying"
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
            }
        }
    }

    async fn poll(&mut self) -> Result<MutationEvent, ClientError> {
        let last_index = match self.last_index {
            Some(index) => index,
            None => {
                let index = self.client.current_index().await?;
                self.last_index = Some(index);
                index
            }
        };
        let event = self.client.watch(&self.prefix, last_index + 1).await?;
        self.last_index = Some(last_index.max(event.modified_index));
        Ok(event)
    }
}

#[async_trait]
impl EventSource for EtcdEventSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Mutation
    }

    /// A subscription starts from the index current at subscribe time and
    /// never ends on its own: failed polls are retried from the last seen
    /// index.
    async fn subscribe(&self) -> Result<EventStream, WatchError> {
        let last_index = self
            .client
            .current_index()
            .await
            .map_err(|e| e.into_transient(SourceKind::Mutation))?;
        tracing::debug!(prefix = %self.prefix, index = last_index, "watching etcd");

        let cursor = Cursor {
            client: self.client.clone(),
            prefix: self.prefix.clone(),
            retry_delay: self.retry_delay,
            last_index: Some(last_index),
        };
        let events = stream::unfold(cursor, |mut cursor| async move {
            let event = cursor.next_event().await;
            Some((Ok(RawEvent::from(event)), cursor))
        });
        Ok(events.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn reply(status: &str, index: u64, body: &str) -> String {
        format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nX-Etcd-Index: {}\r\n\
             Content-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            index,
            body.len(),
            body
        )
    }

    fn mutation(key: &str, index: u64) -> String {
        reply(
            "200 OK",
            index,
            &format!(
                r#"{{"action":"set","node":{{"key":"{}","value":"{{}}","modifiedIndex":{}}}}}"#,
                key, index
            ),
        )
    }

    /// Serve `replies` in order, one per connection, recording each request line.
    async fn fake_etcd(replies: Vec<String>) -> (EtcdClient, Arc<Mutex<Vec<String>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));

        let seen = Arc::clone(&requests);
        tokio::spawn(async move {
            for response in replies {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut head = Vec::new();
                let mut buf = [0u8; 1024];
                while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                    let n = socket.read(&mut buf).await.unwrap();
                    if n == 0 {
                        break;
                    }
                    head.extend_from_slice(&buf[..n]);
                }
                let head = String::from_utf8_lossy(&head);
                let line = head.lines().next().unwrap_or_default().to_string();
                seen.lock().unwrap().push(line);
                socket.write_all(response.as_bytes()).await.unwrap();
                let _ = socket.shutdown().await;
            }
        });

        let client = EtcdClient::new(&EtcdConfig {
            endpoint,
            request_timeout_secs: 5,
        })
        .unwrap();
        (client, requests)
    }

    fn wait_indexes(requests: &Mutex<Vec<String>>) -> Vec<String> {
        requests
            .lock()
            .unwrap()
            .iter()
            .map(|line| match line.split("waitIndex=").nth(1) {
                Some(rest) => rest.split(|c: char| !c.is_ascii_digit()).next().unwrap().to_string(),
                None => "index".to_string(),
            })
            .collect()
    }

    #[test]
    fn parse_set_response() {
        let body = br#"{
            "action": "set",
            "node": {
                "key": "/navy/containers/c1_oneapp_1/actual",
                "value": "{\"state\":\"running\"}",
                "modifiedIndex": 42,
                "createdIndex": 40
            },
            "prevNode": {"key": "/navy/containers/c1_oneapp_1/actual", "value": "{}", "modifiedIndex": 40}
        }"#;
        let event = parse_mutation(body).unwrap();
        assert_eq!(event.action, "set");
        assert_eq!(event.key, "/navy/containers/c1_oneapp_1/actual");
        assert_eq!(event.modified_index, 42);
        assert_eq!(event.json().unwrap()["state"], "running");
    }

    #[test]
    fn parse_delete_response_has_no_value() {
        let body = br#"{"action":"delete","node":{"key":"/navy/x","modifiedIndex":7}}"#;
        let event = parse_mutation(body).unwrap();
        assert_eq!(event.action, "delete");
        assert!(event.value.is_none());
    }

    #[test]
    fn parse_garbage_is_decode_error() {
        let err = parse_mutation(b"<html>bad gateway</html>").unwrap_err();
        assert!(matches!(err, ClientError::Decode(_)));
    }

    #[test]
    fn index_header_parsing() {
        assert_eq!(parse_index(Some(b"1234")).unwrap(), 1234);
        assert!(parse_index(Some(b"abc")).is_err());
        assert!(parse_index(None).is_err());
    }

    #[test]
    fn keys_url_joins_paths() {
        let client = EtcdClient::new(&EtcdConfig {
            endpoint: "http://127.0.0.1:4001/".into(),
            request_timeout_secs: 1,
        })
        .unwrap();
        assert_eq!(client.endpoint(), "http://127.0.0.1:4001");
        assert_eq!(client.keys_url("/"), "http://127.0.0.1:4001/v2/keys/");
        assert_eq!(
            client.keys_url("/navy/queues/convoys"),
            "http://127.0.0.1:4001/v2/keys/navy/queues/convoys"
        );
        assert_eq!(client.keys_url("navy"), "http://127.0.0.1:4001/v2/keys/navy");
    }

    #[tokio::test]
    async fn watch_advances_to_each_modified_index() {
        let (client, requests) = fake_etcd(vec![
            reply("200 OK", 10, "{}"),
            mutation("/navy/a", 11),
            mutation("/navy/b", 14),
        ])
        .await;
        let source = EtcdEventSource::new(client);
        let mut events = source.subscribe().await.unwrap();

        for expected in [11, 14] {
            match events.next().await.unwrap().unwrap() {
                RawEvent::Mutation(event) => assert_eq!(event.modified_index, expected),
                other => panic!("unexpected event {:?}", other),
            }
        }
        assert_eq!(wait_indexes(&requests), vec!["index", "11", "12"]);
    }

    #[tokio::test]
    async fn failed_poll_resumes_from_last_seen_index() {
        let (client, requests) = fake_etcd(vec![
            reply("200 OK", 10, "{}"),
            mutation("/navy/a", 12),
            reply("500 Internal Server Error", 15, "proxy error"),
            mutation("/navy/b", 13),
            reply(
                "400 Bad Request",
                2048,
                r#"{"errorCode":401,"message":"outdated and cleared"}"#,
            ),
            reply("200 OK", 2048, "{}"),
            mutation("/navy/c", 2049),
        ])
        .await;
        let source = EtcdEventSource::new(client).with_retry_delay(Duration::from_millis(10));
        let mut events = source.subscribe().await.unwrap();

        let mut seen = Vec::new();
        for _ in 0..3 {
            match events.next().await.unwrap().unwrap() {
                RawEvent::Mutation(event) => seen.push(event.modified_index),
                other => panic!("unexpected event {:?}", other),
            }
        }
        assert_eq!(seen, vec![12, 13, 2049]);
        assert_eq!(
            wait_indexes(&requests),
            vec!["index", "11", "13", "13", "14", "index", "2049"]
        );
    }

    #[tokio::test]
    async fn unreachable_store_fails_subscription_transiently() {
        let client = EtcdClient::new(&EtcdConfig {
            endpoint: "http://127.0.0.1:1".into(),
            request_timeout_secs: 1,
        })
        .unwrap();
        let err = EtcdEventSource::new(client).subscribe().await.err().unwrap();
        assert!(matches!(
            err,
            WatchError::StreamTransient {
                source_kind: SourceKind::Mutation,
                ..
            }
        ));
    }
}
