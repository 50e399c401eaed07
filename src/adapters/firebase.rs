//! Firebase Realtime Database over its REST streaming API.
//!
//! A subscription is one long-lived `text/event-stream` response. The server
//! opens with a `put` of the whole value and then sends `put`/`patch` deltas,
//! which are folded into a local copy so that every change is handed on as a
//! full snapshot.

use crate::ports::store::{DocumentStore, FeedEvent, FeedSubscription, StoreQuery};

use reqwest::header::ACCEPT;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::pin::Pin;
use tokio::sync::mpsc;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("realtime database request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("malformed '{event}' event: {source}")]
    Event {
        event: String,
        source: serde_json::Error,
    },
    #[error("the database cancelled the subscription")]
    Cancelled,
    #[error("the database credential was revoked")]
    AuthRevoked,
    #[error("the event stream ended")]
    StreamClosed,
}

#[derive(Debug, Clone)]
pub struct FirebaseStore {
    client: reqwest::Client,
    database_url: String,
    secret: Option<String>,
}

impl FirebaseStore {
    pub fn new(database_url: impl Into<String>, secret: Option<String>) -> Self {
        let database_url: String = database_url.into();
        Self {
            client: reqwest::Client::new(),
            database_url: database_url.trim_end_matches('/').to_string(),
            secret,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}.json", self.database_url, path.trim_matches('/'))
    }

    fn params(&self) -> Vec<(&'static str, String)> {
        self.secret
            .iter()
            .map(|secret| ("auth", secret.clone()))
            .collect()
    }

    /// The streaming request for `query`. Ordering is left to the consumer:
    /// the server refuses `orderBy` on paths without an index rule, and a
    /// streamed object carries no order anyway.
    fn stream_request(&self, query: &StoreQuery) -> reqwest::RequestBuilder {
        if let Some(field) = query.order_field() {
            tracing::debug!(path = query.location(), field, "ordering children client-side");
        }
        self.client
            .get(self.url(query.location()))
            .query(&self.params())
            .header(ACCEPT, "text/event-stream")
    }

    async fn stream(
        &self,
        query: &StoreQuery,
        events: &mpsc::UnboundedSender<FeedEvent>,
    ) -> Result<(), StoreError> {
        let mut response = self
            .stream_request(query)
            .send()
            .await?
            .error_for_status()?;
        tracing::debug!(path = query.location(), "store subscription opened");

        let mut parser = EventStreamParser::default();
        let mut tree = Value::Null;
        while let Some(chunk) = response.chunk().await? {
            for event in parser.push(&chunk) {
                if !apply_event(&mut tree, &event)? {
                    continue;
                }
                if events.send(FeedEvent::Snapshot(snapshot(&tree))).is_err() {
                    return Ok(());
                }
            }
        }
        Err(StoreError::StreamClosed)
    }
}

impl DocumentStore for FirebaseStore {
    type Error = StoreError;
    type Fut<'a>
        = Pin<Box<dyn Future<Output = Result<(), Self::Error>> + Send + 'a>>
    where
        Self: 'a;

    fn subscribe(&self, query: StoreQuery) -> FeedSubscription {
        let (events, receiver) = mpsc::unbounded_channel();
        let store = self.clone();
        let task = tokio::spawn(async move {
            if let Err(err) = store.stream(&query, &events).await {
                tracing::warn!(path = query.location(), %err, "store subscription failed");
                let _ = events.send(FeedEvent::Failed(err.to_string()));
            }
        });
        FeedSubscription::new(receiver, task)
    }

    fn write<'a>(&'a self, path: &'a str, value: &'a Value) -> Self::Fut<'a> {
        Box::pin(async move {
            self.client
                .put(self.url(path))
                .query(&self.params())
                .json(value)
                .send()
                .await?
                .error_for_status()?;
            Ok(())
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ServerEvent {
    name: String,
    data: String,
}

/// Splits a byte stream into server-sent events. Chunks may end anywhere,
/// including inside a UTF-8 sequence.
#[derive(Debug, Default)]
struct EventStreamParser {
    buffer: Vec<u8>,
    name: String,
    data: Vec<String>,
}

impl EventStreamParser {
    fn push(&mut self, chunk: &[u8]) -> Vec<ServerEvent> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();
        while let Some(end) = self.buffer.iter().position(|byte| *byte == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=end).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim_end_matches(['\n', '\r']);
            if let Some(event) = self.line(line) {
                events.push(event);
            }
        }
        events
    }

    fn line(&mut self, line: &str) -> Option<ServerEvent> {
        if line.is_empty() {
            if self.name.is_empty() && self.data.is_empty() {
                return None;
            }
            return Some(ServerEvent {
                name: std::mem::take(&mut self.name),
                data: std::mem::take(&mut self.data).join("\n"),
            });
        }
        if line.starts_with(':') {
            return None;
        }
        let (field, value) = line.split_once(':').unwrap_or((line, ""));
        let value = value.strip_prefix(' ').unwrap_or(value);
        match field {
            "event" => self.name = value.to_string(),
            "data" => self.data.push(value.to_string()),
            _ => {}
        }
        None
    }
}

#[derive(Debug, Deserialize)]
struct StreamPayload {
    path: String,
    data: Value,
}

/// Folds one event into `tree`. Returns whether the value may have changed.
fn apply_event(tree: &mut Value, event: &ServerEvent) -> Result<bool, StoreError> {
    let payload = || {
        serde_json::from_str::<StreamPayload>(&event.data).map_err(|source| StoreError::Event {
            event: event.name.clone(),
            source,
        })
    };
    match event.name.as_str() {
        "put" => {
            let payload = payload()?;
            apply_put(tree, &payload.path, payload.data);
            Ok(true)
        }
        "patch" => {
            let payload = payload()?;
            apply_patch(tree, &payload.path, payload.data);
            Ok(true)
        }
        "keep-alive" => Ok(false),
        "cancel" => Err(StoreError::Cancelled),
        "auth_revoked" => Err(StoreError::AuthRevoked),
        other => {
            tracing::debug!(event = other, "ignoring unknown stream event");
            Ok(false)
        }
    }
}

fn apply_put(tree: &mut Value, path: &str, data: Value) {
    let segments: Vec<&str> = path.split('/').filter(|segment| !segment.is_empty()).collect();
    put_at(tree, &segments, data);
}

fn apply_patch(tree: &mut Value, path: &str, data: Value) {
    let Value::Object(children) = data else {
        apply_put(tree, path, data);
        return;
    };
    let base = path.trim_end_matches('/');
    for (key, value) in children {
        apply_put(tree, &format!("{base}/{key}"), value);
    }
}

fn put_at(node: &mut Value, segments: &[&str], data: Value) {
    let Some((key, rest)) = segments.split_first() else {
        *node = data;
        return;
    };
    let mut children = into_object(node.take());
    let mut child = children.remove(*key).unwrap_or(Value::Null);
    put_at(&mut child, rest, data);
    if !is_vacant(&child) {
        children.insert((*key).to_string(), child);
    }
    *node = Value::Object(children);
}

/// Arrays are how the database renders dense integer keys; a delta below one
/// turns it back into the keyed object it really is.
fn into_object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(children) => children,
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .filter(|(_, item)| !item.is_null())
            .map(|(index, item)| (index.to_string(), item))
            .collect(),
        _ => Map::new(),
    }
}

fn is_vacant(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(children) => children.is_empty(),
        _ => false,
    }
}

fn snapshot(tree: &Value) -> Option<Value> {
    (!is_vacant(tree)).then(|| tree.clone())
}
