use crate::ports::store::{DocumentStore, FeedEvent, FeedSubscription, StoreQuery};

use serde_json::Value;
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{mpsc, watch};

/// Process-local document store. Used when no database is configured for
/// demos and by the test suite.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    paths: Arc<Mutex<HashMap<String, Arc<watch::Sender<Option<Value>>>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(self, path: &str, value: Value) -> Self {
        self.set(path, Some(value));
        self
    }

    /// Replaces the value at `path` as if another client had written it.
    pub fn set(&self, path: &str, value: Option<Value>) {
        self.channel(path).send_replace(value);
    }

    pub fn get(&self, path: &str) -> Option<Value> {
        self.channel(path).borrow().clone()
    }

    fn channel(&self, path: &str) -> Arc<watch::Sender<Option<Value>>> {
        let mut paths = self.paths.lock().unwrap_or_else(PoisonError::into_inner);
        let channel = paths
            .entry(path.trim_matches('/').to_string())
            .or_insert_with(|| Arc::new(watch::Sender::new(None)));
        Arc::clone(channel)
    }
}

impl DocumentStore for MemoryStore {
    type Error = Infallible;
    type Fut<'a>
        = std::future::Ready<Result<(), Self::Error>>
    where
        Self: 'a;

    fn subscribe(&self, query: StoreQuery) -> FeedSubscription {
        let mut values = self.channel(query.location()).subscribe();
        let (events, receiver) = mpsc::unbounded_channel();
        let task = tokio::spawn(async move {
            loop {
                let value = values.borrow_and_update().clone();
                if events.send(FeedEvent::Snapshot(value)).is_err() {
                    break;
                }
                if values.changed().await.is_err() {
                    break;
                }
            }
        });
        FeedSubscription::new(receiver, task)
    }

    fn write<'a>(&'a self, path: &'a str, value: &'a Value) -> Self::Fut<'a> {
        self.set(path, Some(value.clone()));
        std::future::ready(Ok(()))
    }
}
