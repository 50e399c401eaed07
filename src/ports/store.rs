use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// A live query against one path of the document store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreQuery {
    location: String,
    order_by: Option<String>,
}

impl StoreQuery {
    pub fn path(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            order_by: None,
        }
    }

    /// Names the numeric field children are ordered by. Stores may leave the
    /// ordering to the consumer, which sorts on its side.
    pub fn ordered_by(mut self, field: impl Into<String>) -> Self {
        self.order_by = Some(field.into());
        self
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn order_field(&self) -> Option<&str> {
        self.order_by.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    /// The full current value at the path; `None` when nothing is stored.
    Snapshot(Option<Value>),
    /// The subscription ended with an error and will not deliver again.
    Failed(String),
}

/// Receiving end of a subscription. Dropping it stops the feed.
pub struct FeedSubscription {
    events: mpsc::UnboundedReceiver<FeedEvent>,
    task: JoinHandle<()>,
}

impl FeedSubscription {
    pub fn new(events: mpsc::UnboundedReceiver<FeedEvent>, task: JoinHandle<()>) -> Self {
        Self { events, task }
    }

    /// The next event, or `None` once the feed has ended.
    pub async fn next(&mut self) -> Option<FeedEvent> {
        self.events.recv().await
    }
}

impl Drop for FeedSubscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

pub trait DocumentStore: Clone + Send + Sync + 'static {
    type Error: std::fmt::Display + Send + Sync + 'static;
    type Fut<'a>: Future<Output = Result<(), Self::Error>> + Send + 'a
    where
        Self: 'a;

    /// Starts a live subscription. Must be called from within a tokio runtime.
    fn subscribe(&self, query: StoreQuery) -> FeedSubscription;

    /// Replaces the whole value at `path`.
    fn write<'a>(&'a self, path: &'a str, value: &'a Value) -> Self::Fut<'a>;
}
