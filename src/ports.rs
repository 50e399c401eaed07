pub mod push;
pub mod store;
pub mod time;

pub use push::PushSender;
pub use store::{DocumentStore, FeedEvent, FeedSubscription, StoreQuery};
pub use time::TimeProvider;
