use crate::adapters::{FirebaseStore, MemoryStore};
use crate::config::{AppConfig, StoreConfig};
use crate::dashboard::DashboardHandle;
use crate::reminders::{self, ReminderHandle};
use crate::types::push::SubscriptionRegistry;

use std::sync::Arc;
use time::OffsetDateTime;

/// Whether the realtime database is available to this process.
#[derive(Debug, Clone)]
pub enum StoreStatus {
    Ready(DashboardHandle),
    Unconfigured,
}

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub store: StoreStatus,
    pub subscriptions: Arc<SubscriptionRegistry>,
    pub reminders: Option<Arc<ReminderHandle>>,
    /// Source of "now"; replaced in tests.
    pub clock: fn() -> OffsetDateTime,
}

impl AppState {
    /// Connects to the configured store and starts the background tasks.
    /// Must be called from within a tokio runtime.
    pub fn start(config: AppConfig) -> Self {
        let store = match &config.store {
            StoreConfig::Firebase {
                database_url,
                secret,
            } => StoreStatus::Ready(DashboardHandle::spawn(FirebaseStore::new(
                database_url.as_str(),
                secret.clone(),
            ))),
            StoreConfig::Memory => StoreStatus::Ready(DashboardHandle::spawn(MemoryStore::new())),
            StoreConfig::Unconfigured => {
                tracing::warn!("no database configured; dashboard data is unavailable");
                StoreStatus::Unconfigured
            }
        };
        let subscriptions = Arc::new(reminders::load_subscriptions(&config));
        let reminders = match &store {
            StoreStatus::Ready(dashboard) => {
                reminders::maybe_start(&config, dashboard, Arc::clone(&subscriptions))
                    .map(Arc::new)
            }
            StoreStatus::Unconfigured => None,
        };
        Self {
            config,
            store,
            subscriptions,
            reminders,
            clock: OffsetDateTime::now_utc,
        }
    }

    /// Current time in the configured offset.
    pub fn now(&self) -> OffsetDateTime {
        (self.clock)().to_offset(self.config.utc_offset)
    }
}
