//! Web-push reminders when a scheduled dose comes due.

use crate::adapters::{TokioTimeProvider, WebPushSender};
use crate::config::AppConfig;
use crate::dashboard::DashboardHandle;
use crate::types::push::SubscriptionRegistry;

mod registry;
mod scheduler;
mod vapid;

use std::sync::Arc;

pub use registry::RegistryError;
pub use scheduler::{PlannedReminder, ReminderHandle};
pub use vapid::{VapidCredentials, generate_vapid_credentials};

pub(crate) use scheduler::ReminderScheduler;
pub(crate) use vapid::VapidConfigStatus;

/// Starts the reminder task when VAPID credentials are configured.
pub fn maybe_start(
    config: &AppConfig,
    dashboard: &DashboardHandle,
    subscriptions: Arc<SubscriptionRegistry>,
) -> Option<ReminderHandle> {
    let vapid = match VapidConfigStatus::from_config(config) {
        VapidConfigStatus::Ready(vapid) => vapid,
        VapidConfigStatus::Incomplete => {
            tracing::warn!("dose reminders disabled: incomplete VAPID configuration");
            return None;
        }
        VapidConfigStatus::Missing => {
            tracing::debug!("dose reminders disabled: no VAPID configuration");
            return None;
        }
    };

    let sender = match WebPushSender::new(vapid) {
        Ok(sender) => sender,
        Err(err) => {
            tracing::warn!(%err, "dose reminders disabled: failed to init web-push");
            return None;
        }
    };

    tracing::info!(
        subscribers = subscriptions.subscriptions.len(),
        "dose reminders enabled"
    );
    let scheduler =
        ReminderScheduler::new(TokioTimeProvider, sender, config.utc_offset, subscriptions);
    Some(scheduler.spawn(dashboard.watch()))
}

/// The configured subscriptions, or none when the file is absent or invalid.
pub fn load_subscriptions(config: &AppConfig) -> SubscriptionRegistry {
    let Some(path) = &config.subscriptions else {
        return SubscriptionRegistry::default();
    };
    match SubscriptionRegistry::load(path) {
        Ok(registry) => registry,
        Err(err) => {
            tracing::warn!(path = %path.display(), %err, "failed to load push subscriptions");
            SubscriptionRegistry::default()
        }
    }
}
