use std::path::PathBuf;
use time::UtcOffset;

/// Where the schedule and the logs live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    Firebase {
        database_url: String,
        secret: Option<String>,
    },
    /// Process-local store, empty at startup.
    Memory,
    /// No store was configured; pages that need data answer 503.
    Unconfigured,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub app_name: String,
    pub store: StoreConfig,
    /// Offset calendar days and dose times are interpreted in.
    pub utc_offset: UtcOffset,
    /// TOML file listing the browsers that receive dose reminders.
    pub subscriptions: Option<PathBuf>,
    pub vapid_private_key: Option<String>,
    pub vapid_public_key: Option<String>,
    pub vapid_subject: Option<String>,
}

#[cfg(test)]
impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_name: "Pillminder".to_string(),
            store: StoreConfig::Memory,
            utc_offset: UtcOffset::UTC,
            subscriptions: None,
            vapid_private_key: None,
            vapid_public_key: None,
            vapid_subject: None,
        }
    }
}
