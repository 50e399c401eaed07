use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

pub const CONFIRMED_ACTION: &str = "medication_confirmed";
pub const MISSED_ACTION: &str = "medication_missed";

/// What the dispensing device reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LogAction {
    Confirmed,
    Missed,
    Other(String),
}

impl LogAction {
    pub fn is_confirmation(&self) -> bool {
        matches!(self, LogAction::Confirmed)
    }

    pub fn as_str(&self) -> &str {
        match self {
            LogAction::Confirmed => CONFIRMED_ACTION,
            LogAction::Missed => MISSED_ACTION,
            LogAction::Other(raw) => raw,
        }
    }

    /// `medication_confirmed` -> `medication confirmed`
    pub fn display_label(&self) -> String {
        self.as_str().replace('_', " ")
    }
}

impl From<String> for LogAction {
    fn from(value: String) -> Self {
        match value.as_str() {
            CONFIRMED_ACTION => LogAction::Confirmed,
            MISSED_ACTION => LogAction::Missed,
            _ => LogAction::Other(value),
        }
    }
}

impl From<LogAction> for String {
    fn from(value: LogAction) -> Self {
        match value {
            LogAction::Other(raw) => raw,
            other => other.as_str().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicationLog {
    pub id: String,
    pub action: LogAction,
    pub device_id: String,
    pub timestamp_millis: i64,
    pub timestamp_seconds: i64,
    pub formatted_time: String,
    pub day: i64,
    pub hour: i64,
    pub minute: i64,
    pub month: i64,
    pub second: i64,
    pub weekday: i64,
    pub year: i64,
}

impl MedicationLog {
    pub fn instant(&self) -> Option<OffsetDateTime> {
        OffsetDateTime::from_unix_timestamp_nanos(i128::from(self.timestamp_millis) * 1_000_000)
            .ok()
    }
}
