use crate::types::logs::{LogAction, MedicationLog};

use serde::Deserialize;
use serde_json::Value;

/// A log record as the dispensing device writes it.
#[derive(Debug, Deserialize)]
struct StoredLog {
    #[serde(default)]
    action: String,
    #[serde(default)]
    device_id: String,
    timestamp_millis: Option<f64>,
    /// Older devices wrote milliseconds under this name.
    timestamp: Option<f64>,
    timestamp_seconds: Option<f64>,
    #[serde(default)]
    formatted_time: String,
    #[serde(default)]
    day: i64,
    #[serde(default)]
    hour: i64,
    #[serde(default)]
    minute: i64,
    #[serde(default)]
    month: i64,
    #[serde(default)]
    second: i64,
    #[serde(default)]
    weekday: i64,
    #[serde(default)]
    year: i64,
}

impl StoredLog {
    fn timestamp_millis(&self) -> Option<i64> {
        self.timestamp_millis
            .or(self.timestamp)
            .or(self.timestamp_seconds.map(|seconds| seconds * 1000.0))
            .filter(|millis| millis.is_finite())
            .map(|millis| millis as i64)
    }

    fn into_log(self, id: String) -> Option<MedicationLog> {
        let timestamp_millis = self.timestamp_millis()?;
        let timestamp_seconds = self
            .timestamp_seconds
            .filter(|seconds| seconds.is_finite())
            .map(|seconds| seconds as i64)
            .unwrap_or(timestamp_millis.div_euclid(1000));
        Some(MedicationLog {
            id,
            action: LogAction::from(self.action),
            device_id: self.device_id,
            timestamp_millis,
            timestamp_seconds,
            formatted_time: self.formatted_time,
            day: self.day,
            hour: self.hour,
            minute: self.minute,
            month: self.month,
            second: self.second,
            weekday: self.weekday,
            year: self.year,
        })
    }
}

/// Turns the `medication_logs` collection into records sorted oldest first.
///
/// The collection is normally keyed by store-assigned id; an array is read
/// with its indices as ids. Records without a usable timestamp are skipped.
pub fn parse_logs(snapshot: Option<&Value>) -> Vec<MedicationLog> {
    let entries: Vec<(String, &Value)> = match snapshot {
        Some(Value::Object(map)) => map.iter().map(|(id, value)| (id.clone(), value)).collect(),
        Some(Value::Array(values)) => values
            .iter()
            .enumerate()
            .filter(|(_, value)| !value.is_null())
            .map(|(index, value)| (index.to_string(), value))
            .collect(),
        None | Some(Value::Null) => Vec::new(),
        Some(other) => {
            tracing::warn!(snapshot = %other, "medication logs are not a collection");
            Vec::new()
        }
    };

    let mut logs: Vec<MedicationLog> = entries
        .into_iter()
        .filter_map(|(id, value)| {
            let parsed = StoredLog::deserialize(value)
                .ok()
                .and_then(|stored| stored.into_log(id.clone()));
            if parsed.is_none() {
                tracing::warn!(%id, "skipping malformed medication log");
            }
            parsed
        })
        .collect();
    logs.sort_by_key(|log| log.timestamp_millis);
    logs
}
