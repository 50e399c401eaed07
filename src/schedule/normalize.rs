use crate::types::schedule::{DAYS_PER_WEEK, DaySchedule, DoseSlot, DoseTime, WeekSchedule};

use serde_json::{Map, Value};

/// Number of cells in the oldest schedule format, one boolean per hour.
const HOUR_GRID_LEN: usize = 24;

/// Top-level shapes the store has used for the week.
#[derive(Debug)]
enum StoredWeek<'a> {
    /// A native array of days.
    Days(&'a [Value]),
    /// A sparse array that the store flattened into `{"0": .., "3": ..}`.
    SparseDays(&'a Map<String, Value>),
}

/// Shapes a single day has been stored in.
#[derive(Debug)]
enum StoredDay<'a> {
    Slots(Vec<&'a Value>),
    HourGrid(&'a [Value]),
    Missing,
}

/// Shapes a single dose entry has been stored in.
#[derive(Debug)]
enum StoredSlot<'a> {
    Legacy(&'a str),
    Flagged { time: &'a str, enabled: bool },
}

/// Reads any known schedule shape into the canonical seven-by-four week.
///
/// Returns `None` only when the top-level value is neither array-like nor a
/// day-keyed map. Individual entries that cannot be understood are dropped.
pub fn normalize(raw: Option<&Value>) -> Option<WeekSchedule> {
    let stored = StoredWeek::classify(raw?)?;
    let days = stored
        .into_days()
        .map(|day| DaySchedule::from_slots(StoredDay::classify(day).upgrade()));
    Some(WeekSchedule::from_days(days))
}

impl<'a> StoredWeek<'a> {
    fn classify(raw: &'a Value) -> Option<Self> {
        match raw {
            Value::Array(days) => Some(StoredWeek::Days(days)),
            Value::Object(map) if map.keys().all(|key| day_key(key).is_some()) => {
                Some(StoredWeek::SparseDays(map))
            }
            _ => None,
        }
    }

    fn into_days(self) -> [Option<&'a Value>; DAYS_PER_WEEK] {
        let mut days = [None; DAYS_PER_WEEK];
        match self {
            StoredWeek::Days(values) => {
                if values.len() > DAYS_PER_WEEK {
                    tracing::debug!(len = values.len(), "ignoring schedule days past the seventh");
                }
                for (index, value) in values.iter().take(DAYS_PER_WEEK).enumerate() {
                    days[index] = Some(value);
                }
            }
            StoredWeek::SparseDays(map) => {
                for (key, value) in map {
                    if let Some(index) = day_key(key) {
                        days[index] = Some(value);
                    }
                }
            }
        }
        days
    }
}

fn day_key(key: &str) -> Option<usize> {
    match key.as_bytes() {
        [digit @ b'0'..=b'6'] => Some(usize::from(digit - b'0')),
        _ => None,
    }
}

impl<'a> StoredDay<'a> {
    fn classify(raw: Option<&'a Value>) -> Self {
        match raw {
            Some(Value::Array(entries))
                if entries.len() == HOUR_GRID_LEN && entries.iter().all(Value::is_boolean) =>
            {
                StoredDay::HourGrid(entries)
            }
            Some(Value::Array(entries)) => StoredDay::Slots(entries.iter().collect()),
            Some(Value::Object(map)) => {
                let mut indexed: Vec<(usize, &Value)> = map
                    .iter()
                    .filter_map(|(key, value)| key.parse::<usize>().ok().map(|idx| (idx, value)))
                    .collect();
                indexed.sort_by_key(|(idx, _)| *idx);
                StoredDay::Slots(indexed.into_iter().map(|(_, value)| value).collect())
            }
            None | Some(Value::Null) => StoredDay::Missing,
            Some(other) => {
                tracing::debug!(day = %other, "dropping schedule day with unknown shape");
                StoredDay::Missing
            }
        }
    }

    fn upgrade(self) -> Vec<DoseSlot> {
        match self {
            StoredDay::Slots(entries) => entries
                .into_iter()
                .filter_map(|entry| match StoredSlot::classify(entry) {
                    Some(slot) => slot.upgrade(),
                    None => {
                        tracing::debug!(%entry, "dropping malformed schedule entry");
                        None
                    }
                })
                .collect(),
            StoredDay::HourGrid(cells) => cells
                .iter()
                .enumerate()
                .filter(|(_, cell)| cell.as_bool() == Some(true))
                .filter_map(|(hour, _)| u8::try_from(hour).ok())
                .filter_map(|hour| DoseTime::new(hour, 0))
                .map(DoseSlot::enabled)
                .collect(),
            StoredDay::Missing => Vec::new(),
        }
    }
}

impl<'a> StoredSlot<'a> {
    fn classify(raw: &'a Value) -> Option<Self> {
        match raw {
            Value::String(time) => Some(StoredSlot::Legacy(time)),
            Value::Object(map) => match (map.get("time"), map.get("enabled")) {
                (Some(Value::String(time)), Some(Value::Bool(enabled))) => {
                    Some(StoredSlot::Flagged {
                        time,
                        enabled: *enabled,
                    })
                }
                _ => None,
            },
            _ => None,
        }
    }

    fn upgrade(self) -> Option<DoseSlot> {
        let (raw_time, enabled) = match self {
            StoredSlot::Legacy(time) => (time, true),
            StoredSlot::Flagged { time, enabled } => (time, enabled),
        };
        match raw_time.parse::<DoseTime>() {
            Ok(time) => Some(DoseSlot { time, enabled }),
            Err(err) => {
                tracing::debug!(%err, "dropping schedule entry");
                None
            }
        }
    }
}
