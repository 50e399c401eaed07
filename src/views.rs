//! Views derived from the current schedule and log snapshots.
//!
//! Every function is pure and recomputed from scratch on each change. Calendar
//! arithmetic happens in the UTC offset of the `reference` instant, so callers
//! convert "now" into the configured offset first.

mod history;
mod next_dose;
mod stats;

pub use history::month_history;
pub use next_dose::next_dose;
pub use stats::adherence_stats;

use crate::types::schedule::{DaySchedule, DoseSlot};

use time::{Date, Duration, OffsetDateTime, UtcOffset};

fn day_start(date: Date, offset: UtcOffset) -> OffsetDateTime {
    date.midnight().assume_offset(offset)
}

fn day_end(date: Date, offset: UtcOffset) -> OffsetDateTime {
    day_start(date, offset) + Duration::DAY
}

/// Enabled slots of a day with their position, which names the slot.
fn enabled_slots(day: &DaySchedule) -> impl Iterator<Item = (usize, &DoseSlot)> {
    day.iter().enumerate().filter(|(_, slot)| slot.enabled)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::types::logs::{LogAction, MedicationLog};
    use crate::types::schedule::{DaySchedule, DoseSlot, WeekSchedule};

    use time::OffsetDateTime;

    pub(crate) fn slot(time: &str, enabled: bool) -> DoseSlot {
        DoseSlot {
            time: time.parse().expect("parse time"),
            enabled,
        }
    }

    pub(crate) fn every_day(slots: [DoseSlot; 4]) -> WeekSchedule {
        WeekSchedule::from_days([DaySchedule::from_slots(slots.to_vec()); 7])
    }

    pub(crate) fn log(id: &str, action: &str, at: OffsetDateTime) -> MedicationLog {
        let millis = (at.unix_timestamp_nanos() / 1_000_000) as i64;
        MedicationLog {
            id: id.to_string(),
            action: LogAction::from(action.to_string()),
            device_id: "dispenser-1".to_string(),
            timestamp_millis: millis,
            timestamp_seconds: millis / 1000,
            formatted_time: String::new(),
            day: i64::from(at.day()),
            hour: i64::from(at.hour()),
            minute: i64::from(at.minute()),
            month: i64::from(u8::from(at.month())),
            second: i64::from(at.second()),
            weekday: i64::from(at.weekday().number_days_from_sunday()),
            year: i64::from(at.year()),
        }
    }
}
