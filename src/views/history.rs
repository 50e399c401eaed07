use super::{day_end, enabled_slots};
use crate::types::logs::MedicationLog;
use crate::types::schedule::{DaySchedule, DoseSlot, WeekSchedule, slot_label};
use crate::types::views::{DayHistory, DoseState, DoseStatus};

use std::iter;
use time::{Date, Month, OffsetDateTime};

/// One entry per calendar day of `year`-`month` with the status of every
/// enabled dose.
///
/// A dose owns the window from its time up to the next enabled dose, or to
/// midnight for the last one. The earliest log inside the window decides: a
/// confirmation means taken, anything else missed. An empty window that has
/// already closed is missed too.
pub fn month_history(
    week: Option<&WeekSchedule>,
    logs: &[MedicationLog],
    year: i32,
    month: Month,
    reference: OffsetDateTime,
) -> Vec<DayHistory> {
    let Some(week) = week else {
        return Vec::new();
    };
    let Ok(first) = Date::from_calendar_date(year, month, 1) else {
        tracing::debug!(year, %month, "month outside the supported calendar range");
        return Vec::new();
    };

    iter::successors(Some(first), |date| date.next_day())
        .take_while(|date| date.month() == month)
        .map(|date| DayHistory {
            date,
            doses: day_doses(week.for_weekday(date.weekday()), logs, date, reference),
        })
        .collect()
}

fn day_doses(
    day: &DaySchedule,
    logs: &[MedicationLog],
    date: Date,
    reference: OffsetDateTime,
) -> Vec<DoseStatus> {
    let offset = reference.offset();
    let enabled: Vec<(usize, &DoseSlot)> = enabled_slots(day).collect();

    enabled
        .iter()
        .enumerate()
        .map(|(position, (index, slot))| {
            let start = slot.time.on(date, offset);
            let end = match enabled.get(position + 1) {
                Some((_, next)) => next.time.on(date, offset),
                None => day_end(date, offset),
            };
            let earliest = logs
                .iter()
                .filter_map(|log| log.instant().map(|at| (at, log)))
                .filter(|(at, _)| *at >= start && *at < end)
                .min_by_key(|(at, _)| *at)
                .map(|(_, log)| log);

            let status = match earliest {
                Some(log) if log.action.is_confirmation() => DoseState::Taken,
                Some(_) => DoseState::Missed,
                None if end <= reference => DoseState::Missed,
                None => DoseState::Pending,
            };
            DoseStatus {
                slot_name: slot_label(*index),
                scheduled_time: slot.time,
                status,
                log: earliest.cloned(),
            }
        })
        .collect()
}
