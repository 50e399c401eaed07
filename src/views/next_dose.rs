use super::enabled_slots;
use crate::types::schedule::{DAYS_PER_WEEK, WeekSchedule, slot_label};
use crate::types::views::NextDose;

use std::iter;
use time::OffsetDateTime;

/// The earliest enabled dose strictly after `reference`, looking at today and
/// the six days that follow.
pub fn next_dose(week: Option<&WeekSchedule>, reference: OffsetDateTime) -> Option<NextDose> {
    let week = week?;
    let offset = reference.offset();

    iter::successors(Some(reference.date()), |date| date.next_day())
        .take(DAYS_PER_WEEK)
        .flat_map(|date| {
            enabled_slots(week.for_weekday(date.weekday())).map(move |(index, slot)| {
                (slot.time.on(date, offset), date.weekday(), index, slot.time)
            })
        })
        .filter(|(at, ..)| *at > reference)
        .min_by_key(|(at, ..)| *at)
        .map(|(at, weekday, slot_index, time)| NextDose {
            at,
            weekday,
            slot_index,
            slot_name: slot_label(slot_index),
            time,
        })
}
