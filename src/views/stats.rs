use super::{day_end, day_start, enabled_slots};
use crate::types::logs::MedicationLog;
use crate::types::schedule::{DAYS_PER_WEEK, WeekSchedule};
use crate::types::views::AdherenceStats;

use std::iter;
use time::{Date, OffsetDateTime};

/// Today's and the trailing week's due and taken doses.
///
/// The week is today plus the six days before it. Every log counts as taken on
/// the calendar day it falls on, whatever its action.
pub fn adherence_stats(
    week: Option<&WeekSchedule>,
    logs: &[MedicationLog],
    reference: OffsetDateTime,
) -> Option<AdherenceStats> {
    let week = week?;
    let logged: Vec<OffsetDateTime> = logs.iter().filter_map(MedicationLog::instant).collect();

    let mut stats = AdherenceStats {
        scheduled_today_past: 0,
        taken_today: 0,
        scheduled_this_week_past: 0,
        taken_this_week: 0,
        adherence_this_week: None,
    };
    let days = iter::successors(Some(reference.date()), |date| date.previous_day());
    for (back, date) in days.take(DAYS_PER_WEEK).enumerate() {
        let scheduled = past_doses(week, date, reference);
        let taken = taken_on(&logged, date, reference);
        if back == 0 {
            stats.scheduled_today_past = scheduled;
            stats.taken_today = taken;
        }
        stats.scheduled_this_week_past += scheduled;
        stats.taken_this_week += taken;
    }
    stats.adherence_this_week = percentage(stats.taken_this_week, stats.scheduled_this_week_past);
    Some(stats)
}

fn past_doses(week: &WeekSchedule, date: Date, reference: OffsetDateTime) -> u32 {
    let count = enabled_slots(week.for_weekday(date.weekday()))
        .filter(|(_, slot)| slot.time.on(date, reference.offset()) < reference)
        .count();
    u32::try_from(count).unwrap_or(u32::MAX)
}

fn taken_on(logged: &[OffsetDateTime], date: Date, reference: OffsetDateTime) -> u32 {
    let start = day_start(date, reference.offset());
    let end = day_end(date, reference.offset());
    let count = logged
        .iter()
        .filter(|at| **at >= start && **at < end)
        .count();
    u32::try_from(count).unwrap_or(u32::MAX)
}

/// `taken / scheduled` as a whole percentage, halves rounded up.
fn percentage(taken: u32, scheduled: u32) -> Option<u32> {
    if scheduled == 0 {
        return None;
    }
    let taken = u64::from(taken);
    let scheduled = u64::from(scheduled);
    let rounded = (taken * 200 + scheduled) / (2 * scheduled);
    Some(u32::try_from(rounded).unwrap_or(u32::MAX))
}
