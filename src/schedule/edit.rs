use crate::types::schedule::{
    DAYS_PER_WEEK, DaySchedule, DoseSlot, DoseTime, SLOTS_PER_DAY, WeekSchedule,
};

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

const DEFAULT_TIMES: [DoseTime; SLOTS_PER_DAY] = [
    DoseTime::at_hour(8),
    DoseTime::at_hour(12),
    DoseTime::at_hour(13),
    DoseTime::at_hour(20),
];

/// A single change made in the schedule editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScheduleEdit {
    SetTime {
        day: usize,
        slot: usize,
        time: DoseTime,
    },
    SetEnabled {
        day: usize,
        slot: usize,
        enabled: bool,
    },
    ToggleWeekly {
        slot: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EditError {
    #[error("day index {0} is out of range")]
    Day(usize),
    #[error("slot index {0} is out of range")]
    Slot(usize),
}

impl WeekSchedule {
    /// The schedule written when the store holds nothing usable.
    pub fn default_schedule() -> Self {
        let day = DaySchedule::from_slots(DEFAULT_TIMES.map(DoseSlot::enabled).to_vec());
        WeekSchedule::from_days([day; DAYS_PER_WEEK])
    }

    pub fn apply(&mut self, edit: &ScheduleEdit) -> Result<(), EditError> {
        match *edit {
            ScheduleEdit::SetTime { day, slot, time } => self.set_time(day, slot, time),
            ScheduleEdit::SetEnabled { day, slot, enabled } => {
                self.set_enabled(day, slot, enabled)
            }
            ScheduleEdit::ToggleWeekly { slot } => self.toggle_slot_weekly(slot).map(|_| ()),
        }
    }

    pub fn set_time(&mut self, day: usize, slot: usize, time: DoseTime) -> Result<(), EditError> {
        let schedule = self.day_mut(day).ok_or(EditError::Day(day))?;
        schedule.slot_mut(slot).ok_or(EditError::Slot(slot))?.time = time;
        schedule.sort();
        Ok(())
    }

    pub fn set_enabled(&mut self, day: usize, slot: usize, enabled: bool) -> Result<(), EditError> {
        let schedule = self.day_mut(day).ok_or(EditError::Day(day))?;
        schedule.slot_mut(slot).ok_or(EditError::Slot(slot))?.enabled = enabled;
        Ok(())
    }

    /// Flips one slot position on every day at once. If any day has it
    /// enabled the whole column is switched off, otherwise on. Returns the
    /// value that was applied.
    pub fn toggle_slot_weekly(&mut self, slot: usize) -> Result<bool, EditError> {
        if slot >= SLOTS_PER_DAY {
            return Err(EditError::Slot(slot));
        }
        let any_enabled = self
            .days()
            .iter()
            .any(|day| day.slot(slot).is_some_and(|dose| dose.enabled));
        let enabled = !any_enabled;
        for day in 0..DAYS_PER_WEEK {
            self.set_enabled(day, slot, enabled)?;
        }
        Ok(enabled)
    }

    /// The representation written to the store: always a native array.
    pub fn to_value(&self) -> Value {
        Value::Array(
            self.days()
                .iter()
                .map(|day| {
                    Value::Array(
                        day.iter()
                            .map(|slot| json!({ "time": slot.time.to_string(), "enabled": slot.enabled }))
                            .collect(),
                    )
                })
                .collect(),
        )
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;
    use crate::schedule::normalize;

    fn time(raw: &str) -> DoseTime {
        raw.parse().expect("parse time")
    }

    #[test]
    fn default_schedule__should_enable_every_slot() {
        // When
        let week = WeekSchedule::default_schedule();

        // Then
        for day in week.days() {
            let times: Vec<String> = day.iter().map(|slot| slot.time.to_string()).collect();
            assert_eq!(times, vec!["08:00", "12:00", "13:00", "20:00"]);
            assert!(day.iter().all(|slot| slot.enabled));
        }
    }

    #[test]
    fn set_time__should_keep_the_day_sorted() {
        // Given
        let mut week = WeekSchedule::default_schedule();

        // When
        week.set_time(2, 0, time("14:30")).expect("set time");

        // Then
        let times: Vec<String> = week
            .day(2)
            .expect("day")
            .iter()
            .map(|slot| slot.time.to_string())
            .collect();
        assert_eq!(times, vec!["12:00", "13:00", "14:30", "20:00"]);
        assert_eq!(week.day(3), WeekSchedule::default_schedule().day(3));
    }

    #[test]
    fn set_enabled__should_reject_out_of_range_indices() {
        // Given
        let mut week = WeekSchedule::default_schedule();

        // Then
        assert_eq!(week.set_enabled(7, 0, false), Err(EditError::Day(7)));
        assert_eq!(week.set_enabled(0, 4, false), Err(EditError::Slot(4)));
        assert_eq!(week.toggle_slot_weekly(4), Err(EditError::Slot(4)));
    }

    #[test]
    fn toggle_slot_weekly__should_disable_when_any_day_is_enabled() {
        // Given
        let mut week = WeekSchedule::default_schedule();
        for day in 0..7 {
            week.set_enabled(day, 3, false).expect("disable");
        }
        week.set_enabled(4, 3, true).expect("enable one");

        // When
        let applied = week.toggle_slot_weekly(3).expect("toggle");

        // Then
        assert!(!applied);
        assert!(week.days().iter().all(|day| !day.slots()[3].enabled));
    }

    #[test]
    fn toggle_slot_weekly__should_enable_when_every_day_is_disabled() {
        // Given
        let mut week = WeekSchedule::default_schedule();
        for day in 0..7 {
            week.set_enabled(day, 1, false).expect("disable");
        }

        // When
        week.apply(&ScheduleEdit::ToggleWeekly { slot: 1 })
            .expect("toggle");

        // Then
        assert!(week.days().iter().all(|day| day.slots()[1].enabled));
    }

    #[test]
    fn to_value__should_round_trip_through_normalize() {
        // Given
        let mut week = WeekSchedule::default_schedule();
        week.set_time(0, 1, time("06:15")).expect("set time");
        week.set_enabled(5, 3, false).expect("disable");

        // When
        let stored = week.to_value();
        let restored = normalize(Some(&stored)).expect("normalize");

        // Then
        assert_eq!(restored, week);
        assert_eq!(stored[5][3], json!({ "time": "20:00", "enabled": false }));
    }

    #[test]
    fn schedule_edit__should_deserialize_tagged_json() {
        // Given
        let raw = json!({ "kind": "set_time", "day": 1, "slot": 2, "time": "09:45" });

        // When
        let edit: ScheduleEdit = serde_json::from_value(raw).expect("deserialize");

        // Then
        assert_eq!(
            edit,
            ScheduleEdit::SetTime {
                day: 1,
                slot: 2,
                time: time("09:45"),
            }
        );
    }
}
