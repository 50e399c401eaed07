use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset, Weekday};

use std::fmt;
use std::str::FromStr;

pub const DAYS_PER_WEEK: usize = 7;
pub const SLOTS_PER_DAY: usize = 4;
/// Position of the slot that is disabled when it has to be invented.
pub const OPTIONAL_SLOT: usize = 3;

const SLOT_LABELS: [&str; SLOTS_PER_DAY] = [
    "Morning Dose",
    "Afternoon Dose",
    "Evening/Night Dose",
    "Optional/Emergency Dose",
];

pub const WEEKDAY_NAMES: [&str; DAYS_PER_WEEK] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

pub fn slot_label(index: usize) -> String {
    match SLOT_LABELS.get(index) {
        Some(label) => (*label).to_string(),
        None => format!("Dose {}", index + 1),
    }
}

pub fn weekday_index(weekday: Weekday) -> usize {
    usize::from(weekday.number_days_from_sunday())
}

/// A wall-clock dose time, always `HH:MM` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DoseTime {
    hour: u8,
    minute: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid dose time '{0}'; expected HH:MM")]
pub struct InvalidDoseTime(pub String);

impl DoseTime {
    pub const MIDNIGHT: DoseTime = DoseTime { hour: 0, minute: 0 };

    pub fn new(hour: u8, minute: u8) -> Option<Self> {
        (hour < 24 && minute < 60).then_some(Self { hour, minute })
    }

    pub(crate) const fn at_hour(hour: u8) -> Self {
        Self {
            hour: hour % 24,
            minute: 0,
        }
    }

    pub fn hour(self) -> u8 {
        self.hour
    }

    pub fn minute(self) -> u8 {
        self.minute
    }

    pub fn to_time(self) -> Time {
        Time::from_hms(self.hour, self.minute, 0).unwrap_or(Time::MIDNIGHT)
    }

    /// The absolute instant of this time on `date`, in the given offset.
    pub fn on(self, date: Date, offset: UtcOffset) -> OffsetDateTime {
        PrimitiveDateTime::new(date, self.to_time()).assume_offset(offset)
    }
}

impl FromStr for DoseTime {
    type Err = InvalidDoseTime;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidDoseTime(s.to_string());
        let bytes = s.as_bytes();
        if bytes.len() != 5 || bytes[2] != b':' {
            return Err(invalid());
        }
        let digits = [bytes[0], bytes[1], bytes[3], bytes[4]];
        if !digits.iter().all(u8::is_ascii_digit) {
            return Err(invalid());
        }
        let hour = (digits[0] - b'0') * 10 + (digits[1] - b'0');
        let minute = (digits[2] - b'0') * 10 + (digits[3] - b'0');
        Self::new(hour, minute).ok_or_else(invalid)
    }
}

impl TryFrom<String> for DoseTime {
    type Error = InvalidDoseTime;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DoseTime> for String {
    fn from(value: DoseTime) -> Self {
        value.to_string()
    }
}

impl fmt::Display for DoseTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoseSlot {
    pub time: DoseTime,
    pub enabled: bool,
}

impl DoseSlot {
    pub fn enabled(time: DoseTime) -> Self {
        Self {
            time,
            enabled: true,
        }
    }

    /// Filler used when a stored day has fewer than four slots.
    pub fn placeholder(position: usize) -> Self {
        Self {
            time: DoseTime::MIDNIGHT,
            enabled: position != OPTIONAL_SLOT,
        }
    }
}

/// Four dose slots, kept sorted by time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaySchedule([DoseSlot; SLOTS_PER_DAY]);

impl DaySchedule {
    /// Builds a day from any number of slots: the earliest four survive and
    /// missing positions are filled with placeholders.
    pub fn from_slots(mut slots: Vec<DoseSlot>) -> Self {
        slots.sort_by_key(|slot| slot.time);
        let mut day = [0, 1, 2, 3].map(DoseSlot::placeholder);
        for (position, slot) in slots.into_iter().take(SLOTS_PER_DAY).enumerate() {
            day[position] = slot;
        }
        let mut day = Self(day);
        day.sort();
        day
    }

    pub fn slots(&self) -> &[DoseSlot; SLOTS_PER_DAY] {
        &self.0
    }

    pub fn slot(&self, index: usize) -> Option<&DoseSlot> {
        self.0.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DoseSlot> {
        self.0.iter()
    }

    pub(crate) fn slot_mut(&mut self, index: usize) -> Option<&mut DoseSlot> {
        self.0.get_mut(index)
    }

    pub(crate) fn sort(&mut self) {
        self.0.sort_by_key(|slot| slot.time);
    }
}

/// Seven days indexed from Sunday.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekSchedule([DaySchedule; DAYS_PER_WEEK]);

impl WeekSchedule {
    pub fn from_days(days: [DaySchedule; DAYS_PER_WEEK]) -> Self {
        Self(days)
    }

    pub fn days(&self) -> &[DaySchedule; DAYS_PER_WEEK] {
        &self.0
    }

    pub fn day(&self, index: usize) -> Option<&DaySchedule> {
        self.0.get(index)
    }

    pub fn for_weekday(&self, weekday: Weekday) -> &DaySchedule {
        &self.0[weekday_index(weekday)]
    }

    pub(crate) fn day_mut(&mut self, index: usize) -> Option<&mut DaySchedule> {
        self.0.get_mut(index)
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;

    #[test]
    fn dose_time__should_parse_valid_times() {
        // When
        let time: DoseTime = "07:05".parse().expect("parse time");

        // Then
        assert_eq!(time.hour(), 7);
        assert_eq!(time.minute(), 5);
        assert_eq!(time.to_string(), "07:05");
    }

    #[test]
    fn dose_time__should_reject_out_of_range_and_malformed_values() {
        // Then
        for raw in ["24:00", "12:60", "7:05", "07:5", "07-05", "ab:cd", "", "007:05"] {
            assert!(raw.parse::<DoseTime>().is_err(), "{raw} should be rejected");
        }
    }

    #[test]
    fn dose_time__should_order_chronologically() {
        // Given
        let early: DoseTime = "09:59".parse().expect("parse");
        let late: DoseTime = "10:00".parse().expect("parse");

        // Then
        assert!(early < late);
    }

    #[test]
    fn day_schedule_from_slots__should_pad_with_placeholders() {
        // Given
        let slots = vec![DoseSlot::enabled("21:00".parse().expect("parse"))];

        // When
        let day = DaySchedule::from_slots(slots);

        // Then
        let enabled: Vec<bool> = day.iter().map(|slot| slot.enabled).collect();
        let times: Vec<String> = day.iter().map(|slot| slot.time.to_string()).collect();
        assert_eq!(times, vec!["00:00", "00:00", "00:00", "21:00"]);
        assert_eq!(enabled, vec![true, true, false, true]);
    }

    #[test]
    fn slot_label__should_fall_back_to_numbered_dose() {
        // Then
        assert_eq!(slot_label(0), "Morning Dose");
        assert_eq!(slot_label(3), "Optional/Emergency Dose");
        assert_eq!(slot_label(5), "Dose 6");
    }
}
