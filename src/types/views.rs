use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime, Weekday};

use crate::types::logs::MedicationLog;
use crate::types::schedule::{DoseTime, WEEKDAY_NAMES, weekday_index};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextDose {
    #[serde(with = "time::serde::rfc3339")]
    pub at: OffsetDateTime,
    pub weekday: Weekday,
    pub slot_index: usize,
    pub slot_name: String,
    pub time: DoseTime,
}

impl NextDose {
    pub fn weekday_label(&self) -> &'static str {
        WEEKDAY_NAMES[weekday_index(self.weekday)]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdherenceStats {
    pub scheduled_today_past: u32,
    pub taken_today: u32,
    pub scheduled_this_week_past: u32,
    pub taken_this_week: u32,
    /// `None` when nothing was due yet this week.
    pub adherence_this_week: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DoseState {
    Taken,
    Missed,
    Pending,
}

impl DoseState {
    pub fn label(self) -> &'static str {
        match self {
            DoseState::Taken => "taken",
            DoseState::Missed => "missed",
            DoseState::Pending => "pending",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoseStatus {
    pub slot_name: String,
    pub scheduled_time: DoseTime,
    pub status: DoseState,
    pub log: Option<MedicationLog>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayHistory {
    pub date: Date,
    pub doses: Vec<DoseStatus>,
}
