use crate::types::logs::MedicationLog;
use crate::types::views::DoseState;

use askama::Template;
use askama_web::WebTemplate;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

#[derive(Template, WebTemplate)]
#[template(path = "error.html")]
pub(crate) struct ErrorTemplate {
    pub(crate) app_name: String,
    pub(crate) message: String,
}

#[derive(Template, WebTemplate)]
#[template(path = "dashboard.html")]
pub(crate) struct DashboardTemplate {
    pub(crate) app_name: String,
    pub(crate) notice: String,
    pub(crate) next_dose: Option<NextDoseCard>,
    pub(crate) stats: StatsCard,
    pub(crate) recent_logs: Vec<LogRow>,
    /// Why the log-based cards are unavailable; empty when they are shown.
    pub(crate) logs_error: String,
}

pub(crate) struct NextDoseCard {
    pub(crate) slot_name: String,
    pub(crate) weekday: String,
    pub(crate) time: String,
    pub(crate) when: String,
}

pub(crate) struct StatsCard {
    pub(crate) scheduled_today_past: u32,
    pub(crate) taken_today: u32,
    pub(crate) scheduled_this_week_past: u32,
    pub(crate) taken_this_week: u32,
    /// `"n/a"` when nothing was due.
    pub(crate) adherence: String,
}

pub(crate) struct LogRow {
    pub(crate) when: String,
    pub(crate) action: String,
    pub(crate) device_id: String,
    pub(crate) confirmed: bool,
}

impl LogRow {
    pub(crate) fn new(log: &MedicationLog, offset: UtcOffset) -> Self {
        let when = match log.instant() {
            Some(at) => format_instant(at.to_offset(offset)),
            None => log.formatted_time.clone(),
        };
        Self {
            when,
            action: log.action.display_label(),
            device_id: log.device_id.clone(),
            confirmed: log.action.is_confirmation(),
        }
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "schedule.html")]
pub(crate) struct ScheduleTemplate {
    pub(crate) app_name: String,
    pub(crate) notice: String,
    pub(crate) unsaved: bool,
    pub(crate) columns: Vec<SlotColumn>,
    pub(crate) days: Vec<DayRow>,
}

pub(crate) struct SlotColumn {
    pub(crate) index: usize,
    pub(crate) label: String,
    pub(crate) any_enabled: bool,
}

pub(crate) struct DayRow {
    pub(crate) index: usize,
    pub(crate) name: String,
    pub(crate) slots: Vec<SlotCell>,
}

pub(crate) struct SlotCell {
    pub(crate) index: usize,
    pub(crate) time: String,
    pub(crate) enabled: bool,
}

#[derive(Template, WebTemplate)]
#[template(path = "history.html")]
pub(crate) struct HistoryTemplate {
    pub(crate) app_name: String,
    pub(crate) month_label: String,
    pub(crate) previous_month: String,
    pub(crate) next_month: String,
    pub(crate) weekdays: Vec<String>,
    /// Sunday-first rows; `None` pads days outside the month.
    pub(crate) weeks: Vec<Vec<Option<CalendarDay>>>,
}

pub(crate) struct CalendarDay {
    pub(crate) day: u8,
    pub(crate) doses: Vec<CalendarDose>,
}

pub(crate) struct CalendarDose {
    pub(crate) slot_name: String,
    pub(crate) time: String,
    pub(crate) status: &'static str,
}

impl CalendarDose {
    pub(crate) fn new(slot_name: String, time: String, status: DoseState) -> Self {
        Self {
            slot_name,
            time,
            status: status.label(),
        }
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "logs.html")]
pub(crate) struct LogsTemplate {
    pub(crate) app_name: String,
    pub(crate) logs: Vec<LogRow>,
}

#[derive(Template, WebTemplate)]
#[template(path = "push_subscribe.html")]
pub(crate) struct PushSubscribeTemplate {
    pub(crate) app_name: String,
}

pub(crate) fn format_instant(at: OffsetDateTime) -> String {
    at.format(format_description!("[year]-[month]-[day] [hour]:[minute]"))
        .unwrap_or_else(|_| at.to_string())
}
