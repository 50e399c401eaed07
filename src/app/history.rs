use crate::state::AppState;
use crate::templates::{self, CalendarDay, CalendarDose};
use crate::types::schedule::{DAYS_PER_WEEK, WEEKDAY_NAMES, weekday_index};
use crate::types::views::DayHistory;
use crate::views::month_history;

use super::{ApiError, Failure, PageError, current_snapshot, require};

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use serde::Deserialize;
use time::{Month, OffsetDateTime};

#[derive(Debug, Default, Deserialize)]
pub(crate) struct HistoryQuery {
    /// `YYYY-MM`; the current month when absent.
    pub(crate) month: Option<String>,
}

const FIRST_YEAR: i32 = 0;
const LAST_YEAR: i32 = 9999;

/// A calendar month, as selected in the history view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct YearMonth {
    pub(crate) year: i32,
    pub(crate) month: Month,
}

impl YearMonth {
    fn containing(at: OffsetDateTime) -> Self {
        Self {
            year: at.year(),
            month: at.month(),
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        let (year, month) = raw.trim().split_once('-')?;
        if year.len() != 4 || month.len() != 2 || !year.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        Some(Self {
            year: year.parse().ok()?,
            month: Month::try_from(month.parse::<u8>().ok()?).ok()?,
        })
    }

    /// Stepping stops at the ends of the four-digit years `parse` accepts.
    fn previous(self) -> Self {
        match (self.year, self.month) {
            (FIRST_YEAR, Month::January) => self,
            (year, Month::January) => Self {
                year: year - 1,
                month: Month::December,
            },
            (year, month) => Self {
                year,
                month: month.previous(),
            },
        }
    }

    fn next(self) -> Self {
        match (self.year, self.month) {
            (LAST_YEAR, Month::December) => self,
            (year, Month::December) => Self {
                year: year + 1,
                month: Month::January,
            },
            (year, month) => Self {
                year,
                month: month.next(),
            },
        }
    }

    fn key(self) -> String {
        format!("{:04}-{:02}", self.year, u8::from(self.month))
    }

    fn label(self) -> String {
        format!("{} {}", self.month, self.year)
    }
}

fn selected_month(query: &HistoryQuery, now: OffsetDateTime) -> Result<YearMonth, Failure> {
    match query.month.as_deref() {
        None | Some("") => Ok(YearMonth::containing(now)),
        Some(raw) => YearMonth::parse(raw).ok_or_else(|| {
            Failure::new(
                StatusCode::BAD_REQUEST,
                format!("invalid month '{raw}'; expected YYYY-MM"),
            )
        }),
    }
}

fn load_history(
    state: &AppState,
    query: &HistoryQuery,
) -> Result<(YearMonth, Vec<DayHistory>), Failure> {
    let now = state.now();
    let selected = selected_month(query, now)?;
    let snapshot = current_snapshot(state)?;
    let week = require(&snapshot.schedule, "schedule")?;
    let logs = require(&snapshot.logs, "medication log")?;
    let days = month_history(Some(week), logs, selected.year, selected.month, now);
    Ok((selected, days))
}

pub(crate) async fn history_page(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<templates::HistoryTemplate, PageError> {
    let (selected, days) =
        load_history(&state, &query).map_err(|failure| failure.page(&state))?;

    Ok(templates::HistoryTemplate {
        app_name: state.config.app_name.clone(),
        month_label: selected.label(),
        previous_month: selected.previous().key(),
        next_month: selected.next().key(),
        weekdays: WEEKDAY_NAMES.iter().map(|name| name.to_string()).collect(),
        weeks: calendar_weeks(days),
    })
}

pub(crate) async fn history_api(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<DayHistory>>, ApiError> {
    let (_, days) = load_history(&state, &query).map_err(Failure::api)?;
    Ok(Json(days))
}

/// Lays the month out in Sunday-first rows, padding both ends with `None`.
fn calendar_weeks(days: Vec<DayHistory>) -> Vec<Vec<Option<CalendarDay>>> {
    let leading = days
        .first()
        .map_or(0, |day| weekday_index(day.date.weekday()));
    let mut cells: Vec<Option<CalendarDay>> = (0..leading).map(|_| None).collect();
    cells.extend(days.into_iter().map(|day| {
        Some(CalendarDay {
            day: day.date.day(),
            doses: day
                .doses
                .into_iter()
                .map(|dose| {
                    CalendarDose::new(
                        dose.slot_name,
                        dose.scheduled_time.to_string(),
                        dose.status,
                    )
                })
                .collect(),
        })
    }));
    while cells.len() % DAYS_PER_WEEK != 0 {
        cells.push(None);
    }

    let mut weeks = Vec::with_capacity(cells.len() / DAYS_PER_WEEK);
    let mut cells = cells.into_iter().peekable();
    while cells.peek().is_some() {
        weeks.push(cells.by_ref().take(DAYS_PER_WEEK).collect());
    }
    weeks
}
