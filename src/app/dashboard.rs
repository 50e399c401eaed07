use crate::state::AppState;
use crate::templates::{self, LogRow, NextDoseCard, StatsCard, format_instant};
use crate::types::views::{AdherenceStats, NextDose};
use crate::views::{adherence_stats, next_dose};

use super::{ApiError, Failure, PageError, current_snapshot, require};

use axum::Json;
use axum::extract::State;

const RECENT_LOGS: usize = 5;

pub(crate) async fn dashboard_page(
    State(state): State<AppState>,
) -> Result<templates::DashboardTemplate, PageError> {
    let snapshot = current_snapshot(&state).map_err(|failure| failure.page(&state))?;
    let week = require(&snapshot.schedule, "schedule").map_err(|failure| failure.page(&state))?;
    let now = state.now();
    let offset = state.config.utc_offset;

    let next_dose = next_dose(Some(week), now).map(|dose| NextDoseCard {
        weekday: dose.weekday_label().to_string(),
        time: dose.time.to_string(),
        when: format_instant(dose.at),
        slot_name: dose.slot_name,
    });

    // The next dose only needs the schedule; a log feed problem is shown in
    // place of the cards that depend on it.
    let (stats, recent_logs, logs_error) = match require(&snapshot.logs, "medication log") {
        Ok(logs) => (
            adherence_stats(Some(week), logs, now).map_or_else(empty_stats, stats_card),
            logs.iter()
                .rev()
                .take(RECENT_LOGS)
                .map(|log| LogRow::new(log, offset))
                .collect(),
            String::new(),
        ),
        Err(failure) => (empty_stats(), Vec::new(), failure.message),
    };

    Ok(templates::DashboardTemplate {
        app_name: state.config.app_name.clone(),
        notice: snapshot.notice.clone().unwrap_or_default(),
        next_dose,
        stats,
        recent_logs,
        logs_error,
    })
}

fn stats_card(stats: AdherenceStats) -> StatsCard {
    StatsCard {
        scheduled_today_past: stats.scheduled_today_past,
        taken_today: stats.taken_today,
        scheduled_this_week_past: stats.scheduled_this_week_past,
        taken_this_week: stats.taken_this_week,
        adherence: match stats.adherence_this_week {
            Some(percent) => format!("{percent}%"),
            None => "n/a".to_string(),
        },
    }
}

fn empty_stats() -> StatsCard {
    StatsCard {
        scheduled_today_past: 0,
        taken_today: 0,
        scheduled_this_week_past: 0,
        taken_this_week: 0,
        adherence: "n/a".to_string(),
    }
}

pub(crate) async fn next_dose_api(
    State(state): State<AppState>,
) -> Result<Json<Option<NextDose>>, ApiError> {
    let snapshot = current_snapshot(&state).map_err(Failure::api)?;
    let week = require(&snapshot.schedule, "schedule").map_err(Failure::api)?;
    Ok(Json(next_dose(Some(week), state.now())))
}

pub(crate) async fn stats_api(
    State(state): State<AppState>,
) -> Result<Json<Option<AdherenceStats>>, ApiError> {
    let snapshot = current_snapshot(&state).map_err(Failure::api)?;
    let week = require(&snapshot.schedule, "schedule").map_err(Failure::api)?;
    let logs = require(&snapshot.logs, "medication log").map_err(Failure::api)?;
    Ok(Json(adherence_stats(Some(week), logs, state.now())))
}
