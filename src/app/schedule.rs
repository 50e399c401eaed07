use crate::dashboard::DashboardHandle;
use crate::schedule::ScheduleEdit;
use crate::state::AppState;
use crate::templates::{self, DayRow, SlotCell, SlotColumn};
use crate::types::schedule::{
    DoseTime, SLOTS_PER_DAY, WEEKDAY_NAMES, WeekSchedule, slot_label,
};

use super::{ApiError, Failure, PageError, current_snapshot, dashboard_handle, require};

use axum::Json;
use axum::extract::{Form, State};
use axum::http::StatusCode;
use axum::response::Redirect;
use serde::{Deserialize, Serialize};

pub(crate) async fn schedule_page(
    State(state): State<AppState>,
) -> Result<templates::ScheduleTemplate, PageError> {
    let snapshot = current_snapshot(&state).map_err(|failure| failure.page(&state))?;
    let stored = require(&snapshot.schedule, "schedule").map_err(|failure| failure.page(&state))?;
    let week = snapshot.draft.as_ref().unwrap_or(stored);

    Ok(templates::ScheduleTemplate {
        app_name: state.config.app_name.clone(),
        notice: snapshot.notice.clone().unwrap_or_default(),
        unsaved: snapshot.has_unsaved_changes(),
        columns: columns(week),
        days: day_rows(week),
    })
}

fn columns(week: &WeekSchedule) -> Vec<SlotColumn> {
    (0..SLOTS_PER_DAY)
        .map(|index| SlotColumn {
            index,
            label: slot_label(index),
            any_enabled: week
                .days()
                .iter()
                .any(|day| day.slot(index).is_some_and(|slot| slot.enabled)),
        })
        .collect()
}

fn day_rows(week: &WeekSchedule) -> Vec<DayRow> {
    week.days()
        .iter()
        .enumerate()
        .map(|(index, day)| DayRow {
            index,
            name: WEEKDAY_NAMES[index].to_string(),
            slots: day
                .iter()
                .enumerate()
                .map(|(index, slot)| SlotCell {
                    index,
                    time: slot.time.to_string(),
                    enabled: slot.enabled,
                })
                .collect(),
        })
        .collect()
}

#[derive(Debug, Deserialize)]
pub(crate) struct SetTimeForm {
    pub(crate) day: usize,
    pub(crate) slot: usize,
    pub(crate) time: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SetEnabledForm {
    pub(crate) day: usize,
    pub(crate) slot: usize,
    pub(crate) enabled: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ToggleWeeklyForm {
    pub(crate) slot: usize,
}

pub(crate) async fn schedule_set_time(
    State(state): State<AppState>,
    Form(form): Form<SetTimeForm>,
) -> Result<Redirect, PageError> {
    let time = form
        .time
        .trim()
        .parse::<DoseTime>()
        .map_err(|err| Failure::new(StatusCode::BAD_REQUEST, err.to_string()).page(&state))?;
    edit_from_form(
        &state,
        ScheduleEdit::SetTime {
            day: form.day,
            slot: form.slot,
            time,
        },
    )
    .await
}

pub(crate) async fn schedule_set_enabled(
    State(state): State<AppState>,
    Form(form): Form<SetEnabledForm>,
) -> Result<Redirect, PageError> {
    edit_from_form(
        &state,
        ScheduleEdit::SetEnabled {
            day: form.day,
            slot: form.slot,
            enabled: form.enabled,
        },
    )
    .await
}

pub(crate) async fn schedule_toggle_weekly(
    State(state): State<AppState>,
    Form(form): Form<ToggleWeeklyForm>,
) -> Result<Redirect, PageError> {
    edit_from_form(&state, ScheduleEdit::ToggleWeekly { slot: form.slot }).await
}

async fn edit_from_form(state: &AppState, edit: ScheduleEdit) -> Result<Redirect, PageError> {
    let handle = dashboard_handle(state).map_err(|failure| failure.page(state))?;
    handle
        .edit(edit)
        .await
        .map_err(|err| Failure::from(err).page(state))?;
    Ok(Redirect::to("/schedule"))
}

pub(crate) async fn schedule_save(State(state): State<AppState>) -> Result<Redirect, PageError> {
    let handle = dashboard_handle(&state).map_err(|failure| failure.page(&state))?;
    handle
        .save()
        .await
        .map_err(|err| Failure::from(err).page(&state))?;
    Ok(Redirect::to("/schedule"))
}

pub(crate) async fn schedule_discard(
    State(state): State<AppState>,
) -> Result<Redirect, PageError> {
    let handle = dashboard_handle(&state).map_err(|failure| failure.page(&state))?;
    handle
        .discard()
        .await
        .map_err(|err| Failure::from(err).page(&state))?;
    Ok(Redirect::to("/schedule"))
}

#[derive(Debug, Serialize)]
pub(crate) struct ScheduleResponse {
    pub(crate) schedule: WeekSchedule,
    pub(crate) draft: Option<WeekSchedule>,
    pub(crate) unsaved: bool,
}

fn schedule_response(handle: &DashboardHandle) -> Result<Json<ScheduleResponse>, ApiError> {
    let snapshot = handle.snapshot();
    let schedule = require(&snapshot.schedule, "schedule")
        .map_err(Failure::api)?
        .clone();
    Ok(Json(ScheduleResponse {
        unsaved: snapshot.has_unsaved_changes(),
        draft: snapshot.draft,
        schedule,
    }))
}

pub(crate) async fn schedule_api(
    State(state): State<AppState>,
) -> Result<Json<ScheduleResponse>, ApiError> {
    schedule_response(dashboard_handle(&state).map_err(Failure::api)?)
}

pub(crate) async fn schedule_edit_api(
    State(state): State<AppState>,
    Json(edit): Json<ScheduleEdit>,
) -> Result<Json<ScheduleResponse>, ApiError> {
    let handle = dashboard_handle(&state).map_err(Failure::api)?;
    handle
        .edit(edit)
        .await
        .map_err(|err| Failure::from(err).api())?;
    schedule_response(handle)
}

pub(crate) async fn schedule_save_api(
    State(state): State<AppState>,
) -> Result<Json<ScheduleResponse>, ApiError> {
    let handle = dashboard_handle(&state).map_err(Failure::api)?;
    handle
        .save()
        .await
        .map_err(|err| Failure::from(err).api())?;
    schedule_response(handle)
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::super::tests::{every_day, form_request, get_request, json_request, loaded_state, send};
    use crate::app::app_with_state;
    use crate::dashboard::SCHEDULE_PATH;

    use axum::http::StatusCode;
    use serde_json::{Value, json};

    #[tokio::test]
    async fn schedule_page__should_render_every_day_and_slot() {
        // Given
        let (state, _store) =
            loaded_state(every_day(["08:00", "12:00", "13:00", "20:00"]), json!({})).await;

        // When
        let (status, body) = send(app_with_state(state), get_request("/schedule")).await;

        // Then
        assert_eq!(status, StatusCode::OK);
        for name in ["Sun", "Mon", "Sat", "Morning Dose", "Emergency Dose"] {
            assert!(body.contains(name), "missing {name}");
        }
        assert!(body.contains("value=\"20:00\""));
    }

    #[tokio::test]
    async fn schedule_forms__should_edit_the_draft_and_save() {
        // Given
        let (state, store) =
            loaded_state(every_day(["08:00", "12:00", "13:00", "20:00"]), json!({})).await;
        let app = app_with_state(state);

        // When
        let (time_status, _) = send(
            app.clone(),
            form_request("/schedule/time", "day=2&slot=0&time=14%3A30"),
        )
        .await;
        let (page_status, page) = send(app.clone(), get_request("/schedule")).await;
        let (save_status, _) = send(app, form_request("/schedule/save", "")).await;

        // Then
        assert_eq!(time_status, StatusCode::SEE_OTHER);
        assert_eq!(page_status, StatusCode::OK);
        assert!(page.contains("Unsaved changes"));
        assert_eq!(save_status, StatusCode::SEE_OTHER);
        let stored = store.get(SCHEDULE_PATH).expect("stored schedule");
        assert_eq!(stored[2][2], json!({ "time": "14:30", "enabled": true }));
        assert_eq!(stored[3][0], json!({ "time": "08:00", "enabled": true }));
    }

    #[tokio::test]
    async fn schedule_forms__should_reject_bad_input() {
        // Given
        let (state, _store) =
            loaded_state(every_day(["08:00", "12:00", "13:00", "20:00"]), json!({})).await;
        let app = app_with_state(state);

        // When
        let (bad_time, body) = send(
            app.clone(),
            form_request("/schedule/time", "day=0&slot=0&time=25%3A00"),
        )
        .await;
        let (bad_slot, _) = send(app, form_request("/schedule/toggle-weekly", "slot=7")).await;

        // Then
        assert_eq!(bad_time, StatusCode::BAD_REQUEST);
        assert!(body.contains("invalid dose time"));
        assert_eq!(bad_slot, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn schedule_edit_api__should_apply_json_edits() {
        // Given
        let (state, store) =
            loaded_state(every_day(["08:00", "12:00", "13:00", "20:00"]), json!({})).await;
        let app = app_with_state(state);

        // When
        let (edit_status, edited) = send(
            app.clone(),
            json_request("/api/schedule/edit", json!({ "kind": "toggle_weekly", "slot": 3 })),
        )
        .await;
        let (save_status, saved) = send(app, json_request("/api/schedule/save", json!(null))).await;

        // Then
        assert_eq!(edit_status, StatusCode::OK);
        let edited: Value = serde_json::from_str(&edited).expect("json body");
        assert_eq!(edited["unsaved"], true);
        assert_eq!(edited["draft"][0][3]["enabled"], false);
        assert_eq!(save_status, StatusCode::OK);
        let saved: Value = serde_json::from_str(&saved).expect("json body");
        assert_eq!(saved["unsaved"], false);
        assert_eq!(saved["draft"], Value::Null);
        let stored = store.get(SCHEDULE_PATH).expect("stored schedule");
        assert_eq!(stored[6][3]["enabled"], false);
    }
}
