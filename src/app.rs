use crate::assets;
use crate::config;
use crate::dashboard::{DashboardError, DashboardHandle, Feed, Snapshot};
use crate::state::{AppState, StoreStatus};
use crate::templates;

use axum::Json;
use axum::Router;
use axum::http::StatusCode;
use axum::routing::{get, post};
use serde::Serialize;

mod dashboard;
mod history;
mod logs;
mod push;
mod schedule;

pub fn app(config: config::AppConfig) -> Router {
    app_with_state(AppState::start(config))
}

pub fn app_with_state(state: AppState) -> Router {
    Router::new()
        .route("/", get(dashboard::dashboard_page))
        .route("/schedule", get(schedule::schedule_page))
        .route("/schedule/time", post(schedule::schedule_set_time))
        .route("/schedule/enabled", post(schedule::schedule_set_enabled))
        .route(
            "/schedule/toggle-weekly",
            post(schedule::schedule_toggle_weekly),
        )
        .route("/schedule/save", post(schedule::schedule_save))
        .route("/schedule/discard", post(schedule::schedule_discard))
        .route("/history", get(history::history_page))
        .route("/logs", get(logs::logs_page))
        .route("/api/schedule", get(schedule::schedule_api))
        .route("/api/schedule/edit", post(schedule::schedule_edit_api))
        .route("/api/schedule/save", post(schedule::schedule_save_api))
        .route("/api/next-dose", get(dashboard::next_dose_api))
        .route("/api/stats", get(dashboard::stats_api))
        .route("/api/history", get(history::history_api))
        .route("/api/logs", get(logs::logs_api))
        .route("/push/subscribe", get(push::push_subscribe))
        .route("/api/push/public-key", get(push::push_public_key))
        .route("/api/push/test", post(push::push_test))
        .route("/api/debug/reminders", get(push::reminders_debug))
        .route("/static/style.css", get(assets::stylesheet))
        .route(
            "/static/push_subscribe.js",
            get(assets::push_subscribe_script),
        )
        .route("/sw.js", get(assets::service_worker))
        .route("/health", get(health))
        .with_state(state)
}

pub(crate) async fn health() -> &'static str {
    "ok"
}

#[derive(Debug, Serialize)]
pub(crate) struct ErrorResponse {
    pub(crate) error: String,
}

pub(crate) type PageError = (StatusCode, templates::ErrorTemplate);
pub(crate) type ApiError = (StatusCode, Json<ErrorResponse>);

/// Why a request could not be answered, before it is rendered as a page or
/// as JSON.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Failure {
    pub(crate) status: StatusCode,
    pub(crate) message: String,
}

impl Failure {
    pub(crate) fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub(crate) fn page(self, state: &AppState) -> PageError {
        (
            self.status,
            templates::ErrorTemplate {
                app_name: state.config.app_name.clone(),
                message: self.message,
            },
        )
    }

    pub(crate) fn api(self) -> ApiError {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
    }
}

impl From<DashboardError> for Failure {
    fn from(err: DashboardError) -> Self {
        let status = match err {
            DashboardError::Edit(_) => StatusCode::BAD_REQUEST,
            DashboardError::NotLoaded | DashboardError::Stopped => StatusCode::SERVICE_UNAVAILABLE,
            DashboardError::Save(_) => StatusCode::BAD_GATEWAY,
        };
        Failure::new(status, err.to_string())
    }
}

pub(crate) fn dashboard_handle(state: &AppState) -> Result<&DashboardHandle, Failure> {
    match &state.store {
        StoreStatus::Ready(handle) => Ok(handle),
        StoreStatus::Unconfigured => Err(Failure::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "Store is not configured.",
        )),
    }
}

pub(crate) fn current_snapshot(state: &AppState) -> Result<Snapshot, Failure> {
    dashboard_handle(state).map(DashboardHandle::snapshot)
}

pub(crate) fn require<'a, T>(feed: &'a Feed<T>, what: &str) -> Result<&'a T, Failure> {
    match feed {
        Feed::Ready(value) => Ok(value),
        Feed::Loading => Err(Failure::new(
            StatusCode::SERVICE_UNAVAILABLE,
            format!("The {what} is still loading."),
        )),
        Feed::Failed(message) => Err(Failure::new(
            StatusCode::BAD_GATEWAY,
            format!("The {what} could not be loaded: {message}"),
        )),
    }
}
