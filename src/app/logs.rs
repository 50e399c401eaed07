use crate::state::AppState;
use crate::templates::{self, LogRow};
use crate::types::logs::MedicationLog;

use super::{ApiError, Failure, PageError, current_snapshot, require};

use axum::Json;
use axum::extract::State;

/// Every log record, newest first.
pub(crate) async fn logs_page(
    State(state): State<AppState>,
) -> Result<templates::LogsTemplate, PageError> {
    let snapshot = current_snapshot(&state).map_err(|failure| failure.page(&state))?;
    let logs =
        require(&snapshot.logs, "medication log").map_err(|failure| failure.page(&state))?;

    Ok(templates::LogsTemplate {
        app_name: state.config.app_name.clone(),
        logs: logs
            .iter()
            .rev()
            .map(|log| LogRow::new(log, state.config.utc_offset))
            .collect(),
    })
}

/// Every log record, oldest first, as stored.
pub(crate) async fn logs_api(
    State(state): State<AppState>,
) -> Result<Json<Vec<MedicationLog>>, ApiError> {
    let snapshot = current_snapshot(&state).map_err(Failure::api)?;
    let logs = require(&snapshot.logs, "medication log").map_err(Failure::api)?;
    Ok(Json(logs.to_vec()))
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::super::tests::{every_day, get_request, loaded_state, send};
    use crate::app::app_with_state;
    use crate::dashboard::LOGS_PATH;
    use crate::state::StoreStatus;

    use axum::http::StatusCode;
    use serde_json::{Value, json};
    use std::time::Duration;

    fn logs() -> Value {
        json!({
            "-a": { "action": "medication_confirmed", "device_id": "dispenser-1", "timestamp_millis": 1_736_924_700_000_i64 },
            "-b": { "action": "medication_missed", "device_id": "dispenser-2", "timestamp_millis": 1_736_860_200_000_i64 },
            "-c": { "action": "dispenser_opened", "device_id": "dispenser-1" },
        })
    }

    #[tokio::test]
    async fn logs_api__should_list_usable_records_oldest_first() {
        // Given
        let (state, _store) =
            loaded_state(every_day(["07:00", "13:00", "19:00", "23:00"]), logs()).await;

        // When
        let (status, body) = send(app_with_state(state), get_request("/api/logs")).await;

        // Then
        assert_eq!(status, StatusCode::OK);
        let body: Value = serde_json::from_str(&body).expect("json body");
        let ids: Vec<&str> = body
            .as_array()
            .expect("array of logs")
            .iter()
            .map(|log| log["id"].as_str().expect("id"))
            .collect();
        assert_eq!(ids, vec!["-b", "-a"]);
        assert_eq!(body[1]["action"], "medication_confirmed");
    }

    #[tokio::test]
    async fn logs_page__should_show_newest_first() {
        // Given
        let (state, _store) =
            loaded_state(every_day(["07:00", "13:00", "19:00", "23:00"]), logs()).await;

        // When
        let (status, body) = send(app_with_state(state), get_request("/logs")).await;

        // Then
        assert_eq!(status, StatusCode::OK);
        let newest = body.find("2025-01-15 07:05").expect("newest log");
        let oldest = body.find("2025-01-14 13:10").expect("oldest log");
        assert!(newest < oldest);
        assert!(body.contains("dispenser-2"));
    }

    #[tokio::test]
    async fn logs_api__should_follow_new_records() {
        // Given
        let (state, store) =
            loaded_state(every_day(["07:00", "13:00", "19:00", "23:00"]), json!({})).await;
        let StoreStatus::Ready(handle) = &state.store else {
            panic!("store should be ready");
        };
        let mut watch = handle.watch();
        let app = app_with_state(state.clone());

        // When
        store.set(LOGS_PATH, Some(logs()));
        tokio::time::timeout(
            Duration::from_secs(5),
            watch.wait_for(|snapshot| snapshot.logs().len() == 2),
        )
        .await
        .expect("logs arrived in time")
        .expect("dashboard running");
        let (status, body) = send(app, get_request("/api/logs")).await;

        // Then
        assert_eq!(status, StatusCode::OK);
        let body: Value = serde_json::from_str(&body).expect("json body");
        assert_eq!(body.as_array().map(Vec::len), Some(2));
    }
}
