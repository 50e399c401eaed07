use crate::adapters::WebPushSender;
use crate::ports::push::PushSender;
use crate::reminders::{PlannedReminder, VapidConfigStatus};
use crate::state::AppState;
use crate::templates;
use crate::types::push::{PushMessage, Subscription, VapidConfig};

use super::{ApiError, Failure};

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

const TEST_MESSAGE: &str = "Test notification from Pillminder";

#[derive(Serialize)]
pub(crate) struct RemindersDebugResponse {
    #[serde(with = "time::serde::rfc3339")]
    pub(crate) server_time: OffsetDateTime,
    pub(crate) enabled: bool,
    pub(crate) subscribers: usize,
    pub(crate) planned: Option<PlannedReminder>,
    pub(crate) sent: u64,
    pub(crate) finished: bool,
}

pub(crate) async fn reminders_debug(State(state): State<AppState>) -> Json<RemindersDebugResponse> {
    let reminders = state.reminders.as_deref();
    Json(RemindersDebugResponse {
        server_time: state.now(),
        enabled: reminders.is_some(),
        subscribers: state.subscriptions.subscriptions.len(),
        planned: reminders.and_then(|handle| handle.planned()),
        sent: reminders.map_or(0, |handle| handle.sent()),
        finished: reminders.is_some_and(|handle| handle.is_finished()),
    })
}

#[derive(Serialize)]
pub(crate) struct PublicKeyResponse {
    #[serde(rename = "publicKey")]
    pub(crate) public_key: String,
}

fn configured_vapid(state: &AppState) -> Result<VapidConfig, Failure> {
    VapidConfigStatus::from_config(&state.config)
        .ready()
        .ok_or_else(|| {
            Failure::new(
                StatusCode::SERVICE_UNAVAILABLE,
                "Push notifications are not configured.",
            )
        })
}

pub(crate) async fn push_public_key(
    State(state): State<AppState>,
) -> Result<Json<PublicKeyResponse>, ApiError> {
    let vapid = configured_vapid(&state).map_err(Failure::api)?;
    Ok(Json(PublicKeyResponse {
        public_key: vapid.public_key,
    }))
}

#[derive(Debug, Deserialize)]
pub(crate) struct TestPushRequest {
    pub(crate) endpoint: String,
    pub(crate) p256dh: String,
    pub(crate) auth: String,
    pub(crate) message: Option<String>,
}

#[derive(Serialize)]
pub(crate) struct TestPushResponse {
    pub(crate) status: &'static str,
}

pub(crate) async fn push_test(
    State(state): State<AppState>,
    Json(request): Json<TestPushRequest>,
) -> Result<Json<TestPushResponse>, ApiError> {
    let vapid = configured_vapid(&state).map_err(Failure::api)?;

    if request.endpoint.trim().is_empty()
        || request.p256dh.trim().is_empty()
        || request.auth.trim().is_empty()
    {
        return Err(Failure::new(
            StatusCode::BAD_REQUEST,
            "endpoint, p256dh, and auth are required.",
        )
        .api());
    }
    let body = request.message.as_deref().unwrap_or(TEST_MESSAGE).trim();
    if body.is_empty() {
        return Err(Failure::new(StatusCode::BAD_REQUEST, "message must not be empty.").api());
    }

    let sender = WebPushSender::new(vapid).map_err(|err| {
        tracing::error!(%err, "failed to init web-push for a test notification");
        Failure::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to initialize push sender.",
        )
        .api()
    })?;
    let subscription = Subscription {
        endpoint: request.endpoint,
        p256dh: request.p256dh,
        auth: request.auth,
    };
    let message = PushMessage::new(state.config.app_name.as_str(), body);

    if let Err(err) = sender.send(&subscription, &message).await {
        tracing::warn!(%err, endpoint = %subscription.endpoint, "test notification failed");
        return Err(Failure::new(StatusCode::BAD_GATEWAY, "Failed to send test notification.").api());
    }
    tracing::info!(endpoint = %subscription.endpoint, "test notification sent");
    Ok(Json(TestPushResponse { status: "sent" }))
}

pub(crate) async fn push_subscribe(State(state): State<AppState>) -> templates::PushSubscribeTemplate {
    templates::PushSubscribeTemplate {
        app_name: state.config.app_name,
    }
}
