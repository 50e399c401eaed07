use axum::http::header;
use axum::response::{IntoResponse, Response};

const CSS_CONTENT: &str = include_str!("../static/style.css");
const PUSH_SUBSCRIBE_JS_CONTENT: &str = include_str!("../static/push_subscribe.js");
const SW_CONTENT: &str = include_str!("../static/sw.js");

fn static_asset(content_type: &'static str, cache_control: &'static str, body: &'static str) -> Response {
    (
        [
            (header::CONTENT_TYPE, content_type),
            (header::CACHE_CONTROL, cache_control),
        ],
        body,
    )
        .into_response()
}

pub(crate) async fn stylesheet() -> Response {
    static_asset("text/css", "public, max-age=3600", CSS_CONTENT)
}

pub(crate) async fn push_subscribe_script() -> Response {
    static_asset(
        "application/javascript",
        "public, max-age=3600",
        PUSH_SUBSCRIBE_JS_CONTENT,
    )
}

/// Served from the root so its scope covers every page.
pub(crate) async fn service_worker() -> Response {
    static_asset("application/javascript", "no-cache", SW_CONTENT)
}
