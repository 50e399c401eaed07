pub mod adapters;
mod app;
mod assets;
pub mod config;
pub mod dashboard;
pub mod logs;
pub mod ports;
pub mod reminders;
pub mod schedule;
pub mod state;
mod templates;
pub mod types;
pub mod views;

pub use app::{app, app_with_state};

use std::net::SocketAddr;

pub async fn serve(addr: SocketAddr, config: config::AppConfig) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("listening on http://{addr}");
    axum::serve(listener, app(config)).await
}
