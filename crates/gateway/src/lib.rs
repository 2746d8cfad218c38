//! Gateway: the relay's HTTP surface.
//!
//! - `GET /` and `GET /health` for hosting-platform liveness checks
//! - `GET /metrics` in Prometheus text format (`prometheus` feature)
//! - `POST /ingest` and `POST /ingest/widget` for push-style sources such as
//!   the in-page widget observer (only when ingestion is enabled)

#[cfg(feature = "prometheus")]
pub mod metrics_routes;
pub mod server;
pub mod state;

pub use {
    server::{AppState, build_gateway_app, start_gateway},
    state::GatewayState,
};
