use std::{net::SocketAddr, sync::Arc};

use {
    anyhow::Context,
    axum::{
        Json, Router,
        extract::{ConnectInfo, State},
        http::StatusCode,
        response::IntoResponse,
        routing::{get, post},
    },
    chatrelay_channels::RawEvent,
    chatrelay_config::ServerConfig,
    chatrelay_pipeline::WidgetNode,
    serde_json::json,
    tokio::net::TcpListener,
    tokio_util::sync::CancellationToken,
    tower_http::{
        cors::{Any, CorsLayer},
        trace::TraceLayer,
    },
    tracing::{debug, info},
};

use crate::state::GatewayState;

#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<GatewayState>,
}

/// Build the router. `/ingest` routes are mounted only when the state says
/// ingestion is enabled.
pub fn build_gateway_app(state: Arc<GatewayState>) -> Router {
    // The widget observer posts from the overlay page's origin.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut router: Router<AppState> = Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler));

    #[cfg(feature = "prometheus")]
    {
        router = router.route(
            "/metrics",
            get(crate::metrics_routes::prometheus_metrics_handler),
        );
    }

    if state.ingest_enabled {
        router = router
            .route("/ingest", post(ingest_handler))
            .route("/ingest/widget", post(widget_ingest_handler));
    }

    router
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { gateway: state })
}

/// Bind and serve until `cancel` fires.
pub async fn start_gateway(
    config: &ServerConfig,
    state: Arc<GatewayState>,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind((config.bind.as_str(), config.port))
        .await
        .with_context(|| format!("failed to bind {}:{}", config.bind, config.port))?;
    let addr = listener.local_addr()?;
    info!(%addr, ingest = state.ingest_enabled, "gateway listening");

    let app = build_gateway_app(state);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(cancel.cancelled_owned())
    .await?;

    info!("gateway stopped");
    Ok(())
}

async fn root_handler() -> &'static str {
    "OK"
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let gw = &state.gateway;
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": gw.uptime_secs(),
        "queue_depth": gw.pipeline.queue().len(),
        "dedup_entries": gw.pipeline.deduplicator().len(),
        "worker": gw.stats.state().as_str(),
        "delivered": gw.stats.delivered(),
        "failed": gw.stats.failed(),
    }))
}

async fn ingest_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    Json(raw): Json<RawEvent>,
) -> impl IntoResponse {
    let queued = state.gateway.pipeline.ingest(raw);
    debug!(%peer, queued, "raw event ingested");
    (StatusCode::ACCEPTED, Json(json!({ "queued": queued })))
}

async fn widget_ingest_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    Json(node): Json<WidgetNode>,
) -> impl IntoResponse {
    let Some(raw) = node.into_raw_event() else {
        debug!(%peer, "widget row without data-from skipped");
        return (
            StatusCode::OK,
            Json(json!({ "queued": 0, "skipped": true })),
        );
    };
    let queued = state.gateway.pipeline.ingest(raw);
    debug!(%peer, queued, "widget row ingested");
    (StatusCode::ACCEPTED, Json(json!({ "queued": queued })))
}
