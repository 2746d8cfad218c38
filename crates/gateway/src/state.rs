use std::{sync::Arc, time::Instant};

use chatrelay_pipeline::{DeliveryStats, Pipeline};

#[cfg(feature = "metrics")]
use chatrelay_metrics::MetricsHandle;

/// Shared state behind every gateway handler.
pub struct GatewayState {
    pub pipeline: Arc<Pipeline>,
    pub stats: Arc<DeliveryStats>,
    /// Whether the `/ingest` routes are mounted.
    pub ingest_enabled: bool,
    pub started_at: Instant,
    #[cfg(feature = "metrics")]
    pub metrics_handle: Option<MetricsHandle>,
}

impl GatewayState {
    pub fn new(pipeline: Arc<Pipeline>, stats: Arc<DeliveryStats>) -> Self {
        Self {
            pipeline,
            stats,
            ingest_enabled: false,
            started_at: Instant::now(),
            #[cfg(feature = "metrics")]
            metrics_handle: None,
        }
    }

    #[must_use]
    pub fn with_ingest(mut self, enabled: bool) -> Self {
        self.ingest_enabled = enabled;
        self
    }

    #[cfg(feature = "metrics")]
    #[must_use]
    pub fn with_metrics_handle(mut self, handle: Option<MetricsHandle>) -> Self {
        self.metrics_handle = handle;
        self
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
