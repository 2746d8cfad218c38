//! Metrics collection and export for chatrelay.
//!
//! Every crate records through the `metrics` crate facade. When the
//! `prometheus` feature is enabled, [`init_metrics`] installs a Prometheus
//! recorder whose handle renders the `/metrics` endpoint; otherwise recorded
//! values are discarded by the facade's no-op recorder.
//!
//! ```rust,ignore
//! use chatrelay_metrics::{counter, pipeline};
//!
//! counter!(pipeline::EVENTS_ADMITTED_TOTAL, "platform" => "Kick").increment(1);
//! ```

mod definitions;
mod recorder;

pub use {
    definitions::*,
    recorder::{MetricsHandle, MetricsRecorderConfig, init_metrics},
};

// Re-export metrics macros for convenience
pub use metrics::{counter, gauge, histogram};
