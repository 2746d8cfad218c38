//! Metric name and label definitions.
//!
//! All metric names recorded anywhere in chatrelay live here so the
//! exported surface can be read in one place.

/// Ingestion pipeline metrics (normalize → dedupe → chunk → enqueue).
pub mod pipeline {
    /// Raw events handed to the pipeline by any source adapter
    pub const EVENTS_RECEIVED_TOTAL: &str = "chatrelay_events_received_total";
    /// Events dropped by the normalizer (no text, unknown kind, no chat marker)
    pub const EVENTS_DROPPED_TOTAL: &str = "chatrelay_events_dropped_total";
    /// Events admitted by the deduplicator
    pub const EVENTS_ADMITTED_TOTAL: &str = "chatrelay_events_admitted_total";
    /// Events suppressed as duplicates
    pub const EVENTS_SUPPRESSED_TOTAL: &str = "chatrelay_events_suppressed_total";
    /// Number of live entries in the dedup map after a sweep
    pub const DEDUP_ENTRIES: &str = "chatrelay_dedup_entries";
}

/// Delivery queue and worker metrics
pub mod delivery {
    /// Chunks pushed onto the delivery queue
    pub const CHUNKS_ENQUEUED_TOTAL: &str = "chatrelay_chunks_enqueued_total";
    /// Chunks discarded because the queue was at capacity
    pub const CHUNKS_OVERFLOWED_TOTAL: &str = "chatrelay_chunks_overflowed_total";
    /// Chunks accepted by the sink
    pub const CHUNKS_DELIVERED_TOTAL: &str = "chatrelay_chunks_delivered_total";
    /// Chunks the sink rejected (dropped, never retried)
    pub const CHUNKS_FAILED_TOTAL: &str = "chatrelay_chunks_failed_total";
    /// Current delivery queue depth
    pub const QUEUE_DEPTH: &str = "chatrelay_queue_depth";
    /// Duration of a single sink call in seconds
    pub const SEND_DURATION_SECONDS: &str = "chatrelay_send_duration_seconds";
}

/// Source adapter metrics
pub mod sources {
    /// Raw records fetched or received by an adapter
    pub const RECORDS_RECEIVED_TOTAL: &str = "chatrelay_source_records_received_total";
    /// Transient fetch/connection failures (retried after a delay)
    pub const ERRORS_TOTAL: &str = "chatrelay_source_errors_total";
    /// Number of adapters currently running
    pub const ACTIVE: &str = "chatrelay_sources_active";
}

/// Common label keys
pub mod labels {
    pub const PLATFORM: &str = "platform";
    pub const KIND: &str = "kind";
    pub const SOURCE: &str = "source";
    pub const REASON: &str = "reason";
}

/// Histogram bucket definitions
pub mod buckets {
    use once_cell::sync::Lazy;

    /// Sink call duration buckets (in seconds)
    /// Covers 5ms to 60s
    pub static SEND_DURATION: Lazy<Vec<f64>> = Lazy::new(|| {
        vec![
            0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0,
        ]
    });
}
