//! Chat relay core: raw events in, paced notifications out.
//!
//! ```text
//! SourceAdapter ─emit─▶ Normalizer ─▶ Deduplicator ─▶ chunk ─▶ DeliveryQueue
//!                                                                 │
//!                                    NotificationSink ◀─ DeliveryWorker
//! ```
//!
//! [`Pipeline`] implements [`chatrelay_channels::EventEmitter`] and owns the
//! producer side; [`DeliveryWorker`] is the single consumer. Both share one
//! [`DeliveryQueue`]. Nothing here is global: tests build isolated instances.

pub mod chunk;
pub mod dedupe;
pub mod error;
pub mod format;
pub mod normalize;
pub mod pipeline;
pub mod queue;
pub mod sink;
pub mod worker;

pub use {
    chunk::{OutboundChunk, chunk_text},
    dedupe::{DedupKey, Deduplicator},
    error::{Error, Result},
    normalize::{Normalizer, widget::WidgetNode},
    pipeline::Pipeline,
    queue::DeliveryQueue,
    sink::NotificationSink,
    worker::{DeliveryStats, DeliveryWorker, WorkerState},
};
