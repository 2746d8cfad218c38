use std::sync::Arc;

use {async_trait::async_trait, tokio_util::sync::CancellationToken};

use crate::{Result, raw::RawEvent};

/// Receiver for raw events discovered by a source adapter.
///
/// Implementations must be cheap and non-blocking: adapters call `emit` from
/// their read loop and expect it to return immediately.
pub trait EventEmitter: Send + Sync {
    fn emit(&self, event: RawEvent);
}

/// A producer of raw chat events (polling loop, websocket listener, ...).
///
/// Adapters own transient error recovery and adapter-level dedup (seen
/// message IDs). `run` returns only on cancellation or on an unrecoverable
/// configuration error.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Adapter identifier used in logs and metrics (e.g. "chatbox").
    fn id(&self) -> &str;

    async fn run(&self, emitter: Arc<dyn EventEmitter>, cancel: CancellationToken) -> Result<()>;
}
