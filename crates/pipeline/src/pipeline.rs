use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use {
    chatrelay_channels::{EventEmitter, RawEvent},
    chatrelay_config::RelaySettings,
    tokio::task::JoinHandle,
    tokio_util::sync::CancellationToken,
    tracing::{debug, trace},
};

#[cfg(feature = "metrics")]
use chatrelay_metrics::{counter, labels, pipeline as pipeline_metrics};

use crate::{
    chunk::OutboundChunk, dedupe::Deduplicator, normalize::Normalizer, queue::DeliveryQueue,
};

/// Producer half of the relay: normalize, dedupe, chunk, enqueue.
///
/// Every source adapter shares one `Pipeline` (and through it one
/// [`Deduplicator`] and one [`DeliveryQueue`]).
pub struct Pipeline {
    normalizer: Normalizer,
    dedup: Arc<Deduplicator>,
    queue: Arc<DeliveryQueue>,
    max_len: usize,
}

impl Pipeline {
    pub fn new(settings: &RelaySettings) -> Self {
        Self::with_parts(
            Normalizer::new(settings.default_platform),
            Arc::new(Deduplicator::new(Duration::from_secs(
                settings.dedup_window_secs,
            ))),
            Arc::new(DeliveryQueue::new(
                settings.queue_capacity,
                settings.queue_warn_depth,
            )),
            settings.max_len,
        )
    }

    pub fn with_parts(
        normalizer: Normalizer,
        dedup: Arc<Deduplicator>,
        queue: Arc<DeliveryQueue>,
        max_len: usize,
    ) -> Self {
        Self {
            normalizer,
            dedup,
            queue,
            max_len: max_len.max(1),
        }
    }

    pub fn queue(&self) -> Arc<DeliveryQueue> {
        Arc::clone(&self.queue)
    }

    pub fn deduplicator(&self) -> Arc<Deduplicator> {
        Arc::clone(&self.dedup)
    }

    /// Run one raw event through the pipeline. Returns the number of chunks
    /// enqueued (0 when dropped or suppressed).
    pub fn ingest(&self, raw: RawEvent) -> usize {
        self.ingest_at(raw, Instant::now())
    }

    pub fn ingest_at(&self, raw: RawEvent, now: Instant) -> usize {
        #[cfg(feature = "metrics")]
        counter!(pipeline_metrics::EVENTS_RECEIVED_TOTAL).increment(1);

        let Some(event) = self.normalizer.normalize(raw) else {
            #[cfg(feature = "metrics")]
            counter!(pipeline_metrics::EVENTS_DROPPED_TOTAL).increment(1);
            return 0;
        };

        if !self.dedup.admit(&event, now) {
            #[cfg(feature = "metrics")]
            counter!(
                pipeline_metrics::EVENTS_SUPPRESSED_TOTAL,
                labels::PLATFORM => event.platform().as_str()
            )
            .increment(1);
            trace!(platform = %event.platform(), user = event.user(), "duplicate suppressed");
            return 0;
        }

        #[cfg(feature = "metrics")]
        counter!(
            pipeline_metrics::EVENTS_ADMITTED_TOTAL,
            labels::PLATFORM => event.platform().as_str(),
            labels::KIND => event.kind().as_str()
        )
        .increment(1);

        let chunks = OutboundChunk::split(&event, self.max_len);
        let count = chunks.len();
        self.queue.push_all(chunks);
        debug!(
            platform = %event.platform(),
            user = event.user(),
            kind = %event.kind(),
            chunks = count,
            "event enqueued"
        );
        count
    }

    /// Periodically evict dead dedup entries so idle periods don't hold
    /// memory. Runs until `cancel` fires.
    pub fn spawn_sweeper(&self, cancel: CancellationToken) -> JoinHandle<()> {
        let dedup = Arc::clone(&self.dedup);
        let period = dedup.window().max(Duration::from_secs(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        dedup.sweep(Instant::now());
                    },
                }
            }
        })
    }
}

impl EventEmitter for Pipeline {
    fn emit(&self, event: RawEvent) {
        self.ingest(event);
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        chatrelay_channels::{EventFields, Platform},
    };

    fn settings(max_len: usize) -> RelaySettings {
        RelaySettings {
            max_len,
            ..Default::default()
        }
    }

    fn bodies(queue: &DeliveryQueue) -> Vec<String> {
        std::iter::from_fn(|| queue.try_pop())
            .map(|c| c.body())
            .collect()
    }

    #[test]
    fn long_message_is_chunked_in_order() {
        let pipeline = Pipeline::new(&settings(5));
        let count = pipeline.ingest(RawEvent::message(Some("kick"), Some("alice"), "hello world"));
        assert_eq!(count, 3);
        assert_eq!(bodies(&pipeline.queue()), [
            "hello [1/3]",
            " worl [2/3]",
            "d [3/3]"
        ]);
    }

    #[test]
    fn duplicates_within_window_enqueue_once() {
        let pipeline = Pipeline::new(&settings(123));
        let t0 = Instant::now();
        let raw = RawEvent::message(Some("kick"), Some("alice"), "gg");
        assert_eq!(pipeline.ingest_at(raw.clone(), t0), 1);
        assert_eq!(pipeline.ingest_at(raw, t0 + Duration::from_secs(1)), 0);
        assert_eq!(pipeline.queue().len(), 1);
    }

    #[test]
    fn dropped_events_enqueue_nothing() {
        let pipeline = Pipeline::new(&settings(123));
        let unknown = RawEvent::message(None, Some("x"), "hi").with_kind("Unknown");
        assert_eq!(pipeline.ingest(unknown), 0);
        assert_eq!(pipeline.ingest(RawEvent::message(None, Some("x"), "  ")), 0);
        assert!(pipeline.queue().is_empty());
    }

    #[test]
    fn default_platform_comes_from_settings() {
        let pipeline = Pipeline::new(&RelaySettings {
            default_platform: Platform::Twitch,
            ..Default::default()
        });
        pipeline.emit(
            RawEvent::message(None, Some("zed"), "")
                .with_kind("raid")
                .with_fields(EventFields {
                    viewers: Some(12),
                    ..Default::default()
                }),
        );
        let chunk = pipeline.queue().try_pop().unwrap();
        assert_eq!(chunk.title(), "[Twitch] zed");
        assert_eq!(chunk.body(), "🚀 Raided with 12 viewers");
    }

    #[test]
    fn zero_max_len_is_clamped() {
        let pipeline = Pipeline::new(&settings(0));
        assert_eq!(pipeline.ingest(RawEvent::message(None, Some("a"), "abc")), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn sweeper_stops_on_cancel() {
        let pipeline = Pipeline::new(&settings(123));
        let cancel = CancellationToken::new();
        let handle = pipeline.spawn_sweeper(cancel.clone());
        tokio::time::sleep(Duration::from_secs(12)).await;
        cancel.cancel();
        handle.await.unwrap();
    }
}
