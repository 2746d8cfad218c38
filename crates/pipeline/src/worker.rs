//! The single consumer that paces chunks out to the sink.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU8, AtomicU64, Ordering},
    },
    time::Duration,
};

use {
    chatrelay_config::{DelayPolicy, RelaySettings},
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
};

#[cfg(feature = "metrics")]
use {
    chatrelay_metrics::{counter, delivery as delivery_metrics, histogram, labels},
    std::time::Instant,
};

use crate::{chunk::OutboundChunk, queue::DeliveryQueue, sink::NotificationSink};

/// Where the worker is in its `Idle → Sending → Idle` cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Sending,
    Stopped,
}

impl WorkerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Sending => "sending",
            Self::Stopped => "stopped",
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Sending,
            2 => Self::Stopped,
            _ => Self::Idle,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Sending => 1,
            Self::Stopped => 2,
        }
    }
}

/// Delivery counters shared with the health endpoint.
#[derive(Debug, Default)]
pub struct DeliveryStats {
    delivered: AtomicU64,
    failed: AtomicU64,
    state: AtomicU8,
}

impl DeliveryStats {
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn state(&self) -> WorkerState {
        WorkerState::from_u8(self.state.load(Ordering::Relaxed))
    }

    fn set_state(&self, state: WorkerState) {
        self.state.store(state.as_u8(), Ordering::Relaxed);
    }
}

pub struct DeliveryWorker {
    queue: Arc<DeliveryQueue>,
    sink: Arc<dyn NotificationSink>,
    send_delay: Duration,
    policy: DelayPolicy,
    stats: Arc<DeliveryStats>,
}

impl DeliveryWorker {
    pub fn new(
        queue: Arc<DeliveryQueue>,
        sink: Arc<dyn NotificationSink>,
        settings: &RelaySettings,
    ) -> Self {
        Self::with_delay(
            queue,
            sink,
            Duration::from_secs(settings.send_delay_secs),
            settings.delay_policy,
        )
    }

    pub fn with_delay(
        queue: Arc<DeliveryQueue>,
        sink: Arc<dyn NotificationSink>,
        send_delay: Duration,
        policy: DelayPolicy,
    ) -> Self {
        Self {
            queue,
            sink,
            send_delay,
            policy,
            stats: Arc::new(DeliveryStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<DeliveryStats> {
        Arc::clone(&self.stats)
    }

    /// Drain the queue until `cancel` fires.
    ///
    /// A send already in progress is allowed to finish; chunks still queued
    /// at cancellation are abandoned.
    pub async fn run(self, cancel: CancellationToken) {
        info!(
            send_delay_secs = self.send_delay.as_secs_f64(),
            policy = ?self.policy,
            "delivery worker started"
        );

        loop {
            self.stats.set_state(WorkerState::Idle);
            let chunk = tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                chunk = self.queue.pop() => chunk,
            };

            self.stats.set_state(WorkerState::Sending);
            self.deliver(&chunk).await;

            if cancel.is_cancelled() {
                break;
            }

            if self.should_wait() {
                self.stats.set_state(WorkerState::Idle);
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    () = tokio::time::sleep(self.send_delay) => {},
                }
            }
        }

        self.stats.set_state(WorkerState::Stopped);
        info!(
            abandoned = self.queue.len(),
            delivered = self.stats.delivered(),
            failed = self.stats.failed(),
            "delivery worker stopped"
        );
    }

    fn should_wait(&self) -> bool {
        if self.send_delay.is_zero() {
            return false;
        }
        match self.policy {
            DelayPolicy::Always => true,
            DelayPolicy::Backlog => !self.queue.is_empty(),
        }
    }

    async fn deliver(&self, chunk: &OutboundChunk) {
        let title = chunk.title();
        let body = chunk.body();

        #[cfg(feature = "metrics")]
        let started = Instant::now();

        let result = self.sink.send(&title, body.as_bytes()).await;

        #[cfg(feature = "metrics")]
        histogram!(delivery_metrics::SEND_DURATION_SECONDS)
            .record(started.elapsed().as_secs_f64());

        match result {
            Ok(()) => {
                self.stats.delivered.fetch_add(1, Ordering::Relaxed);
                #[cfg(feature = "metrics")]
                counter!(
                    delivery_metrics::CHUNKS_DELIVERED_TOTAL,
                    labels::PLATFORM => chunk.platform().as_str()
                )
                .increment(1);
                debug!(
                    platform = %chunk.platform(),
                    user = chunk.user(),
                    part = chunk.index(),
                    parts = chunk.total(),
                    "notification delivered"
                );
            },
            Err(e) => {
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                #[cfg(feature = "metrics")]
                counter!(
                    delivery_metrics::CHUNKS_FAILED_TOTAL,
                    labels::PLATFORM => chunk.platform().as_str()
                )
                .increment(1);
                warn!(
                    platform = %chunk.platform(),
                    user = chunk.user(),
                    part = chunk.index(),
                    parts = chunk.total(),
                    error = %e,
                    "notification delivery failed, dropping chunk"
                );
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{Error, Result},
        async_trait::async_trait,
        chatrelay_channels::{ChatEvent, EventKind, Platform},
        std::sync::{Mutex, atomic::AtomicUsize},
        tokio::time::Instant,
    };

    /// Records every send with the (paused) clock reading. With a non-zero
    /// `latency` the call sleeps before recording.
    #[derive(Default)]
    struct RecordingSink {
        sent: Mutex<Vec<(String, String, Instant)>>,
        fail_on: Option<String>,
        latency: Duration,
        started: AtomicUsize,
    }

    #[async_trait]
    impl NotificationSink for RecordingSink {
        async fn send(&self, title: &str, body: &[u8]) -> Result<()> {
            self.started.fetch_add(1, Ordering::SeqCst);
            if !self.latency.is_zero() {
                tokio::time::sleep(self.latency).await;
            }
            let body = String::from_utf8_lossy(body).into_owned();
            self.sent
                .lock()
                .unwrap()
                .push((title.to_string(), body.clone(), Instant::now()));
            if self.fail_on.as_deref() == Some(body.as_str()) {
                return Err(Error::message("boom"));
            }
            Ok(())
        }
    }

    impl RecordingSink {
        fn bodies(&self) -> Vec<String> {
            self.sent.lock().unwrap().iter().map(|s| s.1.clone()).collect()
        }

        fn times(&self) -> Vec<Instant> {
            self.sent.lock().unwrap().iter().map(|s| s.2).collect()
        }
    }

    fn enqueue(queue: &DeliveryQueue, text: &str) {
        let event = ChatEvent::new(Platform::Kick, "alice", text, EventKind::Message);
        queue.push_all(OutboundChunk::split(&event, 123));
    }

    fn spawn(
        queue: &Arc<DeliveryQueue>,
        sink: &Arc<RecordingSink>,
        policy: DelayPolicy,
    ) -> (CancellationToken, Arc<DeliveryStats>, tokio::task::JoinHandle<()>) {
        let worker = DeliveryWorker::with_delay(
            Arc::clone(queue),
            Arc::clone(sink) as Arc<dyn NotificationSink>,
            Duration::from_secs(5),
            policy,
        );
        let stats = worker.stats();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(worker.run(cancel.clone()));
        (cancel, stats, handle)
    }

    #[tokio::test(start_paused = true)]
    async fn backlog_policy_paces_only_a_backlog() {
        let queue = Arc::new(DeliveryQueue::unbounded());
        let sink = Arc::new(RecordingSink::default());
        enqueue(&queue, "a");
        enqueue(&queue, "b");
        enqueue(&queue, "c");

        let start = Instant::now();
        let (cancel, stats, handle) = spawn(&queue, &sink, DelayPolicy::Backlog);
        tokio::time::sleep(Duration::from_secs(30)).await;

        assert_eq!(sink.bodies(), ["a", "b", "c"]);
        let offsets: Vec<u64> = sink
            .times()
            .iter()
            .map(|t| t.duration_since(start).as_secs())
            .collect();
        assert_eq!(offsets, [0, 5, 10]);

        // Caught up: the next chunk goes out without waiting.
        let before = Instant::now();
        enqueue(&queue, "d");
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(sink.times().last().copied(), Some(before));

        assert_eq!(stats.delivered(), 4);
        cancel.cancel();
        handle.await.unwrap();
        assert_eq!(stats.state(), WorkerState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn always_policy_waits_after_every_send() {
        let queue = Arc::new(DeliveryQueue::unbounded());
        let sink = Arc::new(RecordingSink::default());
        enqueue(&queue, "a");

        let start = Instant::now();
        let (cancel, _stats, handle) = spawn(&queue, &sink, DelayPolicy::Always);
        tokio::time::sleep(Duration::from_secs(1)).await;
        enqueue(&queue, "b");
        tokio::time::sleep(Duration::from_secs(10)).await;

        let offsets: Vec<u64> = sink
            .times()
            .iter()
            .map(|t| t.duration_since(start).as_secs())
            .collect();
        assert_eq!(offsets, [0, 5]);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn failures_are_dropped_not_retried() {
        let queue = Arc::new(DeliveryQueue::unbounded());
        let sink = Arc::new(RecordingSink {
            fail_on: Some("bad".into()),
            ..Default::default()
        });
        enqueue(&queue, "good");
        enqueue(&queue, "bad");
        enqueue(&queue, "after");

        let (cancel, stats, handle) = spawn(&queue, &sink, DelayPolicy::Backlog);
        tokio::time::sleep(Duration::from_secs(60)).await;

        assert_eq!(sink.bodies(), ["good", "bad", "after"]);
        assert_eq!(stats.delivered(), 2);
        assert_eq!(stats.failed(), 1);
        assert!(queue.is_empty());

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_the_delay_and_abandons_the_rest() {
        let queue = Arc::new(DeliveryQueue::unbounded());
        let sink = Arc::new(RecordingSink::default());
        enqueue(&queue, "a");
        enqueue(&queue, "b");

        let (cancel, _stats, handle) = spawn(&queue, &sink, DelayPolicy::Backlog);
        tokio::time::sleep(Duration::from_secs(1)).await;
        cancel.cancel();
        tokio::time::timeout(Duration::from_millis(10), handle)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(sink.bodies(), ["a"]);
        assert_eq!(queue.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_the_idle_wait() {
        let queue = Arc::new(DeliveryQueue::unbounded());
        let sink = Arc::new(RecordingSink::default());

        let (cancel, stats, handle) = spawn(&queue, &sink, DelayPolicy::Backlog);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(stats.state(), WorkerState::Idle);
        cancel.cancel();
        handle.await.unwrap();
        assert!(sink.bodies().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_lets_the_in_flight_send_finish() {
        let queue = Arc::new(DeliveryQueue::unbounded());
        let sink = Arc::new(RecordingSink {
            latency: Duration::from_secs(3),
            ..Default::default()
        });
        enqueue(&queue, "a");
        enqueue(&queue, "b");

        let start = Instant::now();
        let (cancel, stats, handle) = spawn(&queue, &sink, DelayPolicy::Backlog);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(stats.state(), WorkerState::Sending);
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(10), handle)
            .await
            .unwrap()
            .unwrap();

        // "a" completed after cancellation; "b" was never started.
        assert_eq!(sink.bodies(), ["a"]);
        assert_eq!(sink.times()[0].duration_since(start).as_secs(), 3);
        assert_eq!(sink.started.load(Ordering::SeqCst), 1);
        assert_eq!(stats.delivered(), 1);
        assert_eq!(queue.len(), 1);
        assert_eq!(stats.state(), WorkerState::Stopped);
    }
}
