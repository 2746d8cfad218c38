use std::{collections::VecDeque, sync::Mutex};

use {tokio::sync::Notify, tracing::warn};

#[cfg(feature = "metrics")]
use chatrelay_metrics::{counter, delivery as delivery_metrics, gauge};

use crate::chunk::OutboundChunk;

/// FIFO of chunks awaiting delivery: many producers, one consumer.
///
/// Unbounded unless a capacity is set, in which case the oldest chunks are
/// discarded to make room. Crossing `warn_depth` is logged so sustained
/// overload is visible.
pub struct DeliveryQueue {
    chunks: Mutex<VecDeque<OutboundChunk>>,
    notify: Notify,
    capacity: Option<usize>,
    warn_depth: usize,
}

impl DeliveryQueue {
    /// `capacity: None` means unbounded; `warn_depth: 0` disables the
    /// high-water warning.
    pub fn new(capacity: Option<usize>, warn_depth: usize) -> Self {
        Self {
            chunks: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
            capacity: capacity.filter(|c| *c > 0),
            warn_depth,
        }
    }

    pub fn unbounded() -> Self {
        Self::new(None, 0)
    }

    /// Append all chunks of one event contiguously. Returns the number of
    /// older chunks discarded to respect the capacity.
    pub fn push_all(&self, chunks: Vec<OutboundChunk>) -> usize {
        if chunks.is_empty() {
            return 0;
        }
        let added = chunks.len();

        let (before, after, overflowed) = {
            let mut queue = self.chunks.lock().unwrap_or_else(|e| e.into_inner());
            let before = queue.len();
            queue.extend(chunks);
            let mut overflowed = 0;
            if let Some(capacity) = self.capacity {
                while queue.len() > capacity {
                    queue.pop_front();
                    overflowed += 1;
                }
            }
            (before, queue.len(), overflowed)
        };

        self.notify.notify_one();

        #[cfg(feature = "metrics")]
        {
            counter!(delivery_metrics::CHUNKS_ENQUEUED_TOTAL).increment(added as u64);
            if overflowed > 0 {
                counter!(delivery_metrics::CHUNKS_OVERFLOWED_TOTAL).increment(overflowed as u64);
            }
            gauge!(delivery_metrics::QUEUE_DEPTH).set(after as f64);
        }

        if overflowed > 0 {
            warn!(
                overflowed,
                capacity = self.capacity,
                "delivery queue full, dropped oldest chunks"
            );
        }
        if self.warn_depth > 0 && before < self.warn_depth && before + added >= self.warn_depth {
            warn!(
                depth = after,
                threshold = self.warn_depth,
                "delivery queue backlog is growing faster than it drains"
            );
        }
        overflowed
    }

    pub fn push(&self, chunk: OutboundChunk) -> usize {
        self.push_all(vec![chunk])
    }

    pub fn try_pop(&self) -> Option<OutboundChunk> {
        let (chunk, _depth) = {
            let mut queue = self.chunks.lock().unwrap_or_else(|e| e.into_inner());
            (queue.pop_front(), queue.len())
        };

        #[cfg(feature = "metrics")]
        if chunk.is_some() {
            gauge!(delivery_metrics::QUEUE_DEPTH).set(_depth as f64);
        }

        chunk
    }

    /// Wait until a chunk is available and take it.
    ///
    /// Cancel-safe: dropping the future never loses a chunk. Intended for a
    /// single consumer.
    pub async fn pop(&self) -> OutboundChunk {
        loop {
            if let Some(chunk) = self.try_pop() {
                return chunk;
            }
            self.notify.notified().await;
        }
    }

    pub fn len(&self) -> usize {
        self.chunks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for DeliveryQueue {
    fn default() -> Self {
        Self::unbounded()
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        chatrelay_channels::{ChatEvent, EventKind, Platform},
        std::{sync::Arc, time::Duration},
    };

    fn chunks(user: &str, text: &str, max_len: usize) -> Vec<OutboundChunk> {
        let event = ChatEvent::new(Platform::Twitch, user, text, EventKind::Message);
        OutboundChunk::split(&event, max_len)
    }

    fn drain(queue: &DeliveryQueue) -> Vec<String> {
        std::iter::from_fn(|| queue.try_pop())
            .map(|c| c.body())
            .collect()
    }

    #[test]
    fn fifo_across_events() {
        let queue = DeliveryQueue::unbounded();
        queue.push_all(chunks("a", "first", 10));
        queue.push_all(chunks("b", "second one", 6));
        queue.push_all(chunks("c", "third", 10));
        assert_eq!(queue.len(), 4);
        assert_eq!(drain(&queue), ["first", "second [1/2]", " one [2/2]", "third"]);
        assert!(queue.is_empty());
    }

    #[test]
    fn capacity_drops_oldest() {
        let queue = DeliveryQueue::new(Some(2), 0);
        queue.push_all(chunks("a", "one", 10));
        queue.push_all(chunks("a", "two", 10));
        assert_eq!(queue.push_all(chunks("a", "three", 10)), 1);
        assert_eq!(drain(&queue), ["two", "three"]);
    }

    #[test]
    fn zero_capacity_means_unbounded() {
        let queue = DeliveryQueue::new(Some(0), 0);
        for i in 0..10 {
            queue.push_all(chunks("a", &format!("m{i}"), 10));
        }
        assert_eq!(queue.len(), 10);
    }

    #[tokio::test]
    async fn pop_waits_for_a_producer() {
        let queue = Arc::new(DeliveryQueue::unbounded());
        let consumer = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.pop().await.body() })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!consumer.is_finished());

        queue.push_all(chunks("a", "wake up", 50));
        let body = tokio::time::timeout(Duration::from_secs(1), consumer)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(body, "wake up");
    }

    #[tokio::test]
    async fn pop_returns_immediately_when_ready() {
        let queue = DeliveryQueue::unbounded();
        queue.push_all(chunks("a", "ready", 50));
        let chunk = tokio::time::timeout(Duration::from_millis(100), queue.pop())
            .await
            .unwrap();
        assert_eq!(chunk.text(), "ready");
    }
}
