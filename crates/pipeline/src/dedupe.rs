//! Sliding-window duplicate suppression.

use std::{
    sync::Mutex,
    time::{Duration, Instant},
};

use {
    chatrelay_channels::ChatEvent,
    dashmap::{DashMap, mapref::entry::Entry},
    sha2::{Digest, Sha256},
    tracing::debug,
};

#[cfg(feature = "metrics")]
use chatrelay_metrics::{gauge, pipeline as pipeline_metrics};

/// Content identity of an event: SHA-256 over the length-prefixed
/// `(platform, user, text)` triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DedupKey([u8; 32]);

impl DedupKey {
    pub fn of(event: &ChatEvent) -> Self {
        let mut hasher = Sha256::new();
        for part in [event.platform().as_str(), event.user(), event.text()] {
            hasher.update((part.len() as u64).to_be_bytes());
            hasher.update(part.as_bytes());
        }
        Self(hasher.finalize().into())
    }
}

/// Admits the first occurrence of a triple and suppresses repeats seen less
/// than `window` ago.
///
/// Shared by every adapter, so the same line relayed by two sources counts
/// once. Dead entries are swept at most once per window from `admit`, which
/// keeps every entry younger than `2 × window` while events keep flowing;
/// [`Deduplicator::sweep`] covers idle periods.
pub struct Deduplicator {
    window: Duration,
    entries: DashMap<DedupKey, Instant>,
    last_sweep: Mutex<Option<Instant>>,
}

impl Deduplicator {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            entries: DashMap::new(),
            last_sweep: Mutex::new(None),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// `true` if the event should be relayed. A suppressed event leaves the
    /// entry untouched, so the window is measured from the last admission.
    pub fn admit(&self, event: &ChatEvent, now: Instant) -> bool {
        let key = DedupKey::of(event);
        let admitted = match self.entries.entry(key) {
            Entry::Occupied(mut occupied) => {
                if now.saturating_duration_since(*occupied.get()) < self.window {
                    false
                } else {
                    *occupied.get_mut() = now;
                    true
                }
            },
            Entry::Vacant(vacant) => {
                vacant.insert(now);
                true
            },
        };

        self.sweep_if_due(now);
        admitted
    }

    /// Drop every entry whose window has elapsed. Returns how many were
    /// removed.
    pub fn sweep(&self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, seen| now.saturating_duration_since(*seen) < self.window);
        let removed = before.saturating_sub(self.entries.len());

        *self.last_sweep.lock().unwrap_or_else(|e| e.into_inner()) = Some(now);

        #[cfg(feature = "metrics")]
        gauge!(pipeline_metrics::DEDUP_ENTRIES).set(self.entries.len() as f64);

        if removed > 0 {
            debug!(removed, remaining = self.entries.len(), "swept dedup entries");
        }
        removed
    }

    fn sweep_if_due(&self, now: Instant) {
        let due = {
            let mut last = self.last_sweep.lock().unwrap_or_else(|e| e.into_inner());
            match *last {
                Some(at) => now.saturating_duration_since(at) >= self.window,
                None => {
                    *last = Some(now);
                    false
                },
            }
        };
        if due {
            self.sweep(now);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
