use std::sync::Arc;

use {
    tokio::task::JoinHandle,
    tokio_util::sync::CancellationToken,
    tracing::{error, info},
};

#[cfg(feature = "metrics")]
use chatrelay_metrics::{gauge, sources as src_metrics};

use crate::adapter::{EventEmitter, SourceAdapter};

/// Registry of configured source adapters.
#[derive(Default)]
pub struct AdapterRegistry {
    adapters: Vec<Arc<dyn SourceAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, adapter: Arc<dyn SourceAdapter>) {
        self.adapters.push(adapter);
    }

    pub fn list(&self) -> Vec<&str> {
        self.adapters.iter().map(|a| a.id()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    /// Spawn one task per adapter. Each task runs until `cancel` fires or the
    /// adapter gives up; a failing adapter never takes the others down.
    pub fn spawn_all(
        &self,
        emitter: Arc<dyn EventEmitter>,
        cancel: &CancellationToken,
    ) -> Vec<JoinHandle<()>> {
        #[cfg(feature = "metrics")]
        gauge!(src_metrics::ACTIVE).set(self.adapters.len() as f64);

        self.adapters
            .iter()
            .map(|adapter| {
                let adapter = Arc::clone(adapter);
                let emitter = Arc::clone(&emitter);
                let cancel = cancel.child_token();
                tokio::spawn(async move {
                    info!(source = adapter.id(), "source adapter starting");
                    match adapter.run(emitter, cancel).await {
                        Ok(()) => info!(source = adapter.id(), "source adapter stopped"),
                        Err(e) => {
                            error!(source = adapter.id(), error = %e, "source adapter failed");
                        },
                    }
                    #[cfg(feature = "metrics")]
                    gauge!(src_metrics::ACTIVE).decrement(1.0);
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{Result, raw::RawEvent},
        async_trait::async_trait,
        std::sync::Mutex,
    };

    struct Collect(Mutex<Vec<RawEvent>>);

    impl EventEmitter for Collect {
        fn emit(&self, event: RawEvent) {
            self.0.lock().unwrap().push(event);
        }
    }

    struct OneShot(&'static str);

    #[async_trait]
    impl SourceAdapter for OneShot {
        fn id(&self) -> &str {
            self.0
        }

        async fn run(&self, emitter: Arc<dyn EventEmitter>, cancel: CancellationToken) -> Result<()> {
            emitter.emit(RawEvent::message(Some("kick"), Some(self.0), "hi"));
            cancel.cancelled().await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn spawn_all_runs_every_adapter_until_cancelled() {
        let mut registry = AdapterRegistry::new();
        registry.register(Arc::new(OneShot("a")));
        registry.register(Arc::new(OneShot("b")));
        assert_eq!(registry.list(), vec!["a", "b"]);

        let sink = Arc::new(Collect(Mutex::new(Vec::new())));
        let cancel = CancellationToken::new();
        let handles = registry.spawn_all(sink.clone(), &cancel);

        while sink.0.lock().unwrap().len() < 2 {
            tokio::task::yield_now().await;
        }
        cancel.cancel();
        for handle in handles {
            handle.await.unwrap();
        }

        let mut users: Vec<_> = sink
            .0
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| e.user.clone())
            .collect();
        users.sort();
        assert_eq!(users, vec!["a", "b"]);
    }
}
