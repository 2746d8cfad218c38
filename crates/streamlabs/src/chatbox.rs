use std::{
    collections::{HashSet, VecDeque},
    sync::{Arc, Mutex},
    time::Duration,
};

use {
    async_trait::async_trait,
    chatrelay_channels::{Error, EventEmitter, RawEvent, Result, SourceAdapter},
    chatrelay_config::ChatboxSourceConfig,
    reqwest::{Client, StatusCode},
    serde::Deserialize,
    serde_json::Value,
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
};

#[cfg(feature = "metrics")]
use chatrelay_metrics::{counter, labels, sources as src_metrics};

const SOURCE_ID: &str = "chatbox";

#[derive(Debug, Default, Deserialize)]
struct ChatboxResponse {
    #[serde(default)]
    messages: Vec<ChatboxMessage>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ChatboxMessage {
    #[serde(rename = "messageId", alias = "message_id", alias = "id")]
    message_id: Option<Value>,
    message: Option<String>,
    from: Option<String>,
    platform: Option<String>,
}

impl ChatboxMessage {
    /// IDs arrive as strings or numbers depending on the platform.
    fn id(&self) -> Option<String> {
        match self.message_id.as_ref()? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// Bounded set of recently seen message IDs (oldest forgotten first).
#[derive(Debug)]
pub struct SeenIds {
    capacity: usize,
    set: HashSet<String>,
    order: VecDeque<String>,
}

impl SeenIds {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            set: HashSet::new(),
            order: VecDeque::new(),
        }
    }

    /// Record `id`; returns `false` if it was already known.
    pub fn insert(&mut self, id: &str) -> bool {
        if self.set.contains(id) {
            return false;
        }
        self.set.insert(id.to_string());
        self.order.push_back(id.to_string());
        while self.order.len() > self.capacity {
            if let Some(old) = self.order.pop_front() {
                self.set.remove(&old);
            }
        }
        true
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Polls the Streamlabs chatbox JSON feed and emits each new message once.
pub struct ChatboxPoller {
    client: Client,
    endpoint: String,
    poll_interval: Duration,
    status_backoff: Duration,
    error_backoff: Duration,
    seen: Mutex<SeenIds>,
}

impl ChatboxPoller {
    pub fn new(config: &ChatboxSourceConfig) -> Result<Self> {
        let endpoint = config
            .endpoint()
            .ok_or_else(|| Error::invalid_config("chatbox source needs a token or url"))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs.max(1)))
            .build()
            .map_err(|e| Error::external("failed to build chatbox HTTP client", e))?;

        Ok(Self {
            client,
            endpoint,
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            status_backoff: Duration::from_millis(config.status_backoff_ms),
            error_backoff: Duration::from_millis(config.error_backoff_ms),
            seen: Mutex::new(SeenIds::new(config.seen_capacity)),
        })
    }

    /// Fetch once and emit unseen messages. Returns how many were emitted.
    ///
    /// A non-200 answer is a [`Error::Protocol`]; transport and decode
    /// failures are [`Error::External`] / [`Error::SerdeJson`].
    pub async fn poll_once(&self, emitter: &dyn EventEmitter) -> Result<usize> {
        let resp = self
            .client
            .get(&self.endpoint)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| Error::external("chatbox request failed", e))?;

        let status = resp.status();
        if status != StatusCode::OK {
            return Err(Error::protocol(format!("chatbox returned HTTP {status}")));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| Error::external("failed to read chatbox response", e))?;
        let data: ChatboxResponse = serde_json::from_slice(&bytes)?;

        #[cfg(feature = "metrics")]
        counter!(src_metrics::RECORDS_RECEIVED_TOTAL, labels::SOURCE => SOURCE_ID)
            .increment(data.messages.len() as u64);

        let fresh: Vec<ChatboxMessage> = {
            let mut seen = self.seen.lock().unwrap_or_else(|e| e.into_inner());
            data.messages
                .into_iter()
                .filter(|msg| msg.id().is_some_and(|id| seen.insert(&id)))
                .collect()
        };

        let mut emitted = 0;
        for msg in fresh {
            let Some(text) = msg.message.filter(|m| !m.trim().is_empty()) else {
                continue;
            };
            emitter.emit(RawEvent::message(
                msg.platform.as_deref(),
                msg.from.as_deref(),
                text,
            ));
            emitted += 1;
        }
        Ok(emitted)
    }

    fn backoff_for(&self, error: &Error) -> Duration {
        match error {
            Error::Protocol { .. } => self.status_backoff,
            _ => self.error_backoff,
        }
    }
}

#[async_trait]
impl SourceAdapter for ChatboxPoller {
    fn id(&self) -> &str {
        SOURCE_ID
    }

    async fn run(&self, emitter: Arc<dyn EventEmitter>, cancel: CancellationToken) -> Result<()> {
        info!(source = SOURCE_ID, "starting chatbox poller");

        loop {
            if cancel.is_cancelled() {
                break;
            }

            let delay = match self.poll_once(emitter.as_ref()).await {
                Ok(count) => {
                    if count > 0 {
                        debug!(source = SOURCE_ID, count, "chatbox messages emitted");
                    }
                    self.poll_interval
                },
                Err(e) => {
                    #[cfg(feature = "metrics")]
                    counter!(src_metrics::ERRORS_TOTAL, labels::SOURCE => SOURCE_ID).increment(1);
                    let delay = self.backoff_for(&e);
                    warn!(
                        source = SOURCE_ID,
                        error = %e,
                        retry_in_ms = delay.as_millis() as u64,
                        "chatbox poll failed"
                    );
                    delay
                },
            };

            tokio::select! {
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(delay) => {},
            }
        }

        info!(source = SOURCE_ID, "chatbox poller stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use {super::*, secrecy::Secret};

    #[derive(Default)]
    struct Collect(Mutex<Vec<RawEvent>>);

    impl EventEmitter for Collect {
        fn emit(&self, event: RawEvent) {
            self.0.lock().unwrap().push(event);
        }
    }

    impl Collect {
        fn texts(&self) -> Vec<String> {
            self.0
                .lock()
                .unwrap()
                .iter()
                .map(|e| match &e.body {
                    chatrelay_channels::RawBody::Text(t) => t.clone(),
                    other => format!("{other:?}"),
                })
                .collect()
        }
    }

    fn poller(server: &mockito::Server) -> ChatboxPoller {
        ChatboxPoller::new(&ChatboxSourceConfig {
            enabled: true,
            url: Some(format!("{}/chatbox", server.url())),
            poll_interval_ms: 10,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn seen_ids_forget_oldest() {
        let mut seen = SeenIds::new(2);
        assert!(seen.insert("a"));
        assert!(!seen.insert("a"));
        assert!(seen.insert("b"));
        assert!(seen.insert("c"));
        assert_eq!(seen.len(), 2);
        assert!(seen.insert("a"), "a was evicted and is new again");
        assert!(!seen.insert("c"));
    }

    #[test]
    fn requires_an_endpoint() {
        let err = ChatboxPoller::new(&ChatboxSourceConfig::default()).err().unwrap();
        assert!(matches!(err, Error::InvalidConfig { .. }));

        let ok = ChatboxPoller::new(&ChatboxSourceConfig {
            token: Some(Secret::new("tok".into())),
            ..Default::default()
        });
        assert!(ok.is_ok());
    }

    #[tokio::test]
    async fn emits_each_message_once() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/chatbox")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                serde_json::json!({
                    "messages": [
                        {"messageId": "m1", "message": "hello", "from": "alice", "platform": "twitch"},
                        {"messageId": 2, "message": "gg [emote:1:KEKW]", "from": "bob"},
                        {"message": "no id"},
                        {"messageId": "m3", "message": "   "}
                    ]
                })
                .to_string(),
            )
            .expect(2)
            .create_async()
            .await;

        let poller = poller(&server);
        let collect = Collect::default();
        assert_eq!(poller.poll_once(&collect).await.unwrap(), 2);
        assert_eq!(poller.poll_once(&collect).await.unwrap(), 0);
        mock.assert_async().await;

        assert_eq!(collect.texts(), ["hello", "gg [emote:1:KEKW]"]);
        let first = collect.0.lock().unwrap()[0].clone();
        assert_eq!(first.platform.as_deref(), Some("twitch"));
        assert_eq!(first.user.as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn non_200_uses_status_backoff() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/chatbox")
            .with_status(503)
            .create_async()
            .await;

        let poller = poller(&server);
        let err = poller.poll_once(&Collect::default()).await.unwrap_err();
        assert!(matches!(err, Error::Protocol { .. }));
        assert_eq!(poller.backoff_for(&err), Duration::from_millis(2_000));
    }

    #[tokio::test]
    async fn only_200_counts_as_success() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/chatbox")
            .with_status(204)
            .create_async()
            .await;

        let poller = poller(&server);
        let err = poller.poll_once(&Collect::default()).await.unwrap_err();
        assert!(matches!(err, Error::Protocol { .. }));
        assert_eq!(poller.backoff_for(&err), Duration::from_millis(2_000));
    }

    #[tokio::test]
    async fn bad_json_uses_error_backoff() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/chatbox")
            .with_status(200)
            .with_body("<html>")
            .create_async()
            .await;

        let poller = poller(&server);
        let err = poller.poll_once(&Collect::default()).await.unwrap_err();
        assert!(matches!(err, Error::SerdeJson(_)));
        assert_eq!(poller.backoff_for(&err), Duration::from_millis(3_000));
    }

    #[tokio::test]
    async fn run_stops_on_cancel() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/chatbox")
            .with_status(200)
            .with_body(r#"{"messages": [{"messageId": "x", "message": "hi"}]}"#)
            .create_async()
            .await;

        let poller = Arc::new(poller(&server));
        let collect = Arc::new(Collect::default());
        let cancel = CancellationToken::new();
        let handle = {
            let poller = Arc::clone(&poller);
            let emitter = Arc::clone(&collect) as Arc<dyn EventEmitter>;
            let cancel = cancel.clone();
            tokio::spawn(async move { poller.run(emitter, cancel).await })
        };

        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel.cancel();
        handle.await.unwrap().unwrap();
        assert_eq!(collect.texts(), ["hi"]);
    }
}
