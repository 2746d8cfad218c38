use std::{sync::Arc, time::Duration};

use {
    async_trait::async_trait,
    chatrelay_channels::{Error, EventEmitter, Result, SourceAdapter},
    chatrelay_config::SocketSourceConfig,
    futures::{SinkExt, StreamExt},
    tokio::time::Instant,
    tokio_tungstenite::{connect_async, tungstenite::Message},
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
};

#[cfg(feature = "metrics")]
use chatrelay_metrics::{counter, labels, sources as src_metrics};

use crate::packet::{DEFAULT_PING_INTERVAL, Packet, to_raw_events};

const SOURCE_ID: &str = "socket";

/// Socket.IO event name carrying Streamlabs alerts and chat.
const EVENT_NAME: &str = "event";

/// Upper bound on TCP connect plus websocket upgrade.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Listens to the Streamlabs Socket.IO API over a raw websocket and emits
/// every `event` payload. Reconnects after a fixed delay when the connection
/// drops.
pub struct SocketListener {
    endpoint: String,
    reconnect_delay: Duration,
    connect_timeout: Duration,
}

impl SocketListener {
    pub fn new(config: &SocketSourceConfig) -> Result<Self> {
        let endpoint = config
            .endpoint()
            .ok_or_else(|| Error::invalid_config("socket source needs a token"))?;
        Ok(Self {
            endpoint,
            reconnect_delay: Duration::from_secs(config.reconnect_delay_secs.max(1)),
            connect_timeout: CONNECT_TIMEOUT,
        })
    }

    /// One connection lifetime. `Ok` means the server or `cancel` closed it.
    async fn connect_and_listen(
        &self,
        emitter: &dyn EventEmitter,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let connect = tokio::time::timeout(
            self.connect_timeout,
            connect_async(self.endpoint.as_str()),
        );
        let (ws, _response) = tokio::select! {
            () = cancel.cancelled() => return Ok(()),
            result = connect => result
                .map_err(|e| Error::external("socket handshake timed out", e))?
                .map_err(|e| Error::external("socket connect failed", e))?,
        };
        let (mut ws_sink, mut ws_reader) = ws.split();

        // Engine.IO v3 clients ping; the handshake says how often.
        let mut ping_interval = DEFAULT_PING_INTERVAL;
        let mut next_ping = Instant::now() + ping_interval;

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    let _ = ws_sink.send(Message::Close(None)).await;
                    return Ok(());
                },
                () = tokio::time::sleep_until(next_ping) => {
                    ws_sink
                        .send(Message::Text("2".into()))
                        .await
                        .map_err(|e| Error::external("socket ping failed", e))?;
                    next_ping = Instant::now() + ping_interval;
                },
                msg = ws_reader.next() => {
                    let text = match msg {
                        Some(Ok(Message::Text(text))) => text,
                        Some(Ok(Message::Ping(data))) => {
                            ws_sink
                                .send(Message::Pong(data))
                                .await
                                .map_err(|e| Error::external("socket pong failed", e))?;
                            continue;
                        },
                        Some(Ok(Message::Close(_))) | None => {
                            debug!(source = SOURCE_ID, "socket closed by server");
                            return Ok(());
                        },
                        Some(Ok(_)) => continue,
                        Some(Err(e)) => return Err(Error::external("socket read failed", e)),
                    };

                    match Packet::parse(text.as_str()) {
                        Packet::Open { ping_interval: interval } => {
                            debug!(
                                source = SOURCE_ID,
                                ping_ms = interval.as_millis() as u64,
                                "engine.io open"
                            );
                            ping_interval = interval;
                            next_ping = Instant::now() + ping_interval;
                        },
                        Packet::Connect => info!(source = SOURCE_ID, "connected to Streamlabs socket"),
                        Packet::Ping => {
                            ws_sink
                                .send(Message::Text("3".into()))
                                .await
                                .map_err(|e| Error::external("socket pong failed", e))?;
                        },
                        Packet::Event { name, payload } if name == EVENT_NAME => {
                            let events = to_raw_events(&payload);
                            #[cfg(feature = "metrics")]
                            counter!(src_metrics::RECORDS_RECEIVED_TOTAL, labels::SOURCE => SOURCE_ID)
                                .increment(events.len() as u64);
                            for event in events {
                                emitter.emit(event);
                            }
                        },
                        Packet::Event { name, .. } => {
                            debug!(source = SOURCE_ID, event = %name, "ignoring socket event");
                        },
                        Packet::Error(message) => {
                            return Err(Error::protocol(format!("socket.io error: {message}")));
                        },
                        Packet::Close | Packet::Disconnect => {
                            debug!(source = SOURCE_ID, "socket disconnected by server");
                            return Ok(());
                        },
                        Packet::Pong | Packet::Other => {},
                    }
                },
            }
        }
    }
}

#[async_trait]
impl SourceAdapter for SocketListener {
    fn id(&self) -> &str {
        SOURCE_ID
    }

    async fn run(&self, emitter: Arc<dyn EventEmitter>, cancel: CancellationToken) -> Result<()> {
        info!(source = SOURCE_ID, "starting socket listener");

        loop {
            match self.connect_and_listen(emitter.as_ref(), &cancel).await {
                Ok(()) => debug!(source = SOURCE_ID, "socket connection ended"),
                Err(e) => {
                    #[cfg(feature = "metrics")]
                    counter!(src_metrics::ERRORS_TOTAL, labels::SOURCE => SOURCE_ID).increment(1);
                    warn!(
                        source = SOURCE_ID,
                        error = %e,
                        retry_in_secs = self.reconnect_delay.as_secs(),
                        "socket connection failed"
                    );
                },
            }

            tokio::select! {
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(self.reconnect_delay) => {},
            }
        }

        info!(source = SOURCE_ID, "socket listener stopped");
        Ok(())
    }
}
