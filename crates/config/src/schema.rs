/// Config schema types (relay tuning, sink, sources, server, metrics).
use {
    chatrelay_channels::Platform,
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub server: ServerConfig,
    pub relay: RelaySettings,
    pub sink: SinkConfig,
    pub sources: SourcesConfig,
    pub metrics: MetricsConfig,
}

/// HTTP surface (health, metrics, widget ingestion).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub enabled: bool,
    pub bind: String,
    pub port: u16,
    /// Accept raw events and widget nodes over `POST /ingest`.
    pub ingest: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind: "0.0.0.0".into(),
            port: 8080,
            ingest: true,
        }
    }
}

/// When the delivery worker sleeps `send_delay_secs` after a send.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DelayPolicy {
    /// Sleep only when more chunks are already waiting.
    #[default]
    Backlog,
    /// Sleep after every send.
    Always,
}

/// Pipeline tuning: dedup horizon, chunk size, pacing, queue bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelaySettings {
    /// Minimum pause between consecutive sink calls (seconds).
    pub send_delay_secs: u64,
    pub delay_policy: DelayPolicy,
    /// Identical (platform, user, text) triples inside this window are
    /// delivered once (seconds).
    pub dedup_window_secs: u64,
    /// Maximum characters per notification before splitting.
    pub max_len: usize,
    /// Drop the oldest queued chunk once this many are waiting. `None` keeps
    /// the queue unbounded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue_capacity: Option<usize>,
    /// Queue depth at which a backlog warning is logged.
    pub queue_warn_depth: usize,
    /// Platform assumed when an event carries neither a tag nor a marker.
    pub default_platform: Platform,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            send_delay_secs: 5,
            delay_policy: DelayPolicy::default(),
            dedup_window_secs: 5,
            max_len: 123,
            queue_capacity: None,
            queue_warn_depth: 500,
            default_platform: Platform::Facebook,
        }
    }
}

/// ntfy-compatible push endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    /// Server base URL, or the full topic URL when `topic` is unset.
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    /// Bearer token for protected topics.
    #[serde(
        serialize_with = "serialize_secret_redacted",
        skip_serializing_if = "Option::is_none"
    )]
    pub token: Option<Secret<String>>,
    /// ntfy priority header (`min`, `low`, `default`, `high`, `max`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    pub tags: Vec<String>,
    /// HTTP timeout for a single publish.
    pub timeout_secs: u64,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            url: "https://ntfy.sh".into(),
            topic: None,
            token: None,
            priority: None,
            tags: Vec::new(),
            timeout_secs: 10,
        }
    }
}

impl SinkConfig {
    /// Full publish URL (`{url}/{topic}` or `url` alone).
    pub fn endpoint(&self) -> String {
        match self.topic.as_deref().map(str::trim) {
            Some(topic) if !topic.is_empty() => {
                format!("{}/{}", self.url.trim_end_matches('/'), topic)
            },
            _ => self.url.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub chatbox: ChatboxSourceConfig,
    pub socket: SocketSourceConfig,
}

/// Streamlabs chatbox widget JSON poller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatboxSourceConfig {
    pub enabled: bool,
    /// Widget token; used to build the chatbox URL.
    #[serde(
        serialize_with = "serialize_secret_redacted",
        skip_serializing_if = "Option::is_none"
    )]
    pub token: Option<Secret<String>>,
    /// Full chatbox URL, overriding the token-derived one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub poll_interval_ms: u64,
    /// Wait after a non-200 response.
    pub status_backoff_ms: u64,
    /// Wait after a transport or decode error.
    pub error_backoff_ms: u64,
    pub request_timeout_secs: u64,
    /// How many message IDs to remember for adapter-level dedup.
    pub seen_capacity: usize,
}

impl Default for ChatboxSourceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            token: None,
            url: None,
            poll_interval_ms: 1_000,
            status_backoff_ms: 2_000,
            error_backoff_ms: 3_000,
            request_timeout_secs: 5,
            seen_capacity: 4_096,
        }
    }
}

impl ChatboxSourceConfig {
    pub fn endpoint(&self) -> Option<String> {
        if let Some(url) = self.url.as_deref().filter(|u| !u.trim().is_empty()) {
            return Some(url.to_string());
        }
        let token = self.token.as_ref()?.expose_secret();
        if token.is_empty() {
            return None;
        }
        Some(format!(
            "https://streamlabs.com/widgets/frame/chatbox/custom?type=desktop&token={token}&format=json"
        ))
    }
}

/// Streamlabs Socket.IO event API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SocketSourceConfig {
    pub enabled: bool,
    #[serde(
        serialize_with = "serialize_secret_redacted",
        skip_serializing_if = "Option::is_none"
    )]
    pub token: Option<Secret<String>>,
    /// Socket server base URL (ws/wss).
    pub url: String,
    pub reconnect_delay_secs: u64,
}

impl Default for SocketSourceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            token: None,
            url: "wss://sockets.streamlabs.com".into(),
            reconnect_delay_secs: 5,
        }
    }
}

impl SocketSourceConfig {
    /// Engine.IO v3 websocket URL for the configured token.
    pub fn endpoint(&self) -> Option<String> {
        let token = self.token.as_ref()?.expose_secret();
        if token.is_empty() {
            return None;
        }
        Some(format!(
            "{}/socket.io/?token={token}&EIO=3&transport=websocket",
            self.url.trim_end_matches('/')
        ))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
}

fn serialize_secret_redacted<S: serde::Serializer>(
    secret: &Option<Secret<String>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match secret {
        Some(_) => serializer.serialize_str("[REDACTED]"),
        None => serializer.serialize_none(),
    }
}
