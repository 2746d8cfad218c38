//! Semantic validation of a loaded [`RelayConfig`].

use {secrecy::ExposeSecret, url::Url};

use crate::schema::RelayConfig;

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Dotted path, e.g. "relay.max_len"
    pub path: &'static str,
    pub message: String,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}]: {}", self.severity, self.path, self.message)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    fn error(&mut self, path: &'static str, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            severity: Severity::Error,
            path,
            message: message.into(),
        });
    }

    fn warn(&mut self, path: &'static str, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            severity: Severity::Warning,
            path,
            message: message.into(),
        });
    }
}

/// Check a config for values the relay cannot run with.
pub fn validate(config: &RelayConfig) -> ValidationResult {
    let mut result = ValidationResult::default();

    let relay = &config.relay;
    if relay.max_len == 0 {
        result.error("relay.max_len", "must be at least 1");
    }
    if relay.dedup_window_secs == 0 {
        result.warn(
            "relay.dedup_window_secs",
            "0 disables duplicate suppression",
        );
    }
    if relay.send_delay_secs == 0 {
        result.warn(
            "relay.send_delay_secs",
            "0 disables send pacing; the sink may rate-limit",
        );
    }
    if relay.queue_capacity == Some(0) {
        result.error("relay.queue_capacity", "must be at least 1 when set");
    }

    let sink = &config.sink;
    match Url::parse(&sink.endpoint()) {
        Ok(url) if !matches!(url.scheme(), "http" | "https") => {
            result.error("sink.url", format!("unsupported scheme {:?}", url.scheme()));
        },
        Ok(url) if url.path().trim_matches('/').is_empty() => {
            result.error("sink.topic", "no topic configured (set sink.topic or NTFY_TOPIC)");
        },
        Ok(_) => {},
        Err(e) => result.error("sink.url", format!("invalid URL: {e}")),
    }
    if sink.timeout_secs == 0 {
        result.warn("sink.timeout_secs", "0 is raised to 1 second");
    }

    let chatbox = &config.sources.chatbox;
    if chatbox.enabled && chatbox.endpoint().is_none() {
        result.error(
            "sources.chatbox.token",
            "chatbox source enabled without a token or url",
        );
    }
    if chatbox.enabled && chatbox.seen_capacity == 0 {
        result.error("sources.chatbox.seen_capacity", "must be at least 1");
    }

    let socket = &config.sources.socket;
    let socket_token_missing = socket
        .token
        .as_ref()
        .is_none_or(|t| t.expose_secret().is_empty());
    if socket.enabled && socket_token_missing {
        result.error(
            "sources.socket.token",
            "socket source enabled without a token",
        );
    }
    if socket.enabled && !socket.url.starts_with("ws://") && !socket.url.starts_with("wss://") {
        result.error("sources.socket.url", "must be a ws:// or wss:// URL");
    }

    let ingest_available = config.server.enabled && config.server.ingest;
    if !chatbox.enabled && !socket.enabled && !ingest_available {
        result.warn(
            "sources",
            "no source enabled and HTTP ingestion is off; nothing will be relayed",
        );
    }

    result
}
