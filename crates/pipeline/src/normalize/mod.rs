//! Raw event → [`ChatEvent`].

pub mod emote;
pub mod platform;
pub mod widget;

use {
    chatrelay_channels::{ChatEvent, EventKind, Fragment, Platform, RawBody, RawEvent},
    tracing::debug,
};

use crate::format::format_event;

/// Display name used when a record carries no user.
pub const UNKNOWN_USER: &str = "Unknown";

#[derive(Debug, Clone, Copy, Default)]
pub struct Normalizer {
    default_platform: Platform,
}

impl Normalizer {
    pub fn new(default_platform: Platform) -> Self {
        Self { default_platform }
    }

    /// Build the canonical event, or `None` when the record should be
    /// dropped: unrecognized kind, or a plain message with no text left
    /// after emote resolution.
    pub fn normalize(&self, raw: RawEvent) -> Option<ChatEvent> {
        let kind = match raw.kind.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
            None => EventKind::Message,
            Some(name) => match EventKind::parse(name) {
                Some(kind) => kind,
                None => {
                    debug!(kind = name, "dropping event of unrecognized kind");
                    return None;
                },
            },
        };

        let platform =
            platform::classify(raw.platform.as_deref(), &raw.markers, self.default_platform);

        let user = raw
            .user
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .unwrap_or(UNKNOWN_USER);

        let body = resolve_body(&raw.body);
        let text = if kind == EventKind::Message {
            if body.is_empty() {
                debug!(%platform, user, "dropping message with no text");
                return None;
            }
            body
        } else {
            format_event(kind, &raw.fields, &body)
        };

        Some(ChatEvent::new(platform, user, text, kind))
    }
}

/// Flatten a body to text, replacing every emote decoration.
fn resolve_body(body: &RawBody) -> String {
    let text = match body {
        RawBody::Text(text) => emote::replace_emote_codes(text),
        RawBody::Fragments(fragments) => fragments
            .iter()
            .map(|fragment| match fragment {
                Fragment::Text { text } => emote::replace_emote_codes(text),
                Fragment::Emote { alt, src } => {
                    emote::emote_placeholder(alt.as_deref(), src.as_deref())
                },
            })
            .collect(),
    };
    text.trim().to_string()
}
