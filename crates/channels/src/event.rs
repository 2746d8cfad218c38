use std::fmt;

use serde::{Deserialize, Serialize};

/// Streaming platform a chat event originated from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Kick,
    #[serde(alias = "yt")]
    YouTube,
    Twitch,
    #[serde(alias = "fb")]
    Facebook,
    #[default]
    Unknown,
}

impl Platform {
    /// Parse a platform tag as sent by adapters (case-insensitive).
    ///
    /// Streamlabs account suffixes such as `twitch_account` are accepted.
    pub fn parse(tag: &str) -> Option<Self> {
        let tag = tag.trim().to_ascii_lowercase();
        let tag = tag.strip_suffix("_account").unwrap_or(&tag);
        match tag {
            "kick" => Some(Self::Kick),
            "youtube" | "yt" => Some(Self::YouTube),
            "twitch" => Some(Self::Twitch),
            "facebook" | "fb" => Some(Self::Facebook),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Kick => "Kick",
            Self::YouTube => "YouTube",
            Self::Twitch => "Twitch",
            Self::Facebook => "Facebook",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened in chat: a plain message or a platform event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    #[default]
    Message,
    Subscription,
    GiftedSub,
    Tip,
    Raid,
    Sticker,
}

impl EventKind {
    /// Parse a kind name. Unrecognized names return `None` and the event is
    /// dropped upstream, so new platform event types never break ingestion.
    pub fn parse(name: &str) -> Option<Self> {
        let normalized: String = name
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "message" => Some(Self::Message),
            "subscription" => Some(Self::Subscription),
            "giftedsub" => Some(Self::GiftedSub),
            "tip" => Some(Self::Tip),
            "raid" => Some(Self::Raid),
            "sticker" => Some(Self::Sticker),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Message => "Message",
            Self::Subscription => "Subscription",
            Self::GiftedSub => "GiftedSub",
            Self::Tip => "Tip",
            Self::Raid => "Raid",
            Self::Sticker => "Sticker",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured values carried by non-message events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventFields {
    /// Subscription streak length.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub months: Option<u32>,
    /// Number of gifted subscriptions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    /// Tip amount in `currency` units.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    /// Raid party size.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub viewers: Option<u64>,
    /// Sticker display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sticker: Option<String>,
}

/// Canonical chat event produced by the normalizer.
///
/// Immutable once built; the pipeline consumes it by value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatEvent {
    platform: Platform,
    user: String,
    text: String,
    kind: EventKind,
}

impl ChatEvent {
    pub fn new(
        platform: Platform,
        user: impl Into<String>,
        text: impl Into<String>,
        kind: EventKind,
    ) -> Self {
        Self {
            platform,
            user: user.into(),
            text: text.into(),
            kind,
        }
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }
}
