use serde::{Deserialize, Serialize};

use crate::event::EventFields;

/// One raw record as discovered by a source adapter, before normalization.
///
/// Every field is optional on the wire; the normalizer substitutes defaults
/// (`"Unknown"` user, `Message` kind, configured platform).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawEvent {
    /// Explicit platform tag, if the source knows it.
    pub platform: Option<String>,
    /// Platform markers (icon URLs, CSS classes) used when no tag is given.
    pub markers: Vec<String>,
    pub user: Option<String>,
    pub body: RawBody,
    /// Event kind name; absent means a plain chat message.
    pub kind: Option<String>,
    pub fields: EventFields,
}

impl RawEvent {
    /// Plain-text chat message.
    pub fn message(platform: Option<&str>, user: Option<&str>, text: impl Into<String>) -> Self {
        Self {
            platform: platform.map(str::to_owned),
            user: user.map(str::to_owned),
            body: RawBody::Text(text.into()),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    #[must_use]
    pub fn with_fields(mut self, fields: EventFields) -> Self {
        self.fields = fields;
        self
    }

    #[must_use]
    pub fn with_markers(mut self, markers: Vec<String>) -> Self {
        self.markers = markers;
        self
    }
}

/// Message payload: either flat text (possibly with bracketed emote codes)
/// or a sequence of rendered fragments scraped from a chat widget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawBody {
    Text(String),
    Fragments(Vec<Fragment>),
}

impl Default for RawBody {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

/// A piece of a rendered chat line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Fragment {
    Text {
        text: String,
    },
    /// Image-based emote; `alt` is the human label, `src` the image URL.
    Emote {
        #[serde(default)]
        alt: Option<String>,
        #[serde(default)]
        src: Option<String>,
    },
}
