//! Chat widget DOM rows.
//!
//! The in-page observer serializes each new widget row into a [`WidgetNode`]
//! and posts it to the relay. Rows without a `data-from` attribute are not
//! chat messages (alerts, separators, system notices) and are skipped.

use {
    chatrelay_channels::{Fragment, RawBody, RawEvent},
    serde::{Deserialize, Serialize},
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WidgetNode {
    /// Value of the row's `data-from` attribute (the chatter's name).
    #[serde(rename = "data-from", alias = "from")]
    pub from: Option<String>,
    /// `src` of every platform badge image in the row.
    pub platform_icons: Vec<String>,
    /// Rendered message content in document order.
    pub fragments: Vec<Fragment>,
}

impl WidgetNode {
    /// Convert to a [`RawEvent`], or `None` when the row is not a chat
    /// message (no `data-from`, or an empty one).
    pub fn into_raw_event(self) -> Option<RawEvent> {
        let from = self.from.filter(|from| !from.is_empty())?;
        Some(RawEvent {
            markers: self.platform_icons,
            user: Some(from),
            body: RawBody::Fragments(self.fragments),
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_without_data_from_is_skipped() {
        let node = WidgetNode {
            platform_icons: vec!["https://cdn/kick.svg".into()],
            fragments: vec![Fragment::Text { text: "hi".into() }],
            ..Default::default()
        };
        assert!(node.into_raw_event().is_none());
    }

    #[test]
    fn empty_data_from_is_not_chat() {
        let node: WidgetNode = serde_json::from_str(
            r#"{"data-from": "", "fragments": [{"type": "text", "text": "hi"}]}"#,
        )
        .unwrap();
        assert!(node.into_raw_event().is_none());
    }

    #[test]
    fn icons_become_markers() {
        let node: WidgetNode = serde_json::from_str(
            r#"{
                "data-from": "alice",
                "platform_icons": ["https://cdn/platforms/youtube.svg"],
                "fragments": [
                    {"type": "text", "text": "nice "},
                    {"type": "emote", "alt": ":fire:"}
                ]
            }"#,
        )
        .unwrap();
        let raw = node.into_raw_event().unwrap();
        assert_eq!(raw.markers, vec!["https://cdn/platforms/youtube.svg"]);
        assert_eq!(raw.user.as_deref(), Some("alice"));
        assert!(matches!(raw.body, RawBody::Fragments(ref f) if f.len() == 2));
    }
}
