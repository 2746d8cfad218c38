use chatrelay_channels::{ChatEvent, Platform};

/// Split `text` into consecutive pieces of at most `max_len` characters.
///
/// Text that fits is returned whole. Concatenating the pieces always yields
/// the input. A zero `max_len` yields nothing.
pub fn chunk_text(text: &str, max_len: usize) -> Vec<String> {
    if max_len == 0 {
        return Vec::new();
    }

    if text.chars().count() <= max_len {
        return vec![text.to_string()];
    }

    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(max_len)
        .map(|piece| piece.iter().collect())
        .collect()
}

/// One addressed piece of an admitted event, waiting for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundChunk {
    platform: Platform,
    user: String,
    text: String,
    index: usize,
    total: usize,
}

impl OutboundChunk {
    /// Chunk an event's text into addressed pieces, numbered from 1.
    pub fn split(event: &ChatEvent, max_len: usize) -> Vec<Self> {
        let pieces = chunk_text(event.text(), max_len);
        let total = pieces.len();
        pieces
            .into_iter()
            .enumerate()
            .map(|(i, text)| Self {
                platform: event.platform(),
                user: event.user().to_string(),
                text,
                index: i + 1,
                total,
            })
            .collect()
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

    /// 1-based position within the event.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Notification title: `[Platform] user`.
    pub fn title(&self) -> String {
        format!("[{}] {}", self.platform, self.user)
    }

    /// Notification body. Multi-part events get an ` [i/N]` suffix.
    pub fn body(&self) -> String {
        if self.total > 1 {
            format!("{} [{}/{}]", self.text, self.index, self.total)
        } else {
            self.text.clone()
        }
    }
}
