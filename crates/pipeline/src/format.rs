//! Human-readable text for platform events.

use chatrelay_channels::{EventFields, EventKind};

/// Render the notification text for an event.
///
/// `Message` returns `text` unchanged. Every other kind uses a fixed template
/// filled from `fields`; a non-empty `text` (resub message, tip note) is
/// appended after a colon.
pub fn format_event(kind: EventKind, fields: &EventFields, text: &str) -> String {
    let headline = match kind {
        EventKind::Message => return text.to_string(),
        EventKind::Subscription => match fields.months {
            Some(months) if months > 1 => format!("⭐ Subscribed for {months} months"),
            _ => "⭐ Subscribed".to_string(),
        },
        EventKind::GiftedSub => match fields.count {
            Some(count) if count > 1 => format!("🎁 Gifted {count} subs"),
            _ => "🎁 Gifted a sub".to_string(),
        },
        EventKind::Tip => match (fields.amount, fields.currency.as_deref()) {
            (Some(amount), Some(currency)) => format!("💸 Tipped {amount} {currency}"),
            (Some(amount), None) => format!("💸 Tipped {amount}"),
            (None, _) => "💸 Tipped".to_string(),
        },
        EventKind::Raid => match fields.viewers {
            Some(viewers) => format!("🚀 Raided with {viewers} viewers"),
            None => "🚀 Raided".to_string(),
        },
        EventKind::Sticker => match fields.sticker.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => format!("🏷️ Sent sticker {name}"),
            _ => "🏷️ Sent a sticker".to_string(),
        },
    };

    let text = text.trim();
    if text.is_empty() {
        headline
    } else {
        format!("{headline}: {text}")
    }
}
