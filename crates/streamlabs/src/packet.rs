//! Engine.IO v3 / Socket.IO v2 text frames and Streamlabs event payloads.
//!
//! Frame layout: one Engine.IO type digit, then for `4` (message) one
//! Socket.IO type digit, an optional `/namespace,`, an optional ack id and a
//! JSON body. Only the pieces the listener needs are decoded.

use std::time::Duration;

use {
    chatrelay_channels::{EventFields, RawEvent},
    serde_json::Value,
};

/// Default Engine.IO ping interval when the handshake omits it.
pub const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(25);

/// A decoded text frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    /// `0{...}` handshake.
    Open { ping_interval: Duration },
    /// `1`
    Close,
    /// `2` (server-initiated ping; answered with `3`).
    Ping,
    /// `3`
    Pong,
    /// `40`
    Connect,
    /// `41`
    Disconnect,
    /// `42["name", payload]`
    Event { name: String, payload: Value },
    /// `44...`
    Error(String),
    /// Anything else (noop, upgrade, binary placeholders, malformed).
    Other,
}

impl Packet {
    pub fn parse(frame: &str) -> Self {
        let mut chars = frame.chars();
        match chars.next() {
            Some('0') => Self::Open {
                ping_interval: parse_ping_interval(chars.as_str()),
            },
            Some('1') => Self::Close,
            Some('2') => Self::Ping,
            Some('3') => Self::Pong,
            Some('4') => parse_message(chars.as_str()),
            _ => Self::Other,
        }
    }
}

fn parse_ping_interval(json: &str) -> Duration {
    serde_json::from_str::<Value>(json)
        .ok()
        .and_then(|v| v.get("pingInterval").and_then(Value::as_u64))
        .filter(|ms| *ms > 0)
        .map_or(DEFAULT_PING_INTERVAL, Duration::from_millis)
}

fn parse_message(rest: &str) -> Packet {
    let mut chars = rest.chars();
    let kind = chars.next();
    let mut body = chars.as_str();

    // Optional "/namespace," prefix.
    if body.starts_with('/') {
        body = body.split_once(',').map_or("", |(_, after)| after);
    }
    // Optional ack id.
    body = body.trim_start_matches(|c: char| c.is_ascii_digit());

    match kind {
        Some('0') => Packet::Connect,
        Some('1') => Packet::Disconnect,
        Some('2') => parse_event(body),
        Some('4') => Packet::Error(body.to_string()),
        _ => Packet::Other,
    }
}

fn parse_event(body: &str) -> Packet {
    let Ok(Value::Array(mut items)) = serde_json::from_str::<Value>(body) else {
        return Packet::Other;
    };
    if items.is_empty() {
        return Packet::Other;
    }
    let Value::String(name) = items.remove(0) else {
        return Packet::Other;
    };
    let payload = if items.is_empty() {
        Value::Null
    } else {
        items.remove(0)
    };
    Packet::Event { name, payload }
}

/// Map a Streamlabs event `type` to a chat event kind name.
///
/// Unlisted types are passed through unchanged; the normalizer drops the
/// ones it doesn't recognize.
pub fn map_event_type(event_type: &str) -> &str {
    match event_type {
        "chat_message" | "message" => "Message",
        "donation" | "superchat" | "bits" => "Tip",
        "subscription" | "resub" => "Subscription",
        "subMysteryGift" | "subgift" => "GiftedSub",
        "raid" => "Raid",
        "sticker" | "superSticker" => "Sticker",
        other => other,
    }
}

/// Convert one `event` payload into raw events.
///
/// `message` is either a plain string (chat) or an array of per-user records
/// (alerts); each record becomes one event. Payloads without a `type` yield
/// nothing.
pub fn to_raw_events(payload: &Value) -> Vec<RawEvent> {
    let Some(event_type) = payload.get("type").and_then(Value::as_str) else {
        return Vec::new();
    };
    let kind = map_event_type(event_type);
    let platform = payload.get("for").and_then(Value::as_str);

    match payload.get("message") {
        Some(Value::String(text)) => {
            let user = user_of(payload);
            vec![RawEvent::message(platform, user, text.as_str()).with_kind(kind)]
        },
        Some(Value::Array(records)) => records
            .iter()
            .filter(|record| record.is_object())
            .map(|record| {
                let text = record
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                RawEvent::message(platform, user_of(record), text)
                    .with_kind(kind)
                    .with_fields(fields_of(event_type, record))
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn user_of(record: &Value) -> Option<&str> {
    ["from", "display_name", "name"]
        .iter()
        .find_map(|key| record.get(key).and_then(Value::as_str))
        .filter(|s| !s.trim().is_empty())
}

fn number(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn fields_of(event_type: &str, record: &Value) -> EventFields {
    let get = |key: &str| record.get(key);
    let text = |key: &str| get(key).and_then(Value::as_str).map(str::to_string);

    let mut fields = EventFields::default();
    match event_type {
        "donation" => {
            fields.amount = number(get("amount"));
            fields.currency = text("currency");
        },
        "superchat" => {
            // YouTube reports super chat amounts in micros.
            fields.amount = number(get("amount")).map(|micros| micros / 1_000_000.0);
            fields.currency = text("currency");
        },
        "bits" => {
            fields.amount = number(get("amount"));
            fields.currency = Some("bits".to_string());
        },
        "subscription" | "resub" => {
            fields.months = number(get("months")).map(|m| m as u32);
        },
        "subMysteryGift" | "subgift" => {
            fields.count = number(get("amount").or_else(|| get("count"))).map(|c| c as u32);
        },
        "raid" => {
            fields.viewers = number(get("raiders").or_else(|| get("viewers"))).map(|v| v as u64);
        },
        "sticker" | "superSticker" => {
            fields.sticker = text("sticker").or_else(|| text("sticker_name"));
        },
        _ => {},
    }
    fields
}
