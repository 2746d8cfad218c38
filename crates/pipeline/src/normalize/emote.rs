//! Emote decoration resolution.
//!
//! Two encodings reach the relay: bracketed codes embedded in plain text
//! (`[emote:37226:KEKW]`, as sent by Kick) and image emotes scraped from a
//! widget (`<img alt=... src=...>`). Both collapse to a `:Name:` style
//! placeholder, or to the emoji itself when the label is a known shortcode.

const CODE_PREFIX: &str = "[emote:";

/// Placeholder used when an image emote has neither a label nor a usable
/// file name.
pub const FALLBACK_PLACEHOLDER: &str = ":EMOTE:";

/// Shortcodes that platforms use as alt text for standard emoji.
const KNOWN_EMOJI: &[(&str, &str)] = &[
    (":heart:", "❤️"),
    (":fire:", "🔥"),
    (":joy:", "😂"),
    (":thumbsup:", "👍"),
    (":clap:", "👏"),
    (":100:", "💯"),
    (":smile:", "😄"),
    (":cry:", "😢"),
    (":wave:", "👋"),
    (":pray:", "🙏"),
];

/// Replace every `[emote:<id>:<Name>]` code with `:<Name>:`.
///
/// Malformed codes (non-numeric id, empty name, missing `]`) are left as-is.
pub fn replace_emote_codes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find(CODE_PREFIX) {
        out.push_str(&rest[..start]);
        let after = &rest[start + CODE_PREFIX.len()..];

        match parse_code(after) {
            Some((name, consumed)) => {
                out.push(':');
                out.push_str(name);
                out.push(':');
                rest = &after[consumed..];
            },
            None => {
                out.push('[');
                rest = &rest[start + 1..];
            },
        }
    }

    out.push_str(rest);
    out
}

/// Parse `<id>:<Name>]` and return the name plus the bytes consumed.
fn parse_code(s: &str) -> Option<(&str, usize)> {
    let close = s.find(']')?;
    let (id, name) = s[..close].split_once(':')?;
    if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let name = name.trim();
    if name.is_empty() || name.contains('[') {
        return None;
    }
    Some((name, close + 1))
}

/// Textual stand-in for an image emote.
///
/// Preference order: the alt label (mapped to an emoji when it is a known
/// shortcode), then `:TOKEN:` derived from the image file name, then
/// [`FALLBACK_PLACEHOLDER`].
pub fn emote_placeholder(alt: Option<&str>, src: Option<&str>) -> String {
    if let Some(alt) = alt.map(str::trim).filter(|a| !a.is_empty()) {
        return known_emoji(alt).map_or_else(|| alt.to_string(), str::to_string);
    }
    match src.and_then(token_from_src) {
        Some(token) => format!(":{token}:"),
        None => FALLBACK_PLACEHOLDER.to_string(),
    }
}

fn known_emoji(label: &str) -> Option<&'static str> {
    KNOWN_EMOJI
        .iter()
        .find(|(code, _)| code.eq_ignore_ascii_case(label))
        .map(|(_, emoji)| *emoji)
}

/// `https://cdn/emotes/Pog-Champ.v2.png?x=1` → `POG-CHAMP`
fn token_from_src(src: &str) -> Option<String> {
    let path = src.split(['?', '#']).next().unwrap_or_default();
    let file = path.rsplit('/').next().unwrap_or_default();
    let stem = file.split('.').next().unwrap_or_default();
    let token: String = stem
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect::<String>()
        .to_ascii_uppercase();
    (!token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    #[rstest]
    #[case("gg [emote:37226:KEKW]", "gg :KEKW:")]
    #[case("[emote:1:a][emote:2:b]", ":a::b:")]
    #[case("no codes here", "no codes here")]
    #[case("[emote:x:Name] stays", "[emote:x:Name] stays")]
    #[case("[emote:12:] stays", "[emote:12:] stays")]
    #[case("open [emote:12:Name", "open [emote:12:Name")]
    #[case("[[emote:5:Pog]]", "[:Pog:]")]
    #[case("héllo [emote:9:Ünï] ✓", "héllo :Ünï: ✓")]
    fn bracketed_codes(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(replace_emote_codes(input), expected);
    }

    #[rstest]
    #[case(Some("PogChamp"), None, "PogChamp")]
    #[case(Some(":heart:"), Some("https://x/heart.png"), "❤️")]
    #[case(Some(":FIRE:"), None, "🔥")]
    #[case(Some("  "), Some("https://cdn.example/emotes/kekw.png"), ":KEKW:")]
    #[case(None, Some("https://cdn.example/e/Pog-Champ.v2.webp?size=2"), ":POG-CHAMP:")]
    #[case(None, Some("https://cdn.example/e/%%%.png"), ":EMOTE:")]
    #[case(None, None, ":EMOTE:")]
    fn image_placeholders(
        #[case] alt: Option<&str>,
        #[case] src: Option<&str>,
        #[case] expected: &str,
    ) {
        assert_eq!(emote_placeholder(alt, src), expected);
    }
}
