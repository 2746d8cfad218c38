use chatrelay_channels::Platform;

/// Marker substrings checked against icon sources and class names, in
/// priority order. The first marker found in any of the event's markers wins.
pub const PLATFORM_MARKERS: &[(&str, Platform)] = &[
    ("kick", Platform::Kick),
    ("youtube", Platform::YouTube),
    ("twitch", Platform::Twitch),
    ("facebook", Platform::Facebook),
];

/// Resolve the platform of one raw event.
///
/// An explicit tag that parses takes precedence; then the marker table; then
/// `default`.
pub fn classify(explicit: Option<&str>, markers: &[String], default: Platform) -> Platform {
    if let Some(platform) = explicit.and_then(Platform::parse) {
        return platform;
    }

    let lowered: Vec<String> = markers.iter().map(|m| m.to_ascii_lowercase()).collect();
    PLATFORM_MARKERS
        .iter()
        .find(|(marker, _)| lowered.iter().any(|m| m.contains(marker)))
        .map_or(default, |(_, platform)| *platform)
}

#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    fn markers(list: &[&str]) -> Vec<String> {
        list.iter().map(|m| (*m).to_string()).collect()
    }

    #[rstest]
    #[case(Some("twitch"), &["https://cdn/kick.svg"], Platform::Twitch)]
    #[case(Some("myspace"), &["https://cdn/icons/YouTube.png"], Platform::YouTube)]
    #[case(None, &["https://cdn/icons/twitch.svg", "platform-kick"], Platform::Kick)]
    #[case(None, &["https://static.xx.fbcdn.net/facebook-logo.png"], Platform::Facebook)]
    #[case(None, &["https://cdn/icons/unknown.svg"], Platform::Facebook)]
    #[case(None, &[], Platform::Facebook)]
    fn resolves_in_priority_order(
        #[case] explicit: Option<&str>,
        #[case] list: &[&str],
        #[case] expected: Platform,
    ) {
        assert_eq!(classify(explicit, &markers(list), Platform::Facebook), expected);
    }

    #[test]
    fn fallback_is_configurable() {
        assert_eq!(classify(None, &[], Platform::Unknown), Platform::Unknown);
    }
}
