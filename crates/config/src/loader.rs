use std::path::{Path, PathBuf};

use {
    secrecy::Secret,
    tracing::{debug, warn},
};

use crate::{
    error::{Error, Result},
    env_subst::substitute_env,
    schema::RelayConfig,
};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "chatrelay.toml",
    "chatrelay.yaml",
    "chatrelay.yml",
    "chatrelay.json",
];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> Result<RelayConfig> {
    let raw = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&substitute_env(&raw), path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./chatrelay.{toml,yaml,yml,json}`
/// 2. `~/.config/chatrelay/chatrelay.{toml,yaml,yml,json}`
///
/// Returns `RelayConfig::default()` if no file is found or it fails to parse.
pub fn discover_and_load() -> RelayConfig {
    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => return cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    } else {
        debug!("no config file found, using defaults");
    }
    RelayConfig::default()
}

fn find_config_file() -> Option<PathBuf> {
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    let dir = config_dir()?;
    CONFIG_FILENAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.exists())
}

/// Returns the user-global config directory (`~/.config/chatrelay/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "chatrelay").map(|d| d.config_dir().to_path_buf())
}

fn parse_config(raw: &str, path: &Path) -> Result<RelayConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => Err(Error::UnsupportedFormat(ext.to_string())),
    }
}

/// Apply deployment environment variables on top of a loaded config.
///
/// | variable | effect |
/// |---|---|
/// | `NTFY_URL` | sink base URL (or full topic URL) |
/// | `NTFY_TOPIC` | sink topic |
/// | `NTFY_TOKEN` | sink bearer token |
/// | `WIDGET_TOKEN` | chatbox token, enables the chatbox poller |
/// | `CHAT_URL` | full chatbox URL, enables the chatbox poller |
/// | `SOCKET_TOKEN` | socket token, enables the socket listener |
/// | `SEND_DELAY` | seconds between sends |
/// | `DEDUP_WINDOW` | dedup window in seconds |
/// | `MAX_LEN` | max characters per notification |
/// | `PORT` | HTTP server port |
pub fn apply_env_overrides(config: &mut RelayConfig) -> Result<()> {
    apply_env_overrides_with(config, |name| std::env::var(name).ok())
}

pub(crate) fn apply_env_overrides_with(
    config: &mut RelayConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<()> {
    let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(url) = get("NTFY_URL") {
        config.sink.url = url;
    }
    if let Some(topic) = get("NTFY_TOPIC") {
        config.sink.topic = Some(topic);
    }
    if let Some(token) = get("NTFY_TOKEN") {
        config.sink.token = Some(Secret::new(token));
    }
    if let Some(token) = get("WIDGET_TOKEN") {
        config.sources.chatbox.token = Some(Secret::new(token));
        config.sources.chatbox.enabled = true;
    }
    if let Some(url) = get("CHAT_URL") {
        config.sources.chatbox.url = Some(url);
        config.sources.chatbox.enabled = true;
    }
    if let Some(token) = get("SOCKET_TOKEN") {
        config.sources.socket.token = Some(Secret::new(token));
        config.sources.socket.enabled = true;
    }
    if let Some(v) = get("SEND_DELAY") {
        config.relay.send_delay_secs = parse_env("SEND_DELAY", &v)?;
    }
    if let Some(v) = get("DEDUP_WINDOW") {
        config.relay.dedup_window_secs = parse_env("DEDUP_WINDOW", &v)?;
    }
    if let Some(v) = get("MAX_LEN") {
        config.relay.max_len = parse_env("MAX_LEN", &v)?;
    }
    if let Some(v) = get("PORT") {
        config.server.port = parse_env("PORT", &v)?;
    }
    Ok(())
}

fn parse_env<T>(name: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| Error::invalid_env(name, format!("{value:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use {super::*, secrecy::ExposeSecret, std::collections::HashMap};

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn load_toml_with_env_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chatrelay.toml");
        std::fs::write(
            &path,
            "[relay]\nmax_len = 64\n\n[sink]\ntopic = \"${CHATRELAY_TEST_UNSET_TOPIC:-fallback-topic}\"\n",
        )
        .unwrap();

        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.relay.max_len, 64);
        assert_eq!(cfg.sink.topic.as_deref(), Some("fallback-topic"));
    }

    #[test]
    fn load_yaml_and_json() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = dir.path().join("chatrelay.yaml");
        std::fs::write(&yaml, "relay:\n  send_delay_secs: 2\n").unwrap();
        assert_eq!(load_config(&yaml).unwrap().relay.send_delay_secs, 2);

        let json = dir.path().join("chatrelay.json");
        std::fs::write(&json, r#"{"relay": {"dedup_window_secs": 9}}"#).unwrap();
        assert_eq!(load_config(&json).unwrap().relay.dedup_window_secs, 9);
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chatrelay.ini");
        std::fs::write(&path, "x=1").unwrap();
        assert!(matches!(
            load_config(&path),
            Err(Error::UnsupportedFormat(ext)) if ext == "ini"
        ));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = load_config(Path::new("/nonexistent/chatrelay.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/chatrelay.toml"));
    }

    #[test]
    fn env_overrides_apply() {
        let mut cfg = RelayConfig::default();
        apply_env_overrides_with(
            &mut cfg,
            env(&[
                ("NTFY_TOPIC", "streamchats123"),
                ("WIDGET_TOKEN", "widget-tok"),
                ("SEND_DELAY", "3"),
                ("MAX_LEN", " 80 "),
                ("PORT", "9090"),
            ]),
        )
        .unwrap();

        assert_eq!(cfg.sink.endpoint(), "https://ntfy.sh/streamchats123");
        assert!(cfg.sources.chatbox.enabled);
        assert_eq!(
            cfg.sources.chatbox.token.as_ref().unwrap().expose_secret(),
            "widget-tok"
        );
        assert!(!cfg.sources.socket.enabled);
        assert_eq!(cfg.relay.send_delay_secs, 3);
        assert_eq!(cfg.relay.max_len, 80);
        assert_eq!(cfg.server.port, 9090);
    }

    #[test]
    fn blank_env_values_are_ignored() {
        let mut cfg = RelayConfig::default();
        apply_env_overrides_with(&mut cfg, env(&[("NTFY_TOPIC", "  ")])).unwrap();
        assert!(cfg.sink.topic.is_none());
    }

    #[test]
    fn invalid_number_is_an_error() {
        let mut cfg = RelayConfig::default();
        let err = apply_env_overrides_with(&mut cfg, env(&[("DEDUP_WINDOW", "soon")])).unwrap_err();
        assert!(err.to_string().contains("DEDUP_WINDOW"));
    }
}
