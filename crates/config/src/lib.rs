//! Configuration loading, env substitution, overrides and validation.
//!
//! Config files: `chatrelay.toml`, `chatrelay.yaml`, `chatrelay.yml` or
//! `chatrelay.json`, searched in `./` then the user config directory.
//!
//! String values support `${ENV_VAR}` and `${ENV_VAR:-fallback}`
//! substitution. The deployment-style environment variables (`NTFY_TOPIC`,
//! `WIDGET_TOKEN`, `SEND_DELAY`, ...) are applied on top of the file by
//! [`apply_env_overrides`].

pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    error::{Error, Result},
    loader::{apply_env_overrides, config_dir, discover_and_load, load_config},
    schema::{
        ChatboxSourceConfig, DelayPolicy, MetricsConfig, RelayConfig, RelaySettings,
        ServerConfig, SinkConfig, SocketSourceConfig, SourcesConfig,
    },
    validate::{Diagnostic, Severity, ValidationResult, validate},
};
