mod config_commands;
mod relay;

use std::path::PathBuf;

use {
    anyhow::Context,
    chatrelay_config::RelayConfig,
    clap::{Parser, Subcommand},
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(
    name = "chatrelay",
    version,
    about = "Relay live-stream chat to ntfy notifications"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file (defaults to ./chatrelay.toml, then the user config dir).
    #[arg(long, short, global = true, env = "CHATRELAY_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Address to bind the HTTP server to (overrides config value).
    #[arg(long, global = true)]
    bind: Option<String>,
    /// Port for the HTTP server (overrides config and `PORT`).
    #[arg(long, global = true)]
    port: Option<u16>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the relay (default when no subcommand is provided).
    Run,
    /// Configuration inspection.
    Config {
        #[command(subcommand)]
        action: config_commands::ConfigAction,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

/// File (or discovered defaults), then deployment env vars, then CLI flags.
fn load_config(cli: &Cli) -> anyhow::Result<RelayConfig> {
    let mut config = match &cli.config {
        Some(path) => chatrelay_config::load_config(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => chatrelay_config::discover_and_load(),
    };
    chatrelay_config::apply_env_overrides(&mut config)?;

    if let Some(bind) = &cli.bind {
        config.server.bind.clone_from(bind);
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_telemetry(&cli);

    let config = load_config(&cli)?;

    match cli.command {
        None | Some(Commands::Run) => {
            info!(version = env!("CARGO_PKG_VERSION"), "chatrelay starting");
            relay::run(config).await
        },
        Some(Commands::Config { action }) => config_commands::handle_config(action, &config),
    }
}
