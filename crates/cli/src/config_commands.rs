use {anyhow::Result, clap::Subcommand};

use chatrelay_config::{RelayConfig, Severity, validate};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Validate the effective configuration and report errors/warnings.
    Check,
    /// Print the effective configuration as TOML (secrets redacted).
    Show,
}

pub fn handle_config(action: ConfigAction, config: &RelayConfig) -> Result<()> {
    match action {
        ConfigAction::Check => check(config),
        ConfigAction::Show => show(config),
    }
}

/// ANSI color codes.
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

fn check(config: &RelayConfig) -> Result<()> {
    let result = validate(config);

    for d in &result.diagnostics {
        let (color, label) = match d.severity {
            Severity::Error => (RED, "error"),
            Severity::Warning => (YELLOW, "warning"),
        };
        eprintln!("  {BOLD}{color}{label}{RESET} {}: {}", d.path, d.message);
    }

    let errors = count(&result.diagnostics, Severity::Error);
    let warnings = count(&result.diagnostics, Severity::Warning);

    if !result.diagnostics.is_empty() {
        eprintln!();
    }

    if errors == 0 && warnings == 0 {
        eprintln!("No issues found.");
    } else {
        eprintln!("{errors} error(s), {warnings} warning(s)");
    }

    if errors > 0 {
        std::process::exit(1);
    }

    Ok(())
}

fn count(diagnostics: &[chatrelay_config::Diagnostic], severity: Severity) -> usize {
    diagnostics.iter().filter(|d| d.severity == severity).count()
}

fn show(config: &RelayConfig) -> Result<()> {
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}
