mod cli;
mod energy;
mod error_fmt;
mod node;
mod replay;

use std::path::Path;

use clap::Parser;
use eyre::{Result, WrapErr};
use fuzzyof_config::{Config, Logging};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

use crate::cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

fn main() {
    let _ = color_eyre::install();
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    let result = run(cli);
    flush_file_log();
    if let Err(err) = result {
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", format_error_json(&err));
        } else {
            eprintln!("{}", humanize(&err));
        }
        std::process::exit(exit_code_for_error(&err));
    }
}

/// Statics are never dropped; release the writer guard so queued records land.
fn flush_file_log() {
    if let Ok(mut guard) = FILE_GUARD.lock() {
        drop(guard.take());
    }
}

fn run(cli: Cli) -> Result<()> {
    let cfg = load_config(&cli.config)?;
    init_tracing(cli.json, cli.log_level.as_deref(), &cfg.logging)?;
    tracing::debug!(config = %cli.config.display(), "config loaded");

    match cli.cmd {
        Commands::CheckConfig => check_config(&cfg, &cli.config, cli.json),
        Commands::Replay { trace, summary } => {
            replay::run_replay(&cfg, &trace, summary, cli.json)
        }
        Commands::Energy {
            periods,
            mains_from,
        } => energy::run_energy(&cfg, periods, mains_from, cli.json),
    }
}

fn load_config(path: &Path) -> Result<Config> {
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("read config {}", path.display()))?;
    // Parse the Config TOML text right here
    let cfg: Config = toml::from_str(&text)
        .wrap_err_with(|| format!("parse config TOML {}", path.display()))?;
    cfg.validate().wrap_err("invalid configuration")?;
    Ok(cfg)
}

/// Build the objective function once so that engine-level checks run too.
fn check_config(cfg: &Config, path: &Path, json_out: bool) -> Result<()> {
    let node = node::Node::from_config(cfg).wrap_err("invalid configuration")?;
    if json_out {
        println!(
            "{}",
            serde_json::json!({
                "ok": true,
                "config": path.display().to_string(),
                "objective": node.engine.name(),
                "ocp": node.engine.of().ocp(),
                "neighbors": cfg.neighbors.len(),
            })
        );
    } else {
        println!(
            "config OK: {} (objective {}, {} neighbors)",
            path.display(),
            node.engine.name(),
            cfg.neighbors.len()
        );
    }
    Ok(())
}

/// Console logs go to stderr so stdout stays machine-readable. An optional
/// JSON log file comes from `[logging]`; `RUST_LOG` overrides both levels.
fn init_tracing(json: bool, cli_level: Option<&str>, logging: &Logging) -> Result<()> {
    let level = cli_level
        .or(logging.level.as_deref())
        .unwrap_or("info");
    let filter = match EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => EnvFilter::try_new(level).wrap_err_with(|| format!("invalid log level '{level}'"))?,
    };

    let console = if json {
        fmt::layer().json().with_writer(std::io::stderr).boxed()
    } else {
        fmt::layer()
            .with_target(false)
            .compact()
            .with_writer(std::io::stderr)
            .boxed()
    };

    let file = match logging.file.as_deref() {
        Some(path) => {
            let path = Path::new(path);
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| eyre::eyre!("logging.file must name a file: {}", path.display()))
                .wrap_err("invalid configuration")?;
            let appender = match logging.rotation.as_deref() {
                Some("daily") => tracing_appender::rolling::daily(dir, name),
                Some("hourly") => tracing_appender::rolling::hourly(dir, name),
                _ => tracing_appender::rolling::never(dir, name),
            };
            let (writer, guard) = tracing_appender::non_blocking(appender);
            if let Ok(mut slot) = FILE_GUARD.lock() {
                *slot = Some(guard);
            }
            Some(
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(writer)
                    .boxed(),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init()
        .wrap_err("install tracing subscriber")?;
    Ok(())
}
