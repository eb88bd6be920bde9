//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};

/// Flush guard of the non-blocking file writer; taken and dropped before exit.
pub static FILE_GUARD: Mutex<Option<tracing_appender::non_blocking::WorkerGuard>> =
    Mutex::new(None);
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(
    name = "fuzzyof",
    version,
    about = "Fuzzy multi-metric RPL objective function: trace replay and energy simulation"
)]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/fuzzyof.toml")]
    pub config: PathBuf,

    /// Print JSON lines instead of text (also for errors)
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); overrides logging.level
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate the config and the objective function built from it
    CheckConfig,
    /// Replay a transmission trace against the configured neighbors
    Replay {
        /// Trace CSV (t_ms,neighbor,status,attempts,delay_ms)
        #[arg(long, value_name = "FILE")]
        trace: PathBuf,
        /// Only print the final state instead of one line per row
        #[arg(long, action = ArgAction::SetTrue)]
        summary: bool,
    },
    /// Run the battery model over the simulated duty cycle
    Energy {
        /// Number of update periods to simulate
        #[arg(long, default_value_t = 10)]
        periods: u32,
        /// Switch to mains supply starting at this period
        #[arg(long, value_name = "N")]
        mains_from: Option<u32>,
    },
}
