//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "totalizer", version, about = "Load-cell totalizer CLI")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/totalizer.toml")]
    pub config: PathBuf,

    /// Emit events and errors as JSON lines instead of text
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
    /// Feed a recorded weight trace through the totalizer
    Replay {
        /// Trace CSV (t_ms,channel,weight,motion,overload,command)
        #[arg(long, value_name = "FILE")]
        trace: PathBuf,
        /// Persist totals to the configured store instead of an in-memory one
        #[arg(long, action = ArgAction::SetTrue)]
        persist: bool,
    },
    /// Print the persisted totals of every configured channel
    Show,
    /// Zero the persisted totals of one channel
    Clear {
        #[arg(long)]
        channel: usize,
    },
    /// Change the persisted totalize mode of one channel
    SetMode {
        #[arg(long)]
        channel: usize,
        /// One of: disabled, auto-load, auto-normal, auto-peak, on-command, on-accept, load-drop
        #[arg(long)]
        mode: String,
    },
    /// Zero the persisted totals of every channel
    Reset,
}
