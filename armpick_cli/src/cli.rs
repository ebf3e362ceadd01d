//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();
/// Effective session caps used for the current run (for JSON details).
pub static LAST_SESSION: OnceLock<CliSession> = OnceLock::new();

#[derive(Copy, Clone, Debug)]
pub struct CliSession {
    pub max_placements: u32,
    pub max_run_ms: u64,
    pub detect_hz: u32,
}

#[derive(Parser, Debug)]
#[command(name = "armpick", version, about = "Cup pick-and-place CLI")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/armpick_config.toml")]
    pub config: PathBuf,

    /// Optional calibrated slot table CSV (strict 'x,y,z' header); overrides
    /// the slot list in the config
    #[arg(long, value_name = "FILE")]
    pub slots: Option<PathBuf>,

    /// Log as JSON lines instead of pretty
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a sorting session until a cap, an operator stop, or a fault
    Run {
        /// Override session: stop after this many successful placements
        #[arg(long, value_name = "N")]
        max_placements: Option<u32>,
        /// Override session: hard wall-clock cap in ms (takes precedence over config)
        #[arg(long, value_name = "MS")]
        max_run_ms: Option<u64>,
        /// Override session: camera/detector rate in Hz
        #[arg(long, value_name = "HZ")]
        detect_hz: Option<u32>,
        /// Print total runtime on completion
        #[arg(long, action = ArgAction::SetTrue)]
        print_runtime: bool,
    },
    /// Parse and validate the config, then exit
    CheckConfig,
    /// Quick health check (hardware presence / sim ok)
    SelfCheck,
}
