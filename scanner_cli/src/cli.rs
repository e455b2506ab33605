//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "scanner", version, about = "Beam scanner motion CLI")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/scanner_config.toml")]
    pub config: PathBuf,

    /// Print reports and errors as JSON lines instead of text
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
    /// Move to an absolute pose and wait for the outcome
    Move {
        /// Target X in millimetres
        #[arg(long, allow_hyphen_values = true)]
        x: f64,
        /// Target Y in millimetres
        #[arg(long, allow_hyphen_values = true)]
        y: f64,
        /// Target polarization in degrees
        #[arg(long, allow_hyphen_values = true)]
        pol: f64,
        /// Override the estimate-derived timeout, in seconds
        #[arg(long = "timeout-s", value_name = "SECONDS")]
        timeout_s: Option<f64>,
        /// Emit trigger pulses at the configured interval while moving
        #[arg(long, action = ArgAction::SetTrue)]
        trigger: bool,
    },
    /// Drive an axis (x, y, pol or xy) to zero
    Home {
        #[arg(long)]
        axis: String,
        /// Override the estimate-derived timeout, in seconds
        #[arg(long = "timeout-s", value_name = "SECONDS")]
        timeout_s: Option<f64>,
    },
    /// Redefine the current pose of an axis as zero, without moving
    Zero {
        #[arg(long)]
        axis: String,
    },
    /// Print pose, motor flags and polarization torque
    Status,
    /// Visit every pose of a waypoint CSV (headers x,y,pol) in order
    Scan {
        #[arg(long, value_name = "FILE")]
        waypoints: PathBuf,
        /// Emit trigger pulses during each move
        #[arg(long, action = ArgAction::SetTrue)]
        trigger: bool,
    },
    /// Quick check that the config is valid and the backend answers
    SelfCheck,
    /// Health check for operational monitoring
    Health,
}
