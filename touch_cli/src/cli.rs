//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "touch", version, about = "Touch sensor array simulator and tools")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/touch_config.toml")]
    pub config: PathBuf,

    /// Print JSON lines instead of text
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
    /// Run the array against simulated electrodes
    Simulate {
        /// Number of sampling cycles to run
        #[arg(long, default_value_t = 1000)]
        cycles: u32,
        /// Simulated time between cycles
        #[arg(long = "period-ms", value_name = "MS", default_value_t = 10)]
        period_ms: u32,
        /// Untouched electrode reading per sample
        #[arg(long, default_value_t = 1000)]
        baseline: i32,
        /// Peak noise added to every sample
        #[arg(long, default_value_t = 2)]
        noise: u16,
        /// Noise seed; electrode n uses seed + n
        #[arg(long, default_value_t = 1)]
        seed: u32,
        /// Touch script CSV (at_ms,sensor,level)
        #[arg(long, value_name = "FILE")]
        script: Option<PathBuf>,
        /// Save thresholds to the store image when done
        #[arg(long, action = ArgAction::SetTrue)]
        save: bool,
        /// Sleep for the period between cycles; Ctrl-C stops the run
        #[arg(long, action = ArgAction::SetTrue)]
        realtime: bool,
    },
    /// Print the scan order the configuration produces
    Schedule,
    /// Decode the settings record in a store image
    Inspect {
        /// Store image; defaults to store.image from the config
        #[arg(long, value_name = "FILE")]
        image: Option<PathBuf>,
        /// Record offset; defaults to store.offset from the config
        #[arg(long, value_name = "BYTES")]
        offset: Option<usize>,
    },
}
