//! Command-line interface for narrat
//!
//! Provides argument parsing using clap derive macros.

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// Live spoken narration of video
#[derive(Parser, Debug)]
#[command(
    name = "narrat",
    version,
    about = "Live spoken narration of video with a vision-language model"
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Suppress output (quiet mode)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose output (-v: per-frame timings, -vv: full diagnostics)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Video file to narrate (webcam input is not supported)
    #[arg(long, value_name = "PATH")]
    pub video: Option<PathBuf>,

    /// Describe every Nth frame (default: 5)
    #[arg(long, value_name = "N", allow_negative_numbers = true)]
    pub cycle: Option<i64>,

    /// Target frames per second to describe (overrides --cycle when the video frame rate is known)
    #[arg(long, value_name = "FPS", allow_negative_numbers = true)]
    pub fps: Option<f64>,

    /// Vision-language model name
    #[arg(long, value_name = "MODEL")]
    pub model: Option<String>,

    /// Speech voice name
    #[arg(long, value_name = "VOICE")]
    pub voice: Option<String>,

    /// Audio output device name
    #[arg(long, value_name = "DEVICE")]
    pub device: Option<String>,

    /// Print descriptions without speaking them
    #[arg(long)]
    pub mute: bool,

    /// Per-request timeout (default: 30s). Examples: 10s, 1m
    #[arg(long, value_name = "DURATION", value_parser = parse_timeout_secs)]
    pub timeout: Option<u64>,
}

/// Parse a timeout string into whole seconds.
///
/// Bare numbers are seconds; anything else goes through `humantime`
/// (`30s`, `2m`, `1m30s`).
fn parse_timeout_secs(s: &str) -> Result<u64, String> {
    let s = s.trim();
    let secs = match s.parse::<u64>() {
        Ok(secs) => secs,
        Err(_) => humantime::parse_duration(s)
            .map(|d| d.as_secs())
            .map_err(|e| e.to_string())?,
    };
    if secs == 0 {
        return Err("timeout must be at least one second".to_string());
    }
    Ok(secs)
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

/// Configuration management actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the default configuration as TOML
    Dump,
}
