use clap::{Parser, Subcommand};
use std::path::PathBuf;

use vpress::format::OutputFormat;

#[derive(Parser)]
#[command(name = "vpress")]
#[command(about = "Adaptive multi-format video encoder with hardware fallback", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Encode an input file into the requested delivery formats
    Encode {
        /// Path to the input video file
        input: PathBuf,

        /// Output formats, comma separated (h264, hevc, vp9, av1_webm, av1_mp4)
        #[arg(long, value_delimiter = ',', required = true)]
        formats: Vec<OutputFormat>,

        /// Quality preset (low, medium, high, ultra)
        #[arg(long, default_value = "medium")]
        preset: String,

        /// TOML file with knob overrides (global table + [per_format.<name>] tables)
        #[arg(long)]
        overrides: Option<PathBuf>,

        /// JSON file with externally computed content signals
        #[arg(long)]
        signals: Option<PathBuf>,

        /// Directory that receives the per-job output directory
        #[arg(long, default_value = "out")]
        output_dir: PathBuf,

        /// Reuse a specific job id instead of generating one
        #[arg(long)]
        job_id: Option<String>,

        /// Maximum concurrent encode tasks
        #[arg(long)]
        workers: Option<usize>,

        /// Per-operation timeout in seconds
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Print the job result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the planned fallback chains without encoding (dry run)
    Plan {
        /// Path to the input video file
        input: PathBuf,

        /// Output formats, comma separated
        #[arg(long, value_delimiter = ',', required = true)]
        formats: Vec<OutputFormat>,

        /// Quality preset (low, medium, high, ultra)
        #[arg(long, default_value = "medium")]
        preset: String,

        /// TOML file with knob overrides
        #[arg(long)]
        overrides: Option<PathBuf>,

        /// JSON file with externally computed content signals
        #[arg(long)]
        signals: Option<PathBuf>,
    },

    /// Probe and print available encoder capabilities
    Capabilities {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}
