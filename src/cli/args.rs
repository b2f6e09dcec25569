//! CLI argument definitions.

use crate::cli::validators::parse_confidence;
use crate::config::InferenceDevice;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Local HTTP service for bird species recognition in photographs.
#[derive(Debug, Parser)]
#[command(name = "birdid")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to run (default: start the server).
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Server options.
    #[command(flatten)]
    pub serve: ServeArgs,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage configuration.
    Config {
        /// Configuration action to perform.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommand actions.
#[derive(Debug, Clone, Copy, Subcommand)]
pub enum ConfigAction {
    /// Create default configuration file.
    Init,
    /// Display current configuration.
    Show,
    /// Print configuration file path.
    Path,
}

/// Arguments for running the server.
#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Bind address (default: 127.0.0.1).
    #[arg(long, env = "BIRDID_HOST")]
    pub host: Option<String>,

    /// Listening port (default: 5156).
    #[arg(long, env = "BIRDID_PORT", value_parser = clap::value_parser!(u16).range(1..))]
    pub port: Option<u16>,

    /// Enable debug logging.
    #[arg(long)]
    pub debug: bool,

    /// Path to a configuration file (default: platform config dir).
    #[arg(long, env = "BIRDID_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Directory containing the model artifacts.
    #[arg(long, env = "BIRDID_MODEL_DIR")]
    pub model_dir: Option<PathBuf>,

    /// Path to the classifier ONNX model (overrides config).
    #[arg(long, env = "BIRDID_CLASSIFIER")]
    pub classifier: Option<PathBuf>,

    /// Path to the species table JSON (overrides config).
    #[arg(long, env = "BIRDID_SPECIES_INFO")]
    pub species_info: Option<PathBuf>,

    /// Path to the YOLO detector ONNX model (overrides config).
    #[arg(long, env = "BIRDID_DETECTOR")]
    pub detector: Option<PathBuf>,

    /// Path to the knowledge base CSV (overrides config).
    #[arg(long, env = "BIRDID_KNOWLEDGE_BASE")]
    pub knowledge_base: Option<PathBuf>,

    /// Directory with offline eBird species lists (overrides config).
    #[arg(long, env = "BIRDID_REGION_DATA")]
    pub region_data: Option<PathBuf>,

    /// Number of sessions kept per model (bounds concurrent inference).
    #[arg(long, env = "BIRDID_WORKERS", value_parser = clap::value_parser!(u16).range(1..))]
    pub workers: Option<u16>,

    /// Minimum detector confidence (0.0-1.0).
    #[arg(long, value_parser = parse_confidence, env = "BIRDID_DETECTOR_CONFIDENCE")]
    pub detector_confidence: Option<f32>,

    /// Inference device.
    #[arg(long, value_enum, env = "BIRDID_DEVICE", conflicts_with_all = ["cpu", "gpu"])]
    pub device: Option<InferenceDevice>,

    /// Force CPU inference.
    #[arg(long, conflicts_with = "gpu")]
    pub cpu: bool,

    /// Prefer CUDA GPU inference.
    #[arg(long, conflicts_with = "cpu")]
    pub gpu: bool,

    /// Suppress informational output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Increase verbosity (-v: debug, -vv: trace+ORT info, -vvv: full trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

impl ServeArgs {
    /// Device requested on the command line, if any.
    pub fn requested_device(&self) -> Option<InferenceDevice> {
        if self.cpu {
            Some(InferenceDevice::Cpu)
        } else if self.gpu {
            Some(InferenceDevice::Cuda)
        } else {
            self.device
        }
    }

    /// Effective verbosity; `--debug` implies at least `-v`.
    pub fn verbosity(&self) -> u8 {
        if self.debug {
            self.verbose.max(1)
        } else {
            self.verbose
        }
    }
}
