//! Birdid - local HTTP service for bird species recognition.
//!
//! This crate classifies bird photographs with an ONNX image classifier,
//! optionally cropping around a detected bird and matching the species
//! against the region read from the photo's GPS metadata.

#![warn(missing_docs)]

pub mod cli;
pub mod config;
pub mod constants;
pub mod context;
pub mod error;
pub mod geo;
pub mod imaging;
pub mod inference;
pub mod metadata;
pub mod output;
pub mod pipeline;
pub mod server;
pub mod species;

use clap::Parser;
use cli::{Cli, Command, ConfigAction, ServeArgs};
use config::{
    Config, apply_cli_overrides, config_file_path, load_config_file, resolve_model_paths,
    save_config, validate_config,
};
use context::AppContext;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

pub use error::{Error, Result};

/// Main entry point for the birdid CLI.
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.serve.verbosity(), cli.serve.quiet);

    let config_path = resolve_config_path(&cli.serve)?;

    if let Some(Command::Config { action }) = cli.command {
        return handle_config_command(action, &config_path);
    }

    let config = apply_cli_overrides(load_config_file(&config_path)?, &cli.serve);
    validate_config(&config)?;
    serve(&config)
}

/// Load models and run the HTTP server until shutdown.
fn serve(config: &Config) -> Result<()> {
    let paths = resolve_model_paths(&config.models)?;
    paths.ensure_required()?;
    inference::init_runtime()?;
    let context = Arc::new(AppContext::load_from_paths(config, &paths)?);

    let runtime = tokio::runtime::Runtime::new().map_err(|e| Error::Internal {
        message: format!("Failed to create async runtime: {e}"),
    })?;

    info!(
        "Starting {} v{} on {}:{}",
        constants::SERVICE_NAME,
        constants::VERSION,
        config.server.host,
        config.server.port
    );
    runtime.block_on(server::serve(
        context,
        &config.server.host,
        config.server.port,
    ))
}

fn resolve_config_path(args: &ServeArgs) -> Result<PathBuf> {
    args.config.clone().map_or_else(config_file_path, Ok)
}

fn init_logging(verbose: u8, quiet: bool) {
    use tracing_subscriber::{EnvFilter, fmt};

    // ORT logging is suppressed by default because provider fallback is expected in auto mode.
    // Use -v to see ORT warnings, -vv for info, -vvv for full trace.
    let filter_str = if quiet {
        "warn,ort=off".to_string()
    } else {
        match verbose {
            0 => "info,ort=off".to_string(),
            1 => "debug,ort=warn,hyper=info".to_string(),
            2 => "trace,ort=info".to_string(),
            _ => "trace".to_string(),
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    fmt().with_env_filter(filter).init();
}

fn handle_config_command(action: ConfigAction, path: &std::path::Path) -> Result<()> {
    match action {
        ConfigAction::Init => {
            if path.exists() {
                println!("Configuration file already exists: {}", path.display());
            } else {
                save_config(&Config::default(), path)?;
                println!("Created configuration file: {}", path.display());
                println!("\nNext steps:");
                println!("  Set [models] model_dir to the directory holding the model files");
                println!("  birdid --port 5156");
            }
            Ok(())
        }
        ConfigAction::Show => {
            let config = load_config_file(path)?;
            println!("{config:#?}");
            Ok(())
        }
        ConfigAction::Path => {
            println!("{}", path.display());
            Ok(())
        }
    }
}
