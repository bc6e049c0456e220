//! Scenecast CLI: render a browser-hosted scene frame by frame into a video.
//!
//! Usage:
//!   scenecast render <URL> [OPTIONS]   Capture a scene into a video file
//!   scenecast check                    Check the encoder and renderer bridge
//!   scenecast profiles                 List output formats
//!   scenecast config [--write]         Show or write the configuration file

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use scenecast_common::config::AppConfig;
use scenecast_common::error::ScenecastError;
use scenecast_common::logging::{init_logging, resolve_logging};

mod commands;

use commands::render::RenderArgs;

/// Exit status of a run that was interrupted by a signal.
const EXIT_CANCELLED: u8 = 130;
/// Exit status for configuration and consistency errors.
const EXIT_SETUP_ERROR: u8 = 2;

#[derive(Parser)]
#[command(
    name = "scenecast",
    about = "Frame-accurate video capture of HTML/JS scenes",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Capture a scene into a video file
    Render(RenderArgs),

    /// Check that the encoder and renderer bridge can be started
    Check,

    /// List the available output formats
    Profiles,

    /// Show the effective configuration
    Config {
        /// Write the effective configuration to the config file
        #[arg(long)]
        write: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let app_config = AppConfig::load();

    let logging = resolve_logging(&app_config.logging, cli.verbose, cli.json_logs);
    init_logging(&logging);
    tracing::debug!(
        path = %scenecast_common::config::config_file_path().display(),
        "Configuration loaded"
    );

    let result = match cli.command {
        Commands::Render(args) => commands::render::run(args, &app_config).await,
        Commands::Check => commands::check::run(&app_config).await,
        Commands::Profiles => commands::profiles::run(),
        Commands::Config { write } => commands::config::run(&app_config, write),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(exit_status_for(&e))
        }
    }
}

fn exit_status_for(error: &anyhow::Error) -> u8 {
    match error.downcast_ref::<ScenecastError>() {
        Some(e) if e.is_setup_error() => EXIT_SETUP_ERROR,
        _ => 1,
    }
}
