//! gatekeeper CLI: runs a release pipeline from `.gatekeeper/` configuration.
//!
//! Commands:
//! - `run <PARAM>`: Drive the pipeline for a task parameter (e.g. a tag)
//! - `stages`: Show the stages of a pipeline

use clap::{Parser, Subcommand};
use gk_core::config::DEFAULT_PIPELINE_NAME;
use std::path::PathBuf;

mod commands;
mod executors;
mod output;

#[derive(Parser)]
#[command(
    name = "gatekeeper",
    about = "Release pipeline runner with agent-backed stages",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Project root containing the `.gatekeeper/` directory
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    /// Pipeline to use
    #[arg(short, long, global = true, default_value = DEFAULT_PIPELINE_NAME)]
    pipeline: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline for a task parameter
    Run {
        /// Task parameter, e.g. the release tag without the leading `v`
        param: String,

        /// Pause after every stage and wait for Enter
        #[arg(long)]
        step: bool,
    },

    /// Show the stages of the pipeline
    Stages {
        /// Print the pipeline definition as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let result = match cli.command {
        Commands::Run { param, step } => {
            commands::run::run(&cli.root, &cli.pipeline, &param, step).await
        }
        Commands::Stages { json } => commands::stages::run(&cli.root, &cli.pipeline, json).await,
    };

    result.map_err(|err| color_eyre::eyre::eyre!("{err:#}"))
}
