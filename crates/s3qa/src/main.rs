//! s3qa: black-box QA suite for S3-compatible object storage.
//!
//! The suites themselves run under `cargo test`; this binary inspects the
//! configuration they read and the timing results they record.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use s3qa_core::{Config, LogFormat};
use tracing::debug;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod cli;
mod commands;

use cli::{Cli, Commands, ConfigSubcommand};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Version = cli.command {
        println!("s3qa {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let config = load_config(&cli.config)?;
    init_logging(&config)?;
    debug!(endpoint = %config.s3.endpoint, "Settings loaded");

    match cli.command {
        Commands::Config(cmd) => match cmd.command {
            ConfigSubcommand::Show(args) => commands::handle_config_show(&config, args).await,
            ConfigSubcommand::Update(args) => commands::handle_config_update(&config, args).await,
        },
        Commands::Secret(cmd) => commands::handle_secret(&config, cmd.command),
        Commands::Timings(cmd) => commands::handle_timings(&config, cmd).await,
        Commands::Version => Ok(()),
    }
}

fn load_config(path: &Option<PathBuf>) -> Result<Config> {
    Config::load(path.as_deref()).context("Failed to load configuration")
}

fn init_logging(config: &Config) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    // Command output goes to stdout, logs to stderr.
    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    match config.logging.format {
        LogFormat::Json => {
            tracing_subscriber::registry().with(filter).with(fmt_layer.json()).init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry().with(filter).with(fmt_layer).init();
        }
    }

    Ok(())
}
