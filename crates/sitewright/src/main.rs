//! Sitewright CLI - template ingestion and static site generation.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod config;

use config::ConfigFile;

#[derive(Parser)]
#[command(name = "sitewright")]
#[command(about = "Template ingestion and static site generation")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to sitewright.toml config file
    #[arg(short, long, default_value = "sitewright.toml")]
    config: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config and a starter template
    Init {
        /// Overwrite existing files
        #[arg(short, long)]
        yes: bool,
    },

    /// Start the HTTP server
    Serve {
        /// Port to listen on (defaults to config)
        #[arg(short, long)]
        port: Option<u16>,

        /// Do not open browser
        #[arg(long)]
        no_open: bool,
    },

    /// List templates
    Templates,

    /// Regenerate the site of a content record
    Regenerate {
        /// Record id
        id: String,
    },

    /// Package a generated site as a zip file
    Pack {
        /// Record id
        id: String,

        /// Output file (defaults to website_<name>.zip)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt().with_env_filter(filter).with_target(false).init();

    match cli.command {
        Commands::Init { yes } => {
            commands::init::run(&cli.config, yes)?;
        }
        Commands::Serve { port, no_open } => {
            let config = ConfigFile::load(&cli.config)?;
            commands::serve::run(config, port, no_open).await?;
        }
        Commands::Templates => {
            let config = ConfigFile::load(&cli.config)?;
            commands::templates::run(&config)?;
        }
        Commands::Regenerate { id } => {
            let config = ConfigFile::load(&cli.config)?;
            commands::regenerate::run(&config, &id)?;
        }
        Commands::Pack { id, output } => {
            let config = ConfigFile::load(&cli.config)?;
            commands::pack::run(&config, &id, output)?;
        }
    }

    Ok(())
}
