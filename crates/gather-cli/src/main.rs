//! Gather CLI
//!
//! Command-line front end for the tenant provisioning core.
//!
//! # Usage
//!
//! ```bash
//! gather envelope expand -f domain.json
//! gather validate -f objects.yaml --update
//! gather membership --tenant acme --domain d1 --domain d2 -f objects.json
//! gather seed --tenant acme -f fixtures.json --format yaml
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod output;

#[derive(Parser)]
#[command(name = "gather")]
#[command(version)]
#[command(about = "Tenant provisioning toolkit", long_about = None)]
struct Cli {
    /// Config file (defaults to ~/.gather/config.toml)
    #[arg(long, global = true, env = "GATHER_CONFIG")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true)]
    format: Option<output::OutputFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert between flat and enveloped documents
    Envelope {
        #[command(subcommand)]
        action: EnvelopeCommands,
    },
    /// Validate flat documents
    Validate {
        /// Input file, stdin when omitted
        #[arg(short, long)]
        file: Option<PathBuf>,
        /// Apply update rules instead of create rules
        #[arg(long)]
        update: bool,
    },
    /// Domain membership of monitored objects
    Membership {
        #[arg(long)]
        tenant: String,
        /// Domain of interest, repeatable. None means every domain.
        #[arg(long = "domain")]
        domains: Vec<String>,
        /// Prefer the count view in table output
        #[arg(long)]
        by_count: bool,
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Provision documents into a scratch store and report the result
    Seed {
        #[arg(long)]
        tenant: String,
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Configure CLI
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum EnvelopeCommands {
    /// Flat documents to envelopes
    Expand {
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Envelopes to flat documents
    Flatten {
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Write a default configuration file
    Init,
    /// Show the effective configuration
    Show,
}

fn init_tracing(level: &str) {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| level.to_string()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match config::CliConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };
    init_tracing(config.log_level());
    tracing::debug!("gather v{}", env!("CARGO_PKG_VERSION"));

    let format = cli
        .format
        .or_else(|| config.output_format())
        .unwrap_or(output::OutputFormat::Json);

    let result = match cli.command {
        Commands::Envelope { action } => commands::envelope::handle(action, format),
        Commands::Validate { file, update } => {
            commands::validate::handle(file.as_deref(), update, format)
        }
        Commands::Membership {
            tenant,
            domains,
            by_count,
            file,
        } => commands::membership::handle(tenant, domains, by_count, file.as_deref(), format),
        Commands::Seed { tenant, file } => {
            commands::seed::handle(&tenant, file.as_deref(), &config, format).await
        }
        Commands::Config { action } => {
            commands::config::handle(action, cli.config.as_deref(), &config, format)
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
