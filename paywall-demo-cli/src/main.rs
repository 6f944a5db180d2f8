//! Paywall Demo CLI
//!
//! Command-line interface that drives a paywall end-to-end against a simulated store.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod config;
mod ui;

use commands::present::PresentOptions;
use commands::FailureMode;
use config::DemoConfig;

#[derive(Parser)]
#[command(name = "paywall-demo")]
#[command(about = "Paywall Demo CLI - Simulate paywall purchases and restores", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Demo configuration file (defaults are used when it does not exist)
    #[arg(long, global = true, env = "PAYWALL_DEMO_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the offering with prices and intro eligibility
    Offering {
        /// Print the offering as JSON
        #[arg(long)]
        json: bool,
    },

    /// Present the paywall and purchase or restore
    Present {
        /// Simulate a user who already holds the entitlement
        #[arg(long)]
        entitled: bool,

        /// Package to purchase (defaults to the offering default)
        #[arg(short, long)]
        package: Option<String>,

        /// Make the store fail with this error
        #[arg(long, value_enum)]
        fail: Option<FailureMode>,

        /// Store latency in milliseconds (overrides the config)
        #[arg(long)]
        delay_ms: Option<u64>,

        /// Restore purchases instead of purchasing
        #[arg(long)]
        restore: bool,

        /// Acknowledge restored purchases without asking
        #[arg(short, long)]
        yes: bool,
    },

    /// Write a default configuration file
    InitConfig {
        /// Output file
        #[arg(short, long, default_value = "paywall-demo.json")]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("paywall_demo_cli=debug,paywall_lib=debug,paywall_interactive=debug")
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter("paywall_demo_cli=info,paywall_lib=warn,paywall_interactive=warn")
            .with_writer(std::io::stderr)
            .init();
    }

    let config = match &cli.config {
        Some(path) => DemoConfig::load(path)?,
        None => DemoConfig::default(),
    };

    // Dispatch commands
    match cli.command {
        Commands::Offering { json } => {
            commands::offering::run(&config, json).await?;
        }
        Commands::Present {
            entitled,
            package,
            fail,
            delay_ms,
            restore,
            yes,
        } => {
            let opts = PresentOptions {
                entitled,
                package,
                fail,
                delay_ms,
                restore,
                yes,
            };
            commands::present::run(&config, opts, cli.verbose).await?;
        }
        Commands::InitConfig { output, force } => {
            commands::init_config::run(&output, force, cli.verbose).await?;
        }
    }

    Ok(())
}
