use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::{LedgerAction, RunParams, StoreAction};

#[derive(Parser)]
#[command(
    name = "crosspost",
    version,
    about = "Relay new X posts into a Buffer queue on a randomized hourly schedule",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json); overrides the configured format
    #[arg(long, global = true)]
    log_format: Option<String>,

    /// Configuration file (TOML); environment variables apply on top
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the relay loop until stopped
    Run {
        /// Primary source account (handle or URL)
        #[arg(short, long)]
        account: Option<String>,

        /// Fallback source account
        #[arg(long)]
        secondary: Option<String>,

        /// Second fallback source account
        #[arg(long)]
        tertiary: Option<String>,

        /// Slots per hour
        #[arg(long)]
        items_per_hour: Option<u32>,

        /// Run the browser without a window
        #[arg(long)]
        headless: bool,

        /// Publish immediately instead of enqueueing
        #[arg(long)]
        auto_publish: bool,

        /// Stop after one full plan
        #[arg(long)]
        once: bool,

        /// Chrome/Chromium binary to launch
        #[arg(long)]
        chrome: Option<PathBuf>,
    },

    /// Print one randomized cycle plan
    Plan {
        /// Slots in the plan
        #[arg(short, long, default_value = "4")]
        items: u32,

        /// Window length in minutes
        #[arg(long, default_value = "60")]
        window: u32,

        /// RNG seed for a reproducible plan
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Inspect or reset the seen-item ledger
    Ledger {
        #[command(subcommand)]
        action: LedgerAction,
    },

    /// Manage saved settings and credentials
    Store {
        #[command(subcommand)]
        action: StoreAction,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = commands::load_config(cli.config.as_deref())?;

    // Initialize tracing/logging
    let log_format = cli.log_format.as_deref().unwrap_or(&config.logging.format);
    setup_tracing(log_format, &config.logging.level, cli.verbose)?;

    match cli.command {
        Commands::Run {
            account,
            secondary,
            tertiary,
            items_per_hour,
            headless,
            auto_publish,
            once,
            chrome,
        } => {
            tracing::info!(
                account = ?account,
                items_per_hour = ?items_per_hour,
                headless = %headless,
                auto_publish = %auto_publish,
                "Starting run command"
            );
            let params = RunParams {
                account,
                secondary,
                tertiary,
                items_per_hour,
                headless,
                auto_publish,
                once,
                chrome,
            };
            commands::run(cli.config.as_deref(), params).await?;
        }

        Commands::Plan {
            items,
            window,
            seed,
        } => {
            commands::plan(items, window, seed)?;
        }

        Commands::Ledger { action } => {
            commands::ledger(&config, action)?;
        }

        Commands::Store { action } => {
            commands::store(&config, action)?;
        }
    }

    Ok(())
}

fn setup_tracing(format: &str, level: &str, verbose: bool) -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            tracing_subscriber::EnvFilter::new("crosspost=debug,info")
        } else {
            tracing_subscriber::EnvFilter::new(format!("crosspost={level},warn"))
        }
    });

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}
