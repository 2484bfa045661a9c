use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hsched::config::Config;

mod commands;

#[derive(Parser)]
#[command(
    name = "hsched",
    version,
    about = "Hidden-service crawl scheduler: decides which discovered URLs get crawled",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json)
    #[arg(long, global = true)]
    log_format: Option<String>,

    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: Overrides,
}

/// Flags taking precedence over the file and the environment
#[derive(Args, Debug, Default)]
struct Overrides {
    /// NATS server URI
    #[arg(long, global = true)]
    nats_uri: Option<String>,

    /// Resource index API URI
    #[arg(long, global = true)]
    api_uri: Option<String>,

    /// Resource index API bearer token
    #[arg(long, global = true)]
    api_token: Option<String>,

    /// Minimum age before a crawled URL is scheduled again (e.g. 7days, 12h)
    #[arg(long, global = true)]
    refresh_delay: Option<String>,

    /// Address for the /health and /metrics endpoints
    #[arg(long, global = true)]
    metrics_addr: Option<SocketAddr>,

    /// Maximum messages handled at once
    #[arg(long, global = true)]
    concurrency: Option<usize>,
}

impl Overrides {
    fn apply(self, config: &mut Config) {
        if let Some(v) = self.nats_uri {
            config.bus.nats_uri = v;
        }
        if let Some(v) = self.api_uri {
            config.index.api_uri = v;
        }
        if let Some(v) = self.api_token {
            config.index.api_token = Some(v).filter(|t| !t.is_empty());
        }
        if let Some(v) = self.refresh_delay {
            config.scheduler.refresh_delay = Some(v);
        }
        if let Some(v) = self.metrics_addr {
            config.server.metrics_addr = Some(v);
        }
        if let Some(v) = self.concurrency {
            config.bus.max_in_flight = v;
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Consume discovered URLs and schedule crawls (default)
    Run,

    /// Check whether a URL can be scheduled and print its fingerprint
    CheckUrl {
        /// URL to check
        url: String,
    },

    /// Decide on one URL against the index without publishing anything
    Decide {
        /// URL to decide on
        url: String,

        /// Use an empty in-memory index instead of the API
        #[arg(long)]
        offline: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    cli.overrides.apply(&mut config);
    if let Some(format) = cli.log_format {
        config.logging.format = format;
    }

    setup_tracing(&config.logging.format, &config.logging.level, cli.verbose)?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            config.validate().context("Invalid configuration")?;
            tracing::info!(
                config = ?cli.config,
                stream = %config.bus.stream,
                group = %config.bus.group,
                "Starting scheduler"
            );
            commands::run(config).await?;
        }

        Commands::CheckUrl { url } => {
            commands::check_url(&url)?;
        }

        Commands::Decide { url, offline } => {
            config.validate().context("Invalid configuration")?;
            tracing::info!(url = %url, offline = %offline, "Starting decide command");
            commands::decide(&config, &url, offline).await?;
        }
    }

    Ok(())
}

fn setup_tracing(format: &str, level: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("hsched=debug,info")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .or_else(|_| tracing_subscriber::EnvFilter::try_new(format!("hsched={level},warn")))
            .context("Invalid log level")?
    };

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
