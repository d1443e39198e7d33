use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use docshub::cache::DefinitionCache;
use docshub::config::Config;
use docshub::directory;
use docshub::fetcher::DescriptorFetcher;
use docshub::hub::HubServer;
use docshub::metrics;
use docshub::refresh::{CycleOutcome, RefreshEngine};

#[derive(Parser)]
#[command(
    name = "docshub",
    version,
    about = "Aggregates Swagger/OpenAPI descriptors from a service fleet and serves them in one place",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json); overrides the config file
    #[arg(long, global = true)]
    log_format: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the documentation hub and its refresh loop
    Serve {
        /// TOML config file (environment variables are used otherwise)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override the bind address
        #[arg(short, long)]
        bind: Option<std::net::SocketAddr>,

        /// Override the refresh interval in seconds
        #[arg(long)]
        refresh_interval: Option<u64>,
    },

    /// Run a single refresh cycle and print the discovery feed
    RefreshOnce {
        /// TOML config file (environment variables are used otherwise)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = match &cli.command {
        Commands::Serve { config, .. } | Commands::RefreshOnce { config } => config.clone(),
    };
    let mut config = Config::load(config_path.as_deref())?;

    let log_format = cli
        .log_format
        .clone()
        .unwrap_or_else(|| config.logging.format.clone());
    setup_tracing(&log_format, &config.logging.level, cli.verbose)?;

    if let Err(e) = metrics::init_metrics() {
        tracing::warn!(error = %e, "Metrics disabled");
    }

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "docshub starting");

    match cli.command {
        Commands::Serve {
            bind,
            refresh_interval,
            ..
        } => {
            if let Some(bind) = bind {
                config.server.bind_address = bind;
            }
            if let Some(secs) = refresh_interval {
                config.refresh.interval_secs = secs;
            }
            tracing::info!(
                bind = %config.server.bind_address,
                interval_secs = config.refresh.interval_secs,
                "Starting serve command"
            );
            serve(config).await?;
        }

        Commands::RefreshOnce { .. } => {
            tracing::info!("Starting refresh-once command");
            refresh_once(config).await?;
        }
    }

    tracing::info!("docshub completed successfully");
    Ok(())
}

fn setup_tracing(format: &str, level: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("docshub=debug,tower_http=debug,info")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("docshub={level},warn")))
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .try_init()?;
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .try_init()?;
        }
    }

    Ok(())
}

async fn serve(config: Config) -> Result<()> {
    let server = HubServer::new(config)?;
    println!("{}", server.info().display());

    server
        .start_with_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
            tracing::info!("Shutdown signal received");
        })
        .await?;

    Ok(())
}

async fn refresh_once(config: Config) -> Result<()> {
    let directory = directory::from_config(&config.directory, config.fetcher.request_timeout())
        .context("Failed to build fleet directory")?;
    let fetcher =
        DescriptorFetcher::from_config(&config.fetcher).context("Failed to build fetcher")?;
    let cache = Arc::new(DefinitionCache::new());

    let engine = RefreshEngine::new(directory, fetcher, cache.clone(), config.refresh);

    match engine.run_cycle().await {
        CycleOutcome::Completed(report) => {
            eprintln!(
                "Refreshed {} of {} services: {} definitions fetched, {} failed ({} ms)",
                report.services_refreshed,
                report.services_seen,
                report.resources_fetched,
                report.resources_failed,
                report.duration_ms
            );
        }
        CycleOutcome::Skipped => anyhow::bail!("refresh cycle was skipped"),
    }

    println!("{}", serde_json::to_string_pretty(&cache.list_all())?);
    Ok(())
}
