//! routeguard daemon
//!
//! Gateway authorization core: loads client policies from the registry,
//! merges configured overrides, and keeps the in-memory policy cache fresh
//! via broker change events with a polling fallback.

use clap::Parser;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use routeguard::admin::{AdminState, run_admin};
use routeguard::config::load_config;
use routeguard::events::{ChangeFeed, RedisChangeFeed};
use routeguard::policy::{PolicyCache, PolicyMerger, StaticOverrides};
use routeguard::refresh::RefreshCoordinator;
use routeguard::registry::{HttpRegistryClient, RegistryClient};

/// routeguard - gateway authorization core
#[derive(Parser, Debug)]
#[command(name = "routeguard")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, env = "ROUTEGUARD_CONFIG")]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "ROUTEGUARD_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Keep running with an empty cache when the initial load fails
    #[arg(long, env = "ROUTEGUARD_TOLERATE_EMPTY_START")]
    tolerate_empty_start: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting routeguard"
    );

    // Load configuration
    let config = load_config(args.config.as_deref())
        .inspect_err(|e| error!(error = %e, "Failed to load configuration"))?;

    // Wire up the core components
    let registry: Arc<dyn RegistryClient> = Arc::new(
        HttpRegistryClient::new(&config.registry)
            .inspect_err(|e| error!(error = %e, "Failed to create registry client"))?,
    );

    let feed: Arc<dyn ChangeFeed> = Arc::new(
        RedisChangeFeed::new(&config.broker.url)
            .inspect_err(|e| error!(error = %e, "Failed to create change feed"))?,
    );

    let cache = Arc::new(PolicyCache::new());
    let merger = PolicyMerger::new(Arc::new(StaticOverrides::new(config.overrides.clone())));

    let coordinator = Arc::new(RefreshCoordinator::new(
        registry,
        merger,
        Arc::clone(&cache),
        feed,
        config.broker.channel.clone(),
        &config.refresh,
    ));

    // Initial full load. Failing here is fatal unless the operator opted
    // into starting empty (the polling fallback will retry).
    match coordinator.load_all().await {
        Ok(count) => info!(policies = count, "Initial policy load complete"),
        Err(e) if args.tolerate_empty_start => {
            error!(error = %e, "Initial policy load failed, starting with an empty cache");
        }
        Err(e) => {
            error!(error = %e, "Initial policy load failed");
            return Err(e.into());
        }
    }

    // Background consistency loops
    coordinator.clone().run();

    // Admin server
    let shutdown = CancellationToken::new();
    let admin_handle = if config.admin.enabled {
        let state = AdminState {
            coordinator: Arc::clone(&coordinator),
            cache: Arc::clone(&cache),
        };
        let admin_config = config.admin.clone();
        let cancel = shutdown.clone();

        Some(tokio::spawn(async move {
            if let Err(e) = run_admin(&admin_config, state, cancel).await {
                error!(error = %e, "Admin server error");
            }
        }))
    } else {
        info!("Admin server is disabled");
        None
    };

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    shutdown.cancel();
    coordinator.shutdown();

    if let Some(handle) = admin_handle {
        let _ = handle.await;
    }

    Ok(())
}
