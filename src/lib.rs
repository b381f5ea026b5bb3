pub mod api;
pub mod cli;
pub mod clients;
pub mod config;
pub mod db;
pub mod domain;
pub mod entities;
pub mod models;
pub mod services;
pub mod state;

use std::sync::Arc;
use std::time::Duration;
use tokio::signal;

use anyhow::Context;
use clap::{CommandFactory, Parser};
use cli::{CacheCommands, Cli, Commands, PrefsCommands};
pub use config::Config;
use metrics_exporter_prometheus::PrometheusHandle;
use state::SharedState;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::load()?;
    config.validate()?;

    let prometheus_handle = if config.observability.metrics_enabled {
        use metrics_exporter_prometheus::PrometheusBuilder;
        let builder = PrometheusBuilder::new();
        let handle = builder
            .install_recorder()
            .context("Failed to install Prometheus recorder")?;
        Some(handle)
    } else {
        None
    };

    init_tracing(&config)?;

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    match command {
        Commands::Serve => run_daemon(config, prometheus_handle).await,

        Commands::Search { user, query } => {
            cli::cmd_search(&config, user, &query.join(" ")).await
        }

        Commands::Prefs { command } => match command {
            PrefsCommands::Show { user } => cli::cmd_prefs_show(&config, user).await,
            PrefsCommands::Set {
                user,
                thumbnails,
                limit,
                locale,
            } => {
                cli::cmd_prefs_set(
                    &config,
                    user,
                    thumbnails.map(bool::from),
                    limit,
                    locale.as_deref(),
                )
                .await
            }
        },

        Commands::Token { user, key } => cli::cmd_token(&config, user, &key).await,

        Commands::Cache { command } => match command {
            CacheCommands::Purge => cli::cmd_cache_purge(&config).await,
        },

        Commands::Init => {
            if Config::create_default_if_missing()? {
                println!("✓ Config file created. Edit config.toml and run again.");
            } else {
                println!("config.toml already exists, leaving it untouched.");
            }
            Ok(())
        }
    }
}

fn init_tracing(config: &Config) -> anyhow::Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let mut log_level = config.general.log_level.clone();
    if config.general.suppress_connection_errors {
        log_level.push_str(",reqwest::retry=off,hyper_util=off");
    }

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level));

    let fmt_layer = tracing_subscriber::fmt::layer();

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer);

    if config.observability.loki_enabled {
        let url = url::Url::parse(&config.observability.loki_url).context("Invalid Loki URL")?;

        let mut builder = tracing_loki::builder();
        for (key, value) in &config.observability.loki_labels {
            builder = builder.label(key.as_str(), value.as_str())?;
        }
        let (layer, task) = builder.build_url(url)?;

        tokio::spawn(task);

        registry.with(layer).init();
        info!(
            "Loki logging initialized at {}",
            config.observability.loki_url
        );
    } else {
        registry.init();
    }

    Ok(())
}

/// Purges expired cache entries every `interval` until aborted.
fn spawn_cache_purger(shared: Arc<SharedState>, interval: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match shared.cache.purge_expired().await {
                Ok(0) => {}
                Ok(removed) => info!(removed, "Purged expired search cache entries"),
                Err(e) => warn!(error = %e, "Cache purge failed"),
            }
        }
    })
}

async fn run_daemon(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<()> {
    info!(
        "searchgate v{} starting in daemon mode...",
        env!("CARGO_PKG_VERSION")
    );

    let shared = Arc::new(SharedState::new(config.clone()).await?);

    let purge_handle = (config.cache.purge_interval_minutes > 0).then(|| {
        spawn_cache_purger(
            shared.clone(),
            Duration::from_secs(u64::from(config.cache.purge_interval_minutes) * 60),
        )
    });

    let server_handle: Option<tokio::task::JoinHandle<()>> = if config.server.enabled {
        let port = config.server.port;
        info!("Starting Web API on port {}", port);

        if config.server.api_key.is_none() {
            warn!("server.api_key is not set; the API accepts unauthenticated requests");
        }

        let api_state = api::create_app_state(shared.clone(), prometheus_handle);
        let app = api::router(api_state).await;
        let addr = format!("0.0.0.0:{port}");
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind {addr}"))?;

        Some(tokio::spawn(async move {
            info!("🌐 Web Server running at http://0.0.0.0:{}", port);
            if let Err(e) = axum::serve(listener, app).await {
                error!("Web server error: {}", e);
            }
        }))
    } else {
        None
    };

    info!("Daemon running. Press Ctrl+C to stop.");

    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Shutdown signal received");
        }
        Err(e) => {
            error!("Error listening for shutdown: {}", e);
        }
    }

    if let Some(handle) = purge_handle {
        handle.abort();
    }
    if let Some(handle) = server_handle {
        handle.abort();
    }
    info!("Daemon stopped");

    Ok(())
}
