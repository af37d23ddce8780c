//! SongQ Player (songq-player) - Main entry point
//!
//! Connects to the song request endpoint, queues `PLAY` identifiers and
//! plays them one at a time through the configured widget provider.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use songq_common::config::{
    resolve_config_path, ConfigSource, TomlConfig, WidgetBackend, CONFIG_ENV_VAR,
};
use songq_common::events::EventBus;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use songq_player::api::{self, AppState};
use songq_player::connection::WsConnector;
use songq_player::playback::WidgetLayout;
use songq_player::poll::PollLoop;
use songq_player::widget;
use songq_player::QueuePlayer;

/// Command-line arguments for songq-player
#[derive(Parser, Debug)]
#[command(name = "songq-player")]
#[command(about = "Song request queue player")]
#[command(version)]
struct Args {
    /// Config file (TOML); falls back to $SONGQ_CONFIG, then default locations
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// WebSocket endpoint delivering PLAY/SKIP commands
    #[arg(short, long, env = "SONGQ_ENDPOINT")]
    endpoint: Option<String>,

    /// Serve the status API on this address
    #[arg(long, env = "SONGQ_STATUS_BIND")]
    status_bind: Option<String>,

    /// Log items instead of launching a player process
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = resolve_config_path(args.config.as_deref(), CONFIG_ENV_VAR);
    let (config, source) = load_config(&args, config_path.as_deref())?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "songq_player={level},songq_common={level},tower_http=info",
                    level = config.logging.level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match &source {
        ConfigSource::File(_) => info!("Configuration: {}", source),
        ConfigSource::Missing(_) | ConfigSource::Defaults => warn!("Configuration: {}", source),
    }

    let connector = WsConnector::new(config.endpoint.clone());
    info!("Starting SongQ player, endpoint {}", connector.endpoint());
    info!(
        "Widget: {:?} {}x{} on #{}",
        config.widget.backend, config.widget.width, config.widget.height, config.widget.anchor
    );

    let bus = Arc::new(EventBus::new(256));
    let player = QueuePlayer::new(
        Arc::new(connector),
        widget::factory_from_config(&config.widget),
        WidgetLayout::from_config(&config.widget),
        bus.clone(),
    );
    let _poll = PollLoop::start(player.event_sender(), &config.poll);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let status_server = if config.status.enabled {
        let state = AppState {
            status: player.subscribe_status(),
            bus,
        };
        let bind = config.status.bind.clone();
        let mut rx = shutdown_rx.clone();
        Some(tokio::spawn(async move {
            let shutdown = async move {
                let _ = rx.changed().await;
            };
            if let Err(e) = api::serve(&bind, state, shutdown).await {
                error!("Status API failed: {}", e);
            }
        }))
    } else {
        None
    };

    player.run(shutdown_signal()).await;

    let _ = shutdown_tx.send(true);
    if let Some(handle) = status_server {
        handle.await.context("Status API task panicked")?;
    }

    info!("Shutdown complete");
    Ok(())
}

/// Load the config file and apply command-line overrides
fn load_config(
    args: &Args,
    path: Option<&std::path::Path>,
) -> Result<(TomlConfig, ConfigSource)> {
    let (mut config, source) =
        TomlConfig::load_or_default(path).context("Failed to load configuration")?;

    if let Some(endpoint) = &args.endpoint {
        config.endpoint = endpoint.clone();
    }
    if let Some(bind) = &args.status_bind {
        config.status.enabled = true;
        config.status.bind = bind.clone();
    }
    if args.dry_run {
        config.widget.backend = WidgetBackend::DryRun;
    }

    config.validate().context("Invalid configuration")?;
    Ok((config, source))
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
