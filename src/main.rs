use anyhow::{bail, Context, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use whereabouts::api::{create_router, AppState};
use whereabouts::config::{load_config, AppConfig};
use whereabouts::poller::PollScheduler;
use whereabouts::state::build_store;
use whereabouts::subscription::StateBroadcaster;
use whereabouts::upstream::{ping_with_backoff, HomeAssistantClient, PingBackoff, StateSource};

#[tokio::main]
async fn main() -> Result<()> {
    let config = read_config()?;

    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("whereabouts={}", config.log_level).into()),
        )
        .init();

    info!("Whereabouts starting...");
    config.validate()?;

    info!(
        home_assistant = %config.home_assistant.url,
        entities = config.poller.entities.len(),
        ring_size = config.store.ring_size,
        filter = config.store.filter,
        listen = %config.server.listen,
        "Configuration loaded"
    );

    // Signals cancel everything from here on, including the startup ping
    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        match shutdown_signal().await {
            Ok(()) => info!("Shutdown signal received"),
            Err(e) => error!(error = %e, "Signal handling failed, shutting down"),
        }
        signal_cancel.cancel();
    });

    // Home Assistant must answer before anything starts polling
    let client = HomeAssistantClient::new(&config.home_assistant)
        .context("Failed to create Home Assistant client")?;
    let source: Arc<dyn StateSource> = Arc::new(client);
    if let Err(e) = ping_with_backoff(source.as_ref(), &PingBackoff::default(), &cancel).await {
        if cancel.is_cancelled() {
            info!("Whereabouts stopped before startup completed");
            return Ok(());
        }
        return Err(e);
    }

    let broadcaster = Arc::new(StateBroadcaster::new(config.server.broadcast_capacity));
    let store = build_store(
        config.store.ring_size,
        config.store.filter,
        broadcaster.observer(),
    )?;

    let scheduler = PollScheduler::new(
        config.poller.clone(),
        Arc::clone(&source),
        Arc::clone(&store),
    )?;
    let poller_cancel = cancel.clone();
    let poller_handle = tokio::spawn(async move { scheduler.run(poller_cancel).await });

    // Start HTTP API server
    let router = create_router(Arc::new(AppState {
        store,
        broadcaster,
        source,
    }));
    let listener = tokio::net::TcpListener::bind(&config.server.listen)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.listen))?;
    info!(listen = %config.server.listen, "HTTP server listening");

    let server_cancel = cancel.clone();
    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router)
            .with_graceful_shutdown(async move { server_cancel.cancelled().await })
            .await
        {
            error!(error = %e, "HTTP server error");
        }
    });

    // Wait for shutdown signal
    cancel.cancelled().await;

    // Graceful shutdown, bounded
    let deadline = Duration::from_secs(config.server.shutdown_timeout_secs);
    let drained = tokio::time::timeout(deadline, async {
        if let Err(e) = poller_handle.await {
            warn!(error = %e, "Poller task ended abnormally");
        }
        if let Err(e) = server_handle.await {
            warn!(error = %e, "HTTP server task ended abnormally");
        }
    })
    .await;

    if drained.is_err() {
        bail!("Shutdown did not complete within {:?}", deadline);
    }

    info!("Whereabouts stopped");
    Ok(())
}

/// Config file from `WHEREABOUTS_CONFIG` (defaults when absent), then env overrides
fn read_config() -> Result<AppConfig> {
    let path = std::env::var("WHEREABOUTS_CONFIG")
        .unwrap_or_else(|_| "whereabouts.toml".to_string());

    let mut config = if Path::new(&path).exists() {
        load_config(&path)?
    } else {
        AppConfig::default()
    };
    config.apply_env();

    Ok(config)
}

async fn shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        let mut terminate =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .context("Failed to install SIGTERM handler")?;

        tokio::select! {
            result = tokio::signal::ctrl_c() => result.context("Failed to listen for ctrl_c signal")?,
            _ = terminate.recv() => {}
        }
    }

    #[cfg(not(unix))]
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl_c signal")?;

    Ok(())
}
