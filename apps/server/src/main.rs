//! Radio Server - headless daemon for the radio tuner service.
//!
//! Runs the radio core against simulated hardware: two tuners, a handful of
//! FM and AM stations, and an audio focus platform that always grants. The
//! session opens the startup band, seeks to the first station and logs every
//! listener event until it is stopped.

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use radio_core::{
    bootstrap_radio, LoggingListener, MemoryStationStore, RadioEvent, SimulatedAudioFocus,
    SimulatedRadio, StoreEvent,
};
use tokio::signal;
use tokio::sync::broadcast;

use crate::config::ServerConfig;

/// Radio Server - headless radio tuner daemon.
#[derive(Parser, Debug)]
#[command(name = "radio-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (YAML).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(short, long, default_value = "info", env = "RADIO_LOG_LEVEL")]
    log_level: log::LevelFilter,

    /// Disable the background scanner (overrides config file).
    #[arg(long)]
    no_background_scan: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::new()
        .filter_level(args.log_level)
        .format_timestamp_millis()
        .init();

    log::info!("Radio Server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config =
        ServerConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    // Apply CLI overrides
    if args.no_background_scan {
        config.background_scan = false;
    }

    log::info!(
        "Configuration: startup_band={}, reopen_base_delay_ms={}, background_scan={}",
        config.startup_band,
        config.reopen_base_delay_ms,
        config.background_scan
    );

    // Demo mode: simulated tuners, focus platform and storage
    let store = Arc::new(MemoryStationStore::new());
    let store_events = store.subscribe();
    let services = bootstrap_radio(
        &config.to_core_config(),
        Arc::new(SimulatedRadio::demo()),
        Arc::new(SimulatedAudioFocus::new()),
        store.clone(),
    )
    .context("Failed to bootstrap radio services")?;

    log::info!(
        "Services bootstrapped (dual tuners: {})",
        services.session.has_dual_tuners()
    );

    services.session.register_listener(Arc::new(LoggingListener));
    tokio::spawn(log_station_changes(services.events.subscribe()));
    tokio::spawn(log_store_events(store_events));

    services
        .session
        .open_band(config.startup_band)
        .await
        .with_context(|| format!("Failed to open {}", config.startup_band))?;
    if let Err(e) = services.session.seek_forward().await {
        log::warn!("Initial seek failed: {}", e);
    }

    // Wait for shutdown signal
    shutdown_signal().await;

    log::info!("Shutdown signal received, cleaning up...");

    if let Some(station) = services.session.current_station().await {
        log::info!("Last station: {}", station.identity);
    }

    // Graceful shutdown
    services.shutdown().await;

    log::info!("Shutdown complete");
    Ok(())
}

/// Logs tuned stations from the broadcast bridge.
async fn log_station_changes(mut rx: broadcast::Receiver<RadioEvent>) {
    loop {
        match rx.recv().await {
            Ok(RadioEvent::StationChanged { station }) => {
                log::info!("Now playing {}", station.identity);
            }
            Ok(RadioEvent::MetadataChanged {
                metadata: Some(metadata),
            }) => {
                if let Some(name) = metadata.program_service {
                    log::info!("Station name: {}", name);
                }
            }
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(n)) => {
                log::warn!("Event log lagged by {} event(s)", n);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// Logs storage updates, e.g. finished background sweeps.
async fn log_store_events(mut rx: broadcast::Receiver<StoreEvent>) {
    while let Ok(event) = rx.recv().await {
        match event {
            StoreEvent::PreScannedReplaced { band, count } => {
                log::info!("Background scan stored {} station(s) for {}", count, band);
            }
            StoreEvent::PresetsChanged => log::info!("Presets changed"),
        }
    }
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                log::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
