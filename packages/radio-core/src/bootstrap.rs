//! Application bootstrap and dependency wiring.
//!
//! This module is the composition root: the hardware, focus platform and
//! storage collaborators come in, the session and the optional background
//! scanner come out wired to one listener hub.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::band::BandConfigTable;
use crate::config::Config;
use crate::constants::DUAL_TUNER_MODULES;
use crate::error::RadioResult;
use crate::events::{BroadcastListener, CallbackHub};
use crate::focus::AudioFocusPlatform;
use crate::hardware::{RadioHal, SlotRegistry};
use crate::runtime::TokioSpawner;
use crate::services::{BackgroundScanner, TunerResources, TunerSessionManager};
use crate::store::StationStore;

/// Container for all bootstrapped services.
#[derive(Clone)]
pub struct RadioServices {
    /// Foreground tuner session.
    pub session: TunerSessionManager,
    /// Background scanner, present on dual-tuner hardware when enabled.
    pub scanner: Option<BackgroundScanner>,
    /// Listener registry shared by every service.
    pub hub: Arc<CallbackHub>,
    /// Broadcast bridge registered on the hub.
    pub events: Arc<BroadcastListener>,
    pub store: Arc<dyn StationStore>,
    /// Band configs derived from the first module.
    pub bands: Arc<BandConfigTable>,
    /// Task spawner for background operations.
    pub spawner: TokioSpawner,
    /// Cancellation token for graceful shutdown.
    pub cancel_token: CancellationToken,
}

impl RadioServices {
    /// Stops the scanner, then the session, then cancels remaining tasks.
    pub async fn shutdown(&self) {
        log::info!("[Bootstrap] Beginning graceful shutdown...");

        if let Some(ref scanner) = self.scanner {
            scanner.stop().await;
        }
        self.session.shutdown().await;
        self.cancel_token.cancel();

        log::info!("[Bootstrap] Shutdown complete");
    }
}

/// Bootstraps the radio services.
///
/// Wiring order:
///
/// 1. Config validation and band table (from the first module)
/// 2. Shared infrastructure (hub, slot registry, spawner, cancellation token)
/// 3. Broadcast bridge
/// 4. Background scanner on the second module, if any
/// 5. Session manager on the first module
///
/// Must be called from within a Tokio runtime.
///
/// # Errors
///
/// Returns [`RadioError::InvalidConfig`](crate::error::RadioError::InvalidConfig)
/// if the configuration is rejected. Missing hardware is not an error; the
/// session then reports itself uninitialized.
pub fn bootstrap_radio(
    config: &Config,
    hal: Arc<dyn RadioHal>,
    focus: Arc<dyn AudioFocusPlatform>,
    store: Arc<dyn StationStore>,
) -> RadioResult<RadioServices> {
    config.validate()?;

    let modules = hal.modules();
    let bands = Arc::new(
        modules
            .first()
            .map(|m| BandConfigTable::from_descriptors(&m.bands, config.stereo))
            .unwrap_or_default(),
    );

    let hub = Arc::new(CallbackHub::new());
    let spawner = TokioSpawner::current();
    let cancel_token = CancellationToken::new();
    let resources = TunerResources {
        hal,
        slots: SlotRegistry::new(),
        bands: Arc::clone(&bands),
    };

    let events = Arc::new(BroadcastListener::new(config.event_channel_capacity));
    hub.register(Arc::clone(&events) as _);

    let scanner = match modules.get(1) {
        Some(module) if config.background_scan && modules.len() >= DUAL_TUNER_MODULES => {
            log::info!("[Bootstrap] Background scanning on module {}", module.id);
            Some(BackgroundScanner::spawn(
                module.id,
                resources.clone(),
                Arc::clone(&store),
                config.scan_max_steps,
                &spawner,
                cancel_token.child_token(),
            ))
        }
        _ => None,
    };

    let session = TunerSessionManager::start(
        config,
        resources,
        Arc::clone(&hub),
        focus,
        scanner.clone(),
        &spawner,
        cancel_token.child_token(),
    );

    Ok(RadioServices {
        session,
        scanner,
        hub,
        events,
        store,
        bands,
        spawner,
        cancel_token,
    })
}
