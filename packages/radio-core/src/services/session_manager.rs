//! Foreground tuner session.
//!
//! [`TunerSessionManager`] is a cheap, cloneable handle to the session actor.
//! Operations are queued as commands and answered in submission order; the
//! actor owns the tuner handle, audio focus and the reopen timer, so no lock
//! is held across a driver call and listener callbacks never run under a
//! caller's lock.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::constants::DUAL_TUNER_MODULES;
use crate::error::{RadioError, RadioResult};
use crate::events::{CallbackHub, ListenerId, RadioListener};
use crate::focus::{AudioFocusPlatform, FocusArbiter, FocusChange};
use crate::hardware::ScanDirection;
use crate::runtime::{TaskSpawner, TokioSpawner};
use crate::station::{Band, Station, StationIdentity};

use super::background_scanner::BackgroundScanner;
use super::session_actor::{Command, SessionActor};
use super::TunerResources;

/// Lifecycle of the foreground tuner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionState {
    /// No tuner open.
    Closed,
    /// Opened or reconfigured, waiting for the hardware to confirm the band.
    Opening,
    Open,
    /// Another process holds hardware control.
    Suspended,
    /// A fatal error closed the tuner; a reopen is scheduled.
    Reopening,
}

/// Point-in-time view of the session, for diagnostics and tests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub state: SessionState,
    /// Band confirmed by the hardware.
    pub band: Option<Band>,
    pub requested_band: Option<Band>,
    pub channel: Option<u32>,
    pub focus_held: bool,
    /// Consecutive reopen failures since the last successful open.
    pub reopen_attempts: u32,
    /// Always 0 or 1.
    pub pending_reopens: usize,
    pub pending_reopen_delay: Option<Duration>,
}

/// Handle to the foreground tuner session.
#[derive(Clone)]
pub struct TunerSessionManager {
    commands: mpsc::Sender<Command>,
    focus_changes: mpsc::UnboundedSender<FocusChange>,
    hub: Arc<CallbackHub>,
    dual_tuners: bool,
    initialized: bool,
}

impl TunerSessionManager {
    /// Discovers the hardware through `resources` and spawns the session
    /// actor. The first module becomes the foreground tuner.
    ///
    /// Without modules or band configs the session still starts, but every
    /// tuner operation fails with [`RadioError::NotInitialized`].
    pub fn start(
        config: &Config,
        resources: TunerResources,
        hub: Arc<CallbackHub>,
        focus: Arc<dyn AudioFocusPlatform>,
        scanner: Option<BackgroundScanner>,
        spawner: &TokioSpawner,
        cancel: CancellationToken,
    ) -> Self {
        let modules = resources.hal.modules();
        let slot = modules.first().map(|m| m.id);
        let initialized = slot.is_some() && !resources.bands.is_empty();
        let dual_tuners = modules.len() >= DUAL_TUNER_MODULES;
        if !initialized {
            log::warn!("[SessionManager] No usable radio module found");
        }
        log::info!(
            "[SessionManager] Starting with {} module(s), dual tuners: {}",
            modules.len(),
            dual_tuners
        );

        let (commands, command_rx) = mpsc::channel(config.command_queue_capacity);
        let (focus_changes, focus_rx) = mpsc::unbounded_channel();
        let arbiter = FocusArbiter::new(focus, Arc::clone(&hub));
        let (actor, inbox) = SessionActor::new(
            config,
            resources,
            slot,
            initialized,
            arbiter,
            Arc::clone(&hub),
            scanner,
            spawner.clone(),
        );
        spawner.spawn(actor.run(inbox, command_rx, focus_rx, cancel));

        Self {
            commands,
            focus_changes,
            hub,
            dual_tuners,
            initialized,
        }
    }

    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> RadioResult<T> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(make(reply))
            .await
            .map_err(|_| RadioError::SessionClosed)?;
        rx.await.map_err(|_| RadioError::SessionClosed)
    }

    /// Opens the tuner on `band`, or reconfigures the open tuner.
    ///
    /// Returns once the request was accepted. Listeners hear
    /// [`BandChanged`](crate::events::RadioEvent::BandChanged) only after
    /// the hardware confirms the band.
    pub async fn open_band(&self, band: Band) -> RadioResult<()> {
        self.request(|reply| Command::OpenBand { band, reply }).await?
    }

    /// Tunes to `station`, opening or switching the band first if needed.
    pub async fn tune(&self, station: StationIdentity) -> RadioResult<()> {
        self.request(|reply| Command::Tune { station, reply }).await?
    }

    pub async fn seek_forward(&self) -> RadioResult<()> {
        self.seek(ScanDirection::Up).await
    }

    pub async fn seek_backward(&self) -> RadioResult<()> {
        self.seek(ScanDirection::Down).await
    }

    async fn seek(&self, direction: ScanDirection) -> RadioResult<()> {
        self.request(|reply| Command::Seek { direction, reply }).await?
    }

    /// Abandons audio focus. Returns false if focus was not held.
    pub async fn mute(&self) -> bool {
        self.request(|reply| Command::Mute { reply })
            .await
            .unwrap_or(false)
    }

    /// Requests audio focus. Returns true if it was granted.
    pub async fn un_mute(&self) -> bool {
        self.request(|reply| Command::UnMute { reply })
            .await
            .unwrap_or(false)
    }

    /// True when focus is not held or the platform reports media muted.
    pub async fn is_muted(&self) -> bool {
        self.request(|reply| Command::IsMuted { reply })
            .await
            .unwrap_or(true)
    }

    pub async fn has_focus(&self) -> bool {
        self.request(|reply| Command::HasFocus { reply })
            .await
            .unwrap_or(false)
    }

    /// The station the tuner is on, with its latest metadata.
    pub async fn current_station(&self) -> Option<Station> {
        self.request(|reply| Command::CurrentStation { reply })
            .await
            .ok()
            .flatten()
    }

    pub async fn snapshot(&self) -> RadioResult<SessionSnapshot> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    /// Stops the session: cancels the pending reopen, drops every listener,
    /// closes the tuner and abandons focus. Later calls fail with
    /// [`RadioError::SessionClosed`].
    pub async fn shutdown(&self) {
        if self.request(|reply| Command::Shutdown { reply }).await.is_err() {
            log::debug!("[SessionManager] Already shut down");
        }
    }

    /// Forwards a platform focus change to the session.
    pub fn notify_focus_change(&self, change: FocusChange) {
        if self.focus_changes.send(change).is_err() {
            log::debug!("[SessionManager] Focus change after shutdown: {:?}", change);
        }
    }

    pub fn register_listener(&self, listener: Arc<dyn RadioListener>) -> ListenerId {
        self.hub.register(listener)
    }

    pub fn unregister_listener(&self, id: ListenerId) -> bool {
        self.hub.unregister(id)
    }

    #[must_use]
    pub fn has_dual_tuners(&self) -> bool {
        self.dual_tuners
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }
}
