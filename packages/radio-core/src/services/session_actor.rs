//! The task that owns the foreground tuner session.
//!
//! Every mutation of the session happens here, one message at a time:
//! hardware events, platform focus changes, reopen timer fires and caller
//! commands share one loop. Hardware events are taken first so the state a
//! command observes already reflects everything the tuner reported before it.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::band::BandConfig;
use crate::config::Config;
use crate::error::{RadioError, RadioResult};
use crate::events::{CallbackHub, RadioEvent};
use crate::focus::{FocusArbiter, FocusChange, FocusRequest};
use crate::hardware::{
    HandleDisposition, HandleId, ScanDirection, SlotEvent, SlotId, TunerErrorCode, TunerEvent,
    TunerHandle,
};
use crate::runtime::TokioSpawner;
use crate::station::{Band, Station, StationIdentity, StationMetadata};

use super::background_scanner::BackgroundScanner;
use super::retry_supervisor::RetrySupervisor;
use super::session_manager::{SessionSnapshot, SessionState};
use super::TunerResources;

pub(super) enum Command {
    OpenBand {
        band: Band,
        reply: oneshot::Sender<RadioResult<()>>,
    },
    Tune {
        station: StationIdentity,
        reply: oneshot::Sender<RadioResult<()>>,
    },
    Seek {
        direction: ScanDirection,
        reply: oneshot::Sender<RadioResult<()>>,
    },
    Mute {
        reply: oneshot::Sender<bool>,
    },
    UnMute {
        reply: oneshot::Sender<bool>,
    },
    IsMuted {
        reply: oneshot::Sender<bool>,
    },
    HasFocus {
        reply: oneshot::Sender<bool>,
    },
    CurrentStation {
        reply: oneshot::Sender<Option<Station>>,
    },
    Snapshot {
        reply: oneshot::Sender<SessionSnapshot>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Receivers the actor owns besides its command queue.
pub(super) struct SessionInbox {
    events: mpsc::UnboundedReceiver<SlotEvent>,
    fires: mpsc::UnboundedReceiver<u64>,
}

pub(super) struct SessionActor {
    resources: TunerResources,
    /// Foreground slot, `None` without hardware.
    slot: Option<SlotId>,
    initialized: bool,
    default_band: Band,
    hub: Arc<CallbackHub>,
    focus: FocusArbiter,
    retry: RetrySupervisor,
    scanner: Option<BackgroundScanner>,
    events_tx: mpsc::UnboundedSender<SlotEvent>,
    next_handle: u64,

    state: SessionState,
    handle: Option<TunerHandle>,
    /// Band confirmed by the hardware.
    current_band: Option<Band>,
    /// Band the tuner was last opened or configured for.
    requested_band: Option<Band>,
    current_channel: Option<u32>,
    metadata: Option<StationMetadata>,
}

impl SessionActor {
    #[allow(clippy::too_many_arguments)]
    pub(super) fn new(
        config: &Config,
        resources: TunerResources,
        slot: Option<SlotId>,
        initialized: bool,
        focus: FocusArbiter,
        hub: Arc<CallbackHub>,
        scanner: Option<BackgroundScanner>,
        spawner: TokioSpawner,
    ) -> (Self, SessionInbox) {
        let (events_tx, events) = mpsc::unbounded_channel();
        let (fire_tx, fires) = mpsc::unbounded_channel();
        let retry = RetrySupervisor::new(
            Duration::from_millis(config.reopen_base_delay_ms),
            fire_tx,
            spawner,
        );
        let actor = Self {
            resources,
            slot,
            initialized,
            default_band: config.default_band,
            hub,
            focus,
            retry,
            scanner,
            events_tx,
            next_handle: 0,
            state: SessionState::Closed,
            handle: None,
            current_band: None,
            requested_band: None,
            current_channel: None,
            metadata: None,
        };
        (actor, SessionInbox { events, fires })
    }

    pub(super) async fn run(
        mut self,
        mut inbox: SessionInbox,
        mut commands: mpsc::Receiver<Command>,
        mut focus_changes: mpsc::UnboundedReceiver<FocusChange>,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => break,

                Some(event) = inbox.events.recv() => self.on_hardware_event(event),

                Some(change) = focus_changes.recv() => self.on_focus_change(change),

                Some(generation) = inbox.fires.recv() => self.on_reopen_fired(generation),

                command = commands.recv() => match command {
                    Some(Command::Shutdown { reply }) => {
                        self.shutdown(&mut inbox.events);
                        let _ = reply.send(());
                        return;
                    }
                    Some(command) => self.handle_command(command),
                    None => break,
                },
            }
        }
        self.shutdown(&mut inbox.events);
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::OpenBand { band, reply } => {
                let _ = reply.send(self.open_band(band));
            }
            Command::Tune { station, reply } => {
                let _ = reply.send(self.tune(station));
            }
            Command::Seek { direction, reply } => {
                let _ = reply.send(self.seek(direction));
            }
            Command::Mute { reply } => {
                let _ = reply.send(self.mute());
            }
            Command::UnMute { reply } => {
                let _ = reply.send(self.un_mute());
            }
            Command::IsMuted { reply } => {
                let _ = reply.send(self.focus.is_muted());
            }
            Command::HasFocus { reply } => {
                let _ = reply.send(self.focus.is_held());
            }
            Command::CurrentStation { reply } => {
                let _ = reply.send(self.current_station());
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
            Command::Shutdown { reply } => {
                // Handled by the run loop.
                let _ = reply.send(());
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Operations
    // ─────────────────────────────────────────────────────────────────────────────

    fn ensure_ready(&self) -> RadioResult<()> {
        if !self.initialized {
            return Err(RadioError::NotInitialized);
        }
        if self.state == SessionState::Suspended {
            return Err(RadioError::NotReady);
        }
        Ok(())
    }

    fn request_focus(&mut self) -> RadioResult<()> {
        match self.focus.request() {
            FocusRequest::Granted => Ok(()),
            FocusRequest::Denied => {
                log::warn!("[SessionManager] Audio focus request denied");
                Err(RadioError::FocusDenied)
            }
        }
    }

    fn open_band(&mut self, band: Band) -> RadioResult<()> {
        self.ensure_ready()?;
        self.request_focus()?;
        self.open_band_with_focus(band)
    }

    /// Opens or reconfigures the tuner for `band`. The band is reported to
    /// listeners once the hardware confirms it.
    fn open_band_with_focus(&mut self, band: Band) -> RadioResult<()> {
        let Some(config) = self.resources.bands.get(band).cloned() else {
            log::warn!("[SessionManager] Cannot create config for band {}", band);
            return Err(RadioError::NoBandConfig(band));
        };

        match self.handle.as_mut() {
            Some(handle) => handle.set_configuration(&config)?,
            None => self.open_handle(&config)?,
        }

        log::info!("[SessionManager] Opened {} on tuner", band);
        self.requested_band = Some(band);
        self.state = SessionState::Opening;
        self.retry.cancel();
        self.retry.reset();
        if let Some(ref scanner) = self.scanner {
            scanner.on_radio_band_changed(band);
        }
        Ok(())
    }

    fn open_handle(&mut self, config: &BandConfig) -> RadioResult<()> {
        let slot = self.slot.ok_or(RadioError::NotInitialized)?;
        self.next_handle += 1;
        let handle = TunerHandle::open(
            self.resources.hal.as_ref(),
            &self.resources.slots,
            slot,
            HandleId(self.next_handle),
            config,
            &self.events_tx,
        )?;
        self.handle = Some(handle);
        Ok(())
    }

    fn tune(&mut self, station: StationIdentity) -> RadioResult<()> {
        self.ensure_ready()?;
        self.request_focus()?;

        if self.handle.is_none() || self.requested_band != Some(station.band()) {
            self.open_band_with_focus(station.band())
                .map_err(|e| self.report_open_failure(e))?;
        }

        let handle = self.handle.as_mut().ok_or(RadioError::NotReady)?;
        handle.tune(station.channel(), station.sub_channel())?;
        log::debug!("[SessionManager] Tuning to {}", station);
        Ok(())
    }

    fn seek(&mut self, direction: ScanDirection) -> RadioResult<()> {
        self.ensure_ready()?;
        self.request_focus()?;

        if self.handle.is_none() {
            let band = self.requested_band.unwrap_or(self.default_band);
            self.open_band_with_focus(band)
                .map_err(|e| self.report_open_failure(e))?;
        }

        let handle = self.handle.as_mut().ok_or(RadioError::NotReady)?;
        handle.scan(direction)?;
        Ok(())
    }

    /// Listeners only hear about a missing band config, the one failure a
    /// caller cannot have anticipated.
    fn report_open_failure(&self, error: RadioError) -> RadioError {
        if let RadioError::NoBandConfig(_) = error {
            self.hub.dispatch(&RadioEvent::Error {
                code: TunerErrorCode::Config,
            });
        }
        error
    }

    fn mute(&mut self) -> bool {
        if !self.focus.is_held() {
            log::debug!("[SessionManager] mute() without audio focus, ignoring");
            return false;
        }
        self.focus.abandon();
        true
    }

    fn un_mute(&mut self) -> bool {
        self.initialized && self.focus.request() == FocusRequest::Granted
    }

    fn current_station(&mut self) -> Option<Station> {
        if self.current_channel.is_none() {
            self.current_channel = self
                .handle
                .as_ref()
                .and_then(TunerHandle::program_info)
                .map(|info| info.channel);
        }
        let band = self.current_band.or(self.requested_band)?;
        let channel = self.current_channel?;
        Some(Station::new(
            StationIdentity::main(channel, band),
            self.metadata.clone(),
        ))
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state,
            band: self.current_band,
            requested_band: self.requested_band,
            channel: self.current_channel,
            focus_held: self.focus.is_held(),
            reopen_attempts: self.retry.attempts(),
            pending_reopens: self.retry.pending_count(),
            pending_reopen_delay: self.retry.pending_delay(),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Asynchronous inputs
    // ─────────────────────────────────────────────────────────────────────────────

    fn on_hardware_event(&mut self, tagged: SlotEvent) {
        let Some(handle) = self
            .handle
            .as_mut()
            .filter(|handle| handle.id() == tagged.handle)
        else {
            log::trace!(
                "[SessionManager] Dropping event from detached handle {:?}",
                tagged.handle
            );
            return;
        };
        let disposition = handle.on_event(&tagged.event);

        match tagged.event {
            TunerEvent::ProgramInfoChanged { info } => {
                self.metadata = None;
                self.current_channel = Some(info.channel);
                if let Some(station) = self.current_station() {
                    self.hub.dispatch(&RadioEvent::StationChanged { station });
                }
            }
            TunerEvent::MetadataChanged { metadata } => {
                self.metadata = metadata.non_empty();
                self.hub.dispatch(&RadioEvent::MetadataChanged {
                    metadata: self.metadata.clone(),
                });
            }
            TunerEvent::ConfigurationChanged { band } => {
                self.metadata = None;
                if self.current_band.is_some_and(|b| b.is_am() != band.is_am()) {
                    self.current_channel = None;
                }
                self.current_band = Some(band);
                if self.state == SessionState::Opening {
                    self.state = SessionState::Open;
                }
                log::info!("[SessionManager] Hardware confirmed band {}", band);
                self.hub.dispatch(&RadioEvent::BandChanged { band });
            }
            TunerEvent::Error { code } => {
                if disposition == HandleDisposition::ReopenRequired {
                    log::error!("[SessionManager] Tuner failed with {:?}, reopening", code);
                    self.handle = None;
                    self.state = SessionState::Reopening;
                    self.retry.schedule_reopen();
                } else {
                    log::warn!("[SessionManager] Tuner reported {:?}", code);
                }
                self.hub.dispatch(&RadioEvent::Error { code });
            }
            TunerEvent::ControlLost => {
                if matches!(self.state, SessionState::Open | SessionState::Opening) {
                    self.state = SessionState::Suspended;
                }
            }
            TunerEvent::ControlRegained => {
                if self.state == SessionState::Suspended {
                    self.state = SessionState::Open;
                }
            }
        }
    }

    fn on_reopen_fired(&mut self, generation: u64) {
        if !self.retry.on_fire(generation) || self.state != SessionState::Reopening {
            return;
        }

        let band = self.requested_band.unwrap_or(self.default_band);
        log::info!(
            "[SessionManager] Reopening {} (attempt {})",
            band,
            self.retry.attempts()
        );
        match self.open_band(band) {
            Ok(()) => {}
            Err(RadioError::Hal(e)) => {
                log::warn!("[SessionManager] Reopen failed: {}", e);
                self.retry.schedule_reopen();
                self.hub.dispatch(&RadioEvent::Error {
                    code: TunerErrorCode::HardwareFailure,
                });
            }
            Err(e) => {
                log::warn!("[SessionManager] Reopen abandoned: {}", e);
                self.state = SessionState::Closed;
            }
        }
    }

    fn on_focus_change(&mut self, change: FocusChange) {
        log::debug!("[SessionManager] Focus change: {:?}", change);
        self.focus.on_focus_change(change);

        match change {
            FocusChange::Gained => {
                let Some(band) = self.requested_band else {
                    return;
                };
                if let Err(e) = self.open_band(band) {
                    log::warn!("[SessionManager] Reopen on focus gain failed: {}", e);
                }
            }
            FocusChange::Lost { transient: true } => {}
            FocusChange::Lost { transient: false } => self.close(),
        }
    }

    /// Closes the session after a permanent focus loss.
    fn close(&mut self) {
        self.retry.cancel();
        self.focus.abandon();
        self.close_handle();
        self.state = SessionState::Closed;
    }

    fn close_handle(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            handle.close();
        }
    }

    fn shutdown(&mut self, events: &mut mpsc::UnboundedReceiver<SlotEvent>) {
        log::info!("[SessionManager] Shutting down");
        self.retry.cancel();
        let listeners = self.hub.clear();
        events.close();
        self.close_handle();
        self.focus.abandon();
        self.state = SessionState::Closed;
        log::info!(
            "[SessionManager] Shutdown complete ({} listener(s) released)",
            listeners
        );
    }
}
