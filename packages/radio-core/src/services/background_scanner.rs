//! Full-band sweep on the secondary tuner.
//!
//! The scanner owns its own tuner slot and runs as its own actor, so a sweep
//! that takes tens of seconds never blocks foreground tuning. It needs no
//! audio focus because the secondary tuner is never audible.
//!
//! A sweep starts with `scan(Up)`. The first program-info event marks the
//! starting channel; every later channel is recorded (replace-by-identity)
//! and followed by the next `scan(Up)`. Returning to the starting channel
//! closes the tuner and writes the list to storage. A band with no stations
//! never loops back, so the sweep also ends after a fixed number of scan
//! requests.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::band::BandConfig;
use crate::error::{RadioError, RadioResult};
use crate::hardware::{
    HandleDisposition, HandleId, ScanDirection, SlotEvent, SlotId, TunerEvent, TunerHandle,
};
use crate::runtime::{TaskSpawner, TokioSpawner};
use crate::station::{Band, Station, StationIdentity, StationMetadata};
use crate::store::StationStore;

use super::TunerResources;

/// Observable state of the scanner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanSnapshot {
    pub band: Option<Band>,
    pub starting_channel: Option<u32>,
    pub stations: Vec<Station>,
    pub steps: u32,
    pub running: bool,
    pub completed_sweeps: u32,
}

enum ScanCommand {
    BandChanged(Band),
    Snapshot(oneshot::Sender<ScanSnapshot>),
    Stop(oneshot::Sender<()>),
}

/// Handle to the background scanner actor.
#[derive(Clone)]
pub struct BackgroundScanner {
    commands: mpsc::UnboundedSender<ScanCommand>,
}

impl BackgroundScanner {
    /// Spawns the scanner actor on `slot`.
    pub fn spawn(
        slot: SlotId,
        resources: TunerResources,
        store: Arc<dyn StationStore>,
        max_steps: u32,
        spawner: &TokioSpawner,
        cancel: CancellationToken,
    ) -> Self {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let actor = ScannerActor::new(slot, resources, store, max_steps, events_tx);
        spawner.spawn(actor.run(command_rx, events_rx, cancel));
        log::info!("[BackgroundScanner] Started on tuner {}", slot);
        Self { commands }
    }

    /// Restarts the sweep for `band`. Never blocks.
    pub fn on_radio_band_changed(&self, band: Band) {
        if self.commands.send(ScanCommand::BandChanged(band)).is_err() {
            log::debug!("[BackgroundScanner] Scanner stopped, ignoring band {}", band);
        }
    }

    /// Returns `None` once the scanner has stopped.
    pub async fn snapshot(&self) -> Option<ScanSnapshot> {
        let (tx, rx) = oneshot::channel();
        self.commands.send(ScanCommand::Snapshot(tx)).ok()?;
        rx.await.ok()
    }

    /// Stops the actor and closes its tuner.
    pub async fn stop(&self) {
        let (tx, rx) = oneshot::channel();
        if self.commands.send(ScanCommand::Stop(tx)).is_ok() {
            let _ = rx.await;
        }
    }
}

struct ScanState {
    band: Band,
    /// Set once the tuner confirmed the band; earlier events belong to the
    /// previous configuration.
    configured: bool,
    starting_channel: Option<u32>,
    /// Channel of the last program-info event handled.
    last_channel: Option<u32>,
    stations: Vec<Station>,
    steps: u32,
}

impl ScanState {
    fn new(band: Band) -> Self {
        Self {
            band,
            configured: false,
            starting_channel: None,
            last_channel: None,
            stations: Vec::new(),
            steps: 0,
        }
    }

    /// Records `channel`, keeping its discovery position. Known metadata is
    /// only replaced by new metadata.
    fn record(&mut self, channel: u32, metadata: Option<StationMetadata>) {
        let identity = StationIdentity::main(channel, self.band);
        match self.stations.iter_mut().find(|s| s.identity == identity) {
            Some(existing) => {
                if metadata.is_some() {
                    existing.metadata = metadata;
                }
            }
            None => self.stations.push(Station::new(identity, metadata)),
        }
    }
}

/// A finished sweep waiting to be stored.
#[derive(Debug)]
struct Sweep {
    band: Band,
    stations: Vec<Station>,
}

struct ScannerActor {
    slot: SlotId,
    resources: TunerResources,
    store: Arc<dyn StationStore>,
    max_steps: u32,
    handle: Option<TunerHandle>,
    next_handle: u64,
    scan: Option<ScanState>,
    completed_sweeps: u32,
    /// Band requested while the tuner was suspended, swept on `ControlRegained`.
    pending_band: Option<Band>,
    events_tx: mpsc::UnboundedSender<SlotEvent>,
}

impl ScannerActor {
    fn new(
        slot: SlotId,
        resources: TunerResources,
        store: Arc<dyn StationStore>,
        max_steps: u32,
        events_tx: mpsc::UnboundedSender<SlotEvent>,
    ) -> Self {
        Self {
            slot,
            resources,
            store,
            max_steps,
            handle: None,
            next_handle: 0,
            scan: None,
            completed_sweeps: 0,
            pending_band: None,
            events_tx,
        }
    }

    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<ScanCommand>,
        mut events: mpsc::UnboundedReceiver<SlotEvent>,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => break,

                Some(event) = events.recv() => {
                    if let Some(sweep) = self.on_hardware_event(event) {
                        flush(Arc::clone(&self.store), sweep).await;
                    }
                }

                command = commands.recv() => match command {
                    Some(ScanCommand::BandChanged(band)) => {
                        if let Some(sweep) = self.on_radio_band_changed(band) {
                            flush(Arc::clone(&self.store), sweep).await;
                        }
                    }
                    Some(ScanCommand::Snapshot(reply)) => {
                        let _ = reply.send(self.snapshot());
                    }
                    Some(ScanCommand::Stop(reply)) => {
                        self.stop();
                        let _ = reply.send(());
                        return;
                    }
                    None => break,
                },
            }
        }
        self.stop();
    }

    fn stop(&mut self) {
        self.scan = None;
        self.pending_band = None;
        self.close_handle();
        log::info!("[BackgroundScanner] Stopped");
    }

    fn on_radio_band_changed(&mut self, band: Band) -> Option<Sweep> {
        self.scan = None;
        self.pending_band = None;

        let Some(config) = self.resources.bands.get(band).cloned() else {
            log::warn!("[BackgroundScanner] No band config for {}, not scanning", band);
            return None;
        };
        match self.prepare(&config) {
            Ok(()) => {}
            Err(RadioError::NotReady) => {
                log::debug!(
                    "[BackgroundScanner] Tuner suspended, {} sweep waits for control",
                    band
                );
                self.pending_band = Some(band);
                return None;
            }
            Err(e) => {
                log::warn!("[BackgroundScanner] Cannot start {} sweep: {}", band, e);
                return None;
            }
        }

        log::info!("[BackgroundScanner] Starting {} sweep", band);
        self.scan = Some(ScanState::new(band));
        self.step()
    }

    /// Reconfigures the open tuner or opens a new one.
    fn prepare(&mut self, config: &BandConfig) -> RadioResult<()> {
        if let Some(handle) = self.handle.as_mut() {
            return handle.set_configuration(config);
        }
        self.next_handle += 1;
        let handle = TunerHandle::open(
            self.resources.hal.as_ref(),
            &self.resources.slots,
            self.slot,
            HandleId(self.next_handle),
            config,
            &self.events_tx,
        )?;
        self.handle = Some(handle);
        Ok(())
    }

    /// Issues the next `scan(Up)`, or ends the sweep at the step cap.
    fn step(&mut self) -> Option<Sweep> {
        let scan = self.scan.as_mut()?;
        if scan.steps >= self.max_steps {
            log::warn!(
                "[BackgroundScanner] {} did not loop back after {} steps, storing {} station(s)",
                scan.band,
                scan.steps,
                scan.stations.len()
            );
            return self.finish();
        }

        let handle = self.handle.as_mut()?;
        match handle.scan(ScanDirection::Up) {
            Ok(()) => scan.steps += 1,
            Err(RadioError::NotReady) => {
                log::debug!("[BackgroundScanner] Tuner suspended, waiting for control");
            }
            Err(e) => {
                log::warn!("[BackgroundScanner] Scan request failed, aborting: {}", e);
                self.scan = None;
            }
        }
        None
    }

    fn finish(&mut self) -> Option<Sweep> {
        let scan = self.scan.take()?;
        self.close_handle();
        self.completed_sweeps += 1;
        Some(Sweep {
            band: scan.band,
            stations: scan.stations,
        })
    }

    fn close_handle(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            handle.close();
        }
    }

    fn on_hardware_event(&mut self, tagged: SlotEvent) -> Option<Sweep> {
        let handle = self
            .handle
            .as_mut()
            .filter(|handle| handle.id() == tagged.handle)?;
        let disposition = handle.on_event(&tagged.event);

        match tagged.event {
            TunerEvent::ProgramInfoChanged { info } => self.on_program_info(info.channel),
            TunerEvent::MetadataChanged { metadata } => {
                self.on_metadata(metadata);
                None
            }
            TunerEvent::Error { code } if disposition == HandleDisposition::ReopenRequired => {
                log::warn!("[BackgroundScanner] Tuner failed ({:?}), sweep aborted", code);
                self.handle = None;
                self.scan = None;
                None
            }
            TunerEvent::Error { code } => {
                log::debug!("[BackgroundScanner] Tuner reported {:?}, continuing", code);
                self.step()
            }
            TunerEvent::ConfigurationChanged { band } => {
                if let Some(scan) = self.scan.as_mut() {
                    if scan.band.is_am() == band.is_am() {
                        scan.configured = true;
                    }
                }
                None
            }
            TunerEvent::ControlRegained => match self.pending_band.take() {
                Some(band) => self.on_radio_band_changed(band),
                None => self.step(),
            },
            TunerEvent::ControlLost => None,
        }
    }

    fn on_program_info(&mut self, channel: u32) -> Option<Sweep> {
        let scan = self.scan.as_mut().filter(|scan| scan.configured)?;
        scan.last_channel = Some(channel);

        match scan.starting_channel {
            Some(start) if start == channel => {
                log::info!(
                    "[BackgroundScanner] {} sweep complete: {} station(s)",
                    scan.band,
                    scan.stations.len()
                );
                return self.finish();
            }
            Some(_) => scan.record(channel, None),
            None => {
                scan.starting_channel = Some(channel);
                scan.record(channel, None);
            }
        }
        self.step()
    }

    fn on_metadata(&mut self, metadata: StationMetadata) {
        let Some(scan) = self.scan.as_mut().filter(|scan| scan.configured) else {
            return;
        };
        let channel = scan.last_channel.or_else(|| {
            self.handle
                .as_ref()
                .and_then(|handle| handle.program_info())
                .map(|info| info.channel)
        });
        let Some(channel) = channel else {
            log::debug!("[BackgroundScanner] Metadata without a channel, ignoring");
            return;
        };

        scan.last_channel = Some(channel);
        let program_service = metadata
            .program_service
            .filter(|name| !name.is_empty())
            .map(StationMetadata::program_service);
        scan.record(channel, program_service);
    }

    fn snapshot(&self) -> ScanSnapshot {
        match self.scan {
            Some(ref scan) => ScanSnapshot {
                band: Some(scan.band),
                starting_channel: scan.starting_channel,
                stations: scan.stations.clone(),
                steps: scan.steps,
                running: true,
                completed_sweeps: self.completed_sweeps,
            },
            None => ScanSnapshot {
                band: None,
                starting_channel: None,
                stations: Vec::new(),
                steps: 0,
                running: false,
                completed_sweeps: self.completed_sweeps,
            },
        }
    }
}

/// Stores a finished sweep.
async fn flush(store: Arc<dyn StationStore>, sweep: Sweep) {
    let count = sweep.stations.len();
    match store.replace_pre_scanned(sweep.band, sweep.stations).await {
        Ok(()) => log::debug!(
            "[BackgroundScanner] Flushed {} station(s) for {}",
            count,
            sweep.band
        ),
        Err(e) => log::warn!("[BackgroundScanner] Failed to store {} sweep: {}", sweep.band, e),
    }
}
