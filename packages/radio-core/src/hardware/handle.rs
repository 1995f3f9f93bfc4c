//! Owned tuner handle with slot exclusivity and control-loss suspension.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::band::BandConfig;
use crate::error::{RadioError, RadioResult};
use crate::hardware::{
    HandleId, ProgramInfo, RadioHal, ScanDirection, SlotEvent, SlotId, TunerDevice, TunerEvent,
    TunerEventSink,
};

/// Tracks which hardware slots have an open handle.
///
/// Shared by every owner of tuners so that at most one handle per slot
/// exists at any time.
#[derive(Debug, Default)]
pub struct SlotRegistry {
    busy: Mutex<HashSet<SlotId>>,
}

impl SlotRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    #[must_use]
    pub fn is_busy(&self, slot: SlotId) -> bool {
        self.busy.lock().contains(&slot)
    }

    fn try_claim(self: &Arc<Self>, slot: SlotId) -> Option<SlotLease> {
        if !self.busy.lock().insert(slot) {
            return None;
        }
        Some(SlotLease {
            registry: Arc::clone(self),
            slot,
        })
    }
}

/// Releases the slot when dropped.
#[derive(Debug)]
struct SlotLease {
    registry: Arc<SlotRegistry>,
    slot: SlotId,
}

impl Drop for SlotLease {
    fn drop(&mut self) {
        self.registry.busy.lock().remove(&self.slot);
    }
}

/// What the owner must do after a handle processed an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleDisposition {
    Continue,
    /// The handle closed itself after a fatal error; discard it and reopen.
    ReopenRequired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HandleState {
    Active,
    Suspended,
    Closed,
}

/// Exactly one opened hardware tuner bound to one slot.
///
/// - `open` on a busy slot fails with [`RadioError::SlotBusy`].
/// - `ControlLost` suspends the handle; `tune`/`scan`/`set_configuration`
///   then return [`RadioError::NotReady`] until `ControlRegained`.
/// - `HardwareFailure` and `ServerDied` close the handle.
pub struct TunerHandle {
    id: HandleId,
    slot: SlotId,
    device: Box<dyn TunerDevice>,
    state: HandleState,
    lease: Option<SlotLease>,
}

impl TunerHandle {
    /// Opens a tuner on `slot`, tagging its events with `id`.
    pub fn open(
        hal: &dyn RadioHal,
        slots: &Arc<SlotRegistry>,
        slot: SlotId,
        id: HandleId,
        config: &BandConfig,
        events: &mpsc::UnboundedSender<SlotEvent>,
    ) -> RadioResult<Self> {
        let lease = slots.try_claim(slot).ok_or(RadioError::SlotBusy(slot))?;
        let sink = TunerEventSink::new(slot, id, events.clone());
        let device = hal.open(slot, config, sink)?;
        log::debug!(
            "[TunerHandle] opened slot {} as handle {} for {}",
            slot,
            id.0,
            config.band
        );
        Ok(Self {
            id,
            slot,
            device,
            state: HandleState::Active,
            lease: Some(lease),
        })
    }

    pub fn id(&self) -> HandleId {
        self.id
    }

    pub fn slot(&self) -> SlotId {
        self.slot
    }

    #[must_use]
    pub fn is_suspended(&self) -> bool {
        self.state == HandleState::Suspended
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state == HandleState::Closed
    }

    pub fn tune(&mut self, channel: u32, sub_channel: u32) -> RadioResult<()> {
        self.ensure_active()?;
        self.device.tune(channel, sub_channel)?;
        Ok(())
    }

    pub fn scan(&mut self, direction: ScanDirection) -> RadioResult<()> {
        self.ensure_active()?;
        self.device.scan(direction)?;
        Ok(())
    }

    pub fn set_configuration(&mut self, config: &BandConfig) -> RadioResult<()> {
        self.ensure_active()?;
        self.device.set_configuration(config)?;
        Ok(())
    }

    pub fn program_info(&self) -> Option<ProgramInfo> {
        if self.is_closed() {
            return None;
        }
        self.device.program_info()
    }

    /// Applies the handle-level effect of a hardware event.
    pub fn on_event(&mut self, event: &TunerEvent) -> HandleDisposition {
        match event {
            TunerEvent::ControlLost if self.state == HandleState::Active => {
                log::info!("[TunerHandle] slot {} lost control, suspending", self.slot);
                self.state = HandleState::Suspended;
            }
            TunerEvent::ControlRegained if self.state == HandleState::Suspended => {
                log::info!("[TunerHandle] slot {} regained control", self.slot);
                self.state = HandleState::Active;
            }
            TunerEvent::Error { code } if code.requires_reopen() => {
                log::warn!(
                    "[TunerHandle] slot {} reported {:?}, closing handle",
                    self.slot,
                    code
                );
                self.close();
                return HandleDisposition::ReopenRequired;
            }
            _ => {}
        }
        HandleDisposition::Continue
    }

    /// Closes the device and releases the slot. Idempotent.
    pub fn close(&mut self) {
        if self.state == HandleState::Closed {
            return;
        }
        self.device.close();
        self.state = HandleState::Closed;
        self.lease.take();
        log::debug!("[TunerHandle] closed handle {} on slot {}", self.id.0, self.slot);
    }

    fn ensure_active(&self) -> RadioResult<()> {
        match self.state {
            HandleState::Active => Ok(()),
            HandleState::Suspended | HandleState::Closed => Err(RadioError::NotReady),
        }
    }
}

impl Drop for TunerHandle {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for TunerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TunerHandle")
            .field("id", &self.id)
            .field("slot", &self.slot)
            .field("state", &self.state)
            .finish()
    }
}
