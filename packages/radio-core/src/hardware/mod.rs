//! Radio hardware abstraction.
//!
//! - `traits` - [`RadioHal`] and [`TunerDevice`], the driver seam
//! - `handle` - [`TunerHandle`], one opened tuner bound to one slot
//!
//! Hardware events are a closed set of tagged variants ([`TunerEvent`]). A
//! driver delivers them through a [`TunerEventSink`] from whatever thread it
//! calls back on; the owning actor receives them in arrival order.

mod handle;
mod traits;

pub use handle::{HandleDisposition, SlotRegistry, TunerHandle};
pub use traits::{RadioHal, TunerDevice};

use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::band::BandDescriptor;
use crate::station::{Band, StationMetadata};

/// Physical tuner slot (hardware module id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SlotId(pub u32);

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identity of one opened handle. Monotonic per owner; events tagged with a
/// stale id are discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HandleId(pub u64);

/// Capabilities of one hardware module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleProperties {
    pub id: SlotId,
    pub bands: Vec<BandDescriptor>,
}

/// Direction of a seek/scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanDirection {
    Up,
    Down,
}

/// Program information reported by the tuner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramInfo {
    pub channel: u32,
    pub sub_channel: u32,
}

impl ProgramInfo {
    pub fn new(channel: u32) -> Self {
        Self {
            channel,
            sub_channel: 0,
        }
    }
}

/// Error codes reported asynchronously by a tuner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TunerErrorCode {
    HardwareFailure,
    ServerDied,
    Cancelled,
    ScanTimeout,
    Config,
    Other(i32),
}

impl TunerErrorCode {
    /// Only hardware failure and server death close the handle and require
    /// a reopen. Every other code is informational.
    #[must_use]
    pub fn requires_reopen(self) -> bool {
        matches!(self, Self::HardwareFailure | Self::ServerDied)
    }
}

/// Events emitted by an opened tuner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TunerEvent {
    ProgramInfoChanged { info: ProgramInfo },
    MetadataChanged { metadata: StationMetadata },
    ConfigurationChanged { band: Band },
    Error { code: TunerErrorCode },
    /// Another process gained exclusive hardware control.
    ControlLost,
    ControlRegained,
}

/// A tuner event tagged with the handle that produced it.
#[derive(Debug, Clone)]
pub struct SlotEvent {
    pub slot: SlotId,
    pub handle: HandleId,
    pub event: TunerEvent,
}

/// Where a driver delivers events for one opened handle.
///
/// Sending never blocks and never fails loudly: once the owner is gone the
/// events are dropped.
#[derive(Debug, Clone)]
pub struct TunerEventSink {
    slot: SlotId,
    handle: HandleId,
    tx: mpsc::UnboundedSender<SlotEvent>,
}

impl TunerEventSink {
    pub fn new(slot: SlotId, handle: HandleId, tx: mpsc::UnboundedSender<SlotEvent>) -> Self {
        Self { slot, handle, tx }
    }

    pub fn slot(&self) -> SlotId {
        self.slot
    }

    pub fn handle(&self) -> HandleId {
        self.handle
    }

    /// Delivers an event to the owner.
    pub fn send(&self, event: TunerEvent) {
        let tagged = SlotEvent {
            slot: self.slot,
            handle: self.handle,
            event,
        };
        if self.tx.send(tagged).is_err() {
            log::trace!("[TunerEventSink] owner of slot {} is gone", self.slot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_fatal_codes_require_reopen() {
        assert!(TunerErrorCode::HardwareFailure.requires_reopen());
        assert!(TunerErrorCode::ServerDied.requires_reopen());
        assert!(!TunerErrorCode::Cancelled.requires_reopen());
        assert!(!TunerErrorCode::ScanTimeout.requires_reopen());
        assert!(!TunerErrorCode::Config.requires_reopen());
        assert!(!TunerErrorCode::Other(42).requires_reopen());
    }

    #[test]
    fn sink_tags_events_with_handle() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = TunerEventSink::new(SlotId(1), HandleId(7), tx);
        sink.send(TunerEvent::ControlLost);

        let tagged = rx.try_recv().unwrap();
        assert_eq!(tagged.slot, SlotId(1));
        assert_eq!(tagged.handle, HandleId(7));
        assert_eq!(tagged.event, TunerEvent::ControlLost);
    }

    #[test]
    fn sink_tolerates_dropped_owner() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let sink = TunerEventSink::new(SlotId(0), HandleId(1), tx);
        sink.send(TunerEvent::ControlRegained);
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let json = serde_json::to_value(TunerEvent::ConfigurationChanged { band: Band::Am }).unwrap();
        assert_eq!(json["type"], "configurationChanged");
        assert_eq!(json["band"], "AM");
    }
}
