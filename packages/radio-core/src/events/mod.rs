//! Listener-facing event system.
//!
//! This module provides:
//! - [`RadioEvent`], the closed set of notifications listeners receive
//! - [`RadioListener`] trait plus [`NoopListener`] and [`LoggingListener`]
//! - [`CallbackHub`], the fan-out registry the session dispatches through
//! - [`BroadcastListener`], a bridge into a `tokio::sync::broadcast` channel

mod bridge;
mod hub;
mod listener;

pub use bridge::BroadcastListener;
pub use hub::{CallbackHub, ListenerId};
pub use listener::{LoggingListener, NoopListener, RadioListener};

use serde::Serialize;

use crate::hardware::TunerErrorCode;
use crate::station::{Band, Station, StationMetadata};

/// Events delivered to registered listeners.
///
/// Band changes are only reported once the hardware confirmed them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RadioEvent {
    /// The tuner settled on a station.
    StationChanged { station: Station },

    /// RDS metadata of the current station changed. `None` clears it.
    MetadataChanged {
        #[serde(skip_serializing_if = "Option::is_none")]
        metadata: Option<StationMetadata>,
    },

    /// The hardware confirmed a band change.
    BandChanged { band: Band },

    /// Audible state changed through focus or an explicit mute.
    MuteChanged { muted: bool },

    /// A tuner error, fatal or informational.
    Error { code: TunerErrorCode },
}
