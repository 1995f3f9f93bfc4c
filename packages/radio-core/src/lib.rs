//! Radio Core - tuner session management for a car radio service.
//!
//! The crate owns the foreground radio session: it opens a hardware tuner
//! for a band, tunes and seeks, arbitrates audio focus, recovers from tuner
//! failures with a linear backoff, and fans session events out to
//! registered listeners. On dual-tuner hardware a background scanner sweeps
//! the current band on the second tuner and stores what it finds.
//!
//! # Architecture
//!
//! - [`hardware`]: Driver seam ([`RadioHal`]) and the owned [`TunerHandle`]
//! - [`focus`]: Audio focus arbitration against the platform
//! - [`services`]: Session manager, background scanner and reopen supervisor
//! - [`events`]: Listener events and the callback hub
//! - [`store`]: Preset and pre-scanned station storage
//! - [`sim`]: Simulated radio and focus platform for demo mode and tests
//! - [`bootstrap`]: Composition root
//!
//! # Abstraction Traits
//!
//! - [`RadioHal`](hardware::RadioHal): Tuner hardware
//! - [`AudioFocusPlatform`](focus::AudioFocusPlatform): Platform audio focus
//! - [`StationStore`](store::StationStore): Station persistence
//! - [`RadioListener`](events::RadioListener): Event consumers
//! - [`TaskSpawner`](runtime::TaskSpawner): Spawning background tasks

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod band;
pub mod bootstrap;
pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod focus;
pub mod hardware;
pub mod runtime;
pub mod services;
pub mod sim;
pub mod station;
pub mod store;

#[cfg(test)]
mod test_fixtures;

// Re-export commonly used types at the crate root
pub use band::{BandConfig, BandConfigTable, BandDescriptor};
pub use config::Config;
pub use error::{
    ConfigError, ErrorCode, HalError, ListenerError, RadioError, RadioResult, StoreError,
};
pub use events::{
    BroadcastListener, CallbackHub, ListenerId, LoggingListener, NoopListener, RadioEvent,
    RadioListener,
};
pub use focus::{AudioFocusPlatform, FocusChange, FocusRequest};
pub use hardware::{
    ModuleProperties, ProgramInfo, RadioHal, ScanDirection, SlotId, TunerDevice, TunerErrorCode,
    TunerEvent, TunerEventSink, TunerHandle,
};
pub use runtime::{TaskSpawner, TokioSpawner};
pub use station::{Band, Station, StationIdentity, StationMetadata};
pub use store::{MemoryStationStore, StationStore, StoreEvent};

// Re-export service types
pub use services::{
    BackgroundScanner, ScanSnapshot, SessionSnapshot, SessionState, TunerSessionManager,
};

// Re-export bootstrap types
pub use bootstrap::{bootstrap_radio, RadioServices};

// Re-export simulation types
pub use sim::{SimStation, SimulatedAudioFocus, SimulatedRadio};
