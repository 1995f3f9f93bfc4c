//! Trait abstractions for radio hardware.
//!
//! These traits enable dependency injection for testability. The session
//! manager and the background scanner depend on [`RadioHal`] rather than a
//! concrete driver; the simulated radio in [`crate::sim`] implements it for
//! demo mode and tests.

use crate::band::BandConfig;
use crate::error::HalError;
use crate::hardware::{ModuleProperties, ProgramInfo, ScanDirection, SlotId, TunerEventSink};

/// Entry point to the platform radio service.
pub trait RadioHal: Send + Sync {
    /// Lists the hardware modules and their band capabilities.
    fn modules(&self) -> Vec<ModuleProperties>;

    /// Opens a tuner on `slot` configured for `config`.
    ///
    /// The driver delivers all events for the returned device through
    /// `events`, typically starting with `ConfigurationChanged` once the
    /// hardware has applied the config.
    fn open(
        &self,
        slot: SlotId,
        config: &BandConfig,
        events: TunerEventSink,
    ) -> Result<Box<dyn TunerDevice>, HalError>;
}

/// One opened tuner as the driver exposes it.
///
/// Calls are asynchronous requests: results arrive later as events.
pub trait TunerDevice: Send {
    /// Tunes to `channel` / `sub_channel`.
    fn tune(&mut self, channel: u32, sub_channel: u32) -> Result<(), HalError>;

    /// Seeks to the next station in `direction`.
    fn scan(&mut self, direction: ScanDirection) -> Result<(), HalError>;

    /// Applies a new band configuration.
    fn set_configuration(&mut self, config: &BandConfig) -> Result<(), HalError>;

    /// Reads the current program information, if the tuner has one.
    fn program_info(&self) -> Option<ProgramInfo>;

    /// Releases the hardware. Called exactly once.
    fn close(&mut self);
}
