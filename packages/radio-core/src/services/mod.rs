//! Tuner services layer.
//!
//! - `session_manager` - the foreground session: focus, tuning, reopen
//! - `background_scanner` - full-band sweep on the secondary tuner
//! - `retry_supervisor` - reopen timer with linear backoff

use std::sync::Arc;

use crate::band::BandConfigTable;
use crate::hardware::{RadioHal, SlotRegistry};

pub mod background_scanner;
mod retry_supervisor;
mod session_actor;
pub mod session_manager;

pub use background_scanner::{BackgroundScanner, ScanSnapshot};
pub use retry_supervisor::RetrySupervisor;
pub use session_manager::{SessionSnapshot, SessionState, TunerSessionManager};

/// Hardware access shared by the session and the scanner.
#[derive(Clone)]
pub struct TunerResources {
    pub hal: Arc<dyn RadioHal>,
    /// Slot exclusivity across both owners.
    pub slots: Arc<SlotRegistry>,
    pub bands: Arc<BandConfigTable>,
}
