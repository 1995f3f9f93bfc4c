//! Runtime configuration for the radio core.

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_COMMAND_QUEUE_CAPACITY, DEFAULT_EVENT_CHANNEL_CAPACITY, DEFAULT_REOPEN_BASE_DELAY_MS,
    DEFAULT_SCAN_MAX_STEPS,
};
use crate::error::ConfigError;
use crate::station::Band;

/// Configuration for the tuner session and background scanner.
///
/// All fields have sensible defaults.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    // Retry
    /// Base delay of the linear reopen backoff (milliseconds).
    pub reopen_base_delay_ms: u64,

    // Background scan
    /// Scan requests per sweep before the scanner gives up on loop-back.
    pub scan_max_steps: u32,

    /// Run the background scanner when a second tuner exists.
    pub background_scan: bool,

    // Session
    /// Band opened when an operation needs a tuner and none was requested yet.
    pub default_band: Band,

    /// Request stereo where the hardware supports it.
    pub stereo: bool,

    // Channels
    /// Capacity of the session command queue.
    pub command_queue_capacity: usize,

    /// Capacity of the broadcast listener bridge.
    pub event_channel_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            reopen_base_delay_ms: DEFAULT_REOPEN_BASE_DELAY_MS,
            scan_max_steps: DEFAULT_SCAN_MAX_STEPS,
            background_scan: true,
            default_band: Band::Fm,
            stereo: true,
            command_queue_capacity: DEFAULT_COMMAND_QUEUE_CAPACITY,
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
        }
    }
}

impl Config {
    /// Validates the configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scan_max_steps == 0 {
            return Err(ConfigError("scan_max_steps must be >= 1".to_string()));
        }
        if self.reopen_base_delay_ms == 0 {
            return Err(ConfigError("reopen_base_delay_ms must be >= 1".to_string()));
        }
        if self.command_queue_capacity == 0 {
            return Err(ConfigError(
                "command_queue_capacity must be >= 1 (mpsc::channel panics on 0)".to_string(),
            ));
        }
        if self.event_channel_capacity == 0 {
            return Err(ConfigError(
                "event_channel_capacity must be >= 1 (broadcast::channel panics on 0)".to_string(),
            ));
        }
        Ok(())
    }
}
