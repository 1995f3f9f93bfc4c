//! Centralized error types for the radio core library.
//!
//! Expected conditions (no focus, no config for a band, a suspended tuner)
//! are returned as [`RadioError`] values and never panic across the public
//! boundary. Hardware error codes reported asynchronously by a tuner are a
//! separate type, [`TunerErrorCode`](crate::hardware::TunerErrorCode).

use thiserror::Error;

use crate::hardware::SlotId;
use crate::station::Band;

/// Trait for error types that provide machine-readable error codes.
pub trait ErrorCode {
    /// Returns a machine-readable error code.
    fn code(&self) -> &'static str;
}

/// Errors reported by a raw tuner driver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HalError {
    /// The driver refused the request in its current state.
    #[error("driver unavailable: {0}")]
    Unavailable(String),

    /// An argument was outside what the hardware accepts.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The driver call failed.
    #[error("driver call failed: {0}")]
    Failed(String),
}

impl ErrorCode for HalError {
    fn code(&self) -> &'static str {
        match self {
            Self::Unavailable(_) => "hal_unavailable",
            Self::InvalidArgument(_) => "hal_invalid_argument",
            Self::Failed(_) => "hal_failed",
        }
    }
}

/// Session and handle level errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RadioError {
    /// The platform did not grant audio focus. Recoverable.
    #[error("audio focus denied")]
    FocusDenied,

    /// No hardware configuration is available for the band.
    #[error("no band config for {0}")]
    NoBandConfig(Band),

    /// The hardware slot already has an open handle.
    #[error("tuner slot {0} is busy")]
    SlotBusy(SlotId),

    /// The handle is suspended (control lost) or already closed.
    #[error("tuner not ready")]
    NotReady,

    /// No radio modules or no usable bands were found at startup.
    #[error("radio not initialized")]
    NotInitialized,

    /// The driver failed while opening or operating the tuner.
    #[error("hardware error: {0}")]
    Hal(#[from] HalError),

    /// The session manager has shut down.
    #[error("session closed")]
    SessionClosed,

    /// Startup configuration was rejected.
    #[error(transparent)]
    InvalidConfig(#[from] ConfigError),
}

impl ErrorCode for RadioError {
    fn code(&self) -> &'static str {
        match self {
            Self::FocusDenied => "focus_denied",
            Self::NoBandConfig(_) => "no_band_config",
            Self::SlotBusy(_) => "slot_busy",
            Self::NotReady => "not_ready",
            Self::NotInitialized => "not_initialized",
            Self::Hal(_) => "hardware_error",
            Self::SessionClosed => "session_closed",
            Self::InvalidConfig(_) => "invalid_config",
        }
    }
}

impl RadioError {
    /// Returns true for conditions a caller may simply retry later.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::FocusDenied | Self::NotReady | Self::Hal(_))
    }
}

/// Failure reported by a listener while handling an event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("listener failed: {0}")]
pub struct ListenerError(pub String);

/// Failures of the storage collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The station to delete was not stored.
    #[error("station not found: {0}")]
    NotFound(String),

    /// The backing store could not complete the operation.
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl ErrorCode for StoreError {
    fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "station_not_found",
            Self::Backend(_) => "storage_backend_error",
        }
    }
}

/// Invalid configuration value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid configuration: {0}")]
pub struct ConfigError(pub String);

/// Convenient Result alias for session operations.
pub type RadioResult<T> = Result<T, RadioError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hal_errors_convert_into_radio_errors() {
        let err: RadioError = HalError::Failed("boom".into()).into();
        assert_eq!(err.code(), "hardware_error");
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn slot_busy_is_not_recoverable() {
        assert!(!RadioError::SlotBusy(SlotId(0)).is_recoverable());
        assert!(RadioError::FocusDenied.is_recoverable());
        assert!(RadioError::NotReady.is_recoverable());
    }

    #[test]
    fn codes_are_stable() {
        assert_eq!(RadioError::NoBandConfig(Band::Am).code(), "no_band_config");
        assert_eq!(StoreError::NotFound("x".into()).code(), "station_not_found");
        assert_eq!(HalError::Unavailable("x".into()).code(), "hal_unavailable");
        let err: RadioError = ConfigError("bad".into()).into();
        assert_eq!(err.code(), "invalid_config");
    }
}
