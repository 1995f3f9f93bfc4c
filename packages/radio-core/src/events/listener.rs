//! Listener abstraction for decoupling the session from its consumers.
//!
//! The session depends on the [`RadioListener`] trait rather than on a UI or
//! transport, so display controllers, bridges and test recorders all plug in
//! the same way.

use crate::error::ListenerError;

use super::RadioEvent;

/// Receives session events.
///
/// Called on the session's own task, in the order the hardware produced the
/// events. Implementations must not block; a returned error is logged and
/// does not affect other listeners.
///
/// # Example
///
/// ```ignore
/// struct Display;
///
/// impl RadioListener for Display {
///     fn on_event(&self, event: &RadioEvent) -> Result<(), ListenerError> {
///         if let RadioEvent::StationChanged { station } = event {
///             println!("now playing {}", station.identity);
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait RadioListener: Send + Sync {
    fn on_event(&self, event: &RadioEvent) -> Result<(), ListenerError>;
}

/// Discards every event.
pub struct NoopListener;

impl RadioListener for NoopListener {
    fn on_event(&self, _event: &RadioEvent) -> Result<(), ListenerError> {
        Ok(())
    }
}

/// Logs all events at debug level.
pub struct LoggingListener;

impl RadioListener for LoggingListener {
    fn on_event(&self, event: &RadioEvent) -> Result<(), ListenerError> {
        match event {
            RadioEvent::Error { code } => tracing::warn!(?code, "radio_error"),
            _ => tracing::debug!(?event, "radio_event"),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::TunerErrorCode;
    use crate::station::Band;

    #[test]
    fn builtin_listeners_accept_every_event() {
        let events = [
            RadioEvent::BandChanged { band: Band::Am },
            RadioEvent::MuteChanged { muted: false },
            RadioEvent::MetadataChanged { metadata: None },
            RadioEvent::Error {
                code: TunerErrorCode::Config,
            },
        ];
        for event in &events {
            assert!(NoopListener.on_event(event).is_ok());
            assert!(LoggingListener.on_event(event).is_ok());
        }
    }
}
