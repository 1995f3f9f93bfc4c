//! Audio focus arbitration.
//!
//! Focus is the platform-wide right to produce audible output. The platform
//! can revoke it at any time, so the session re-requests it before every
//! audible operation instead of assuming it persists.
//!
//! The arbiter keeps the `held` flag and turns grants and abandons into
//! mute notifications for listeners.

use std::sync::Arc;

use crate::events::{CallbackHub, RadioEvent};

/// Result of a focus request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusRequest {
    Granted,
    Denied,
}

/// Out-of-band focus change delivered by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusChange {
    Gained,
    /// `transient` losses are expected to be followed by `Gained`.
    Lost { transient: bool },
}

/// Platform audio system.
pub trait AudioFocusPlatform: Send + Sync {
    fn request_focus(&self) -> FocusRequest;

    fn abandon_focus(&self);

    /// Media mute state as the platform reports it, `None` when unknown.
    fn is_media_muted(&self) -> Option<bool>;
}

/// Owns the session's view of audio focus.
///
/// Lives inside the session actor; every mutation happens on that task.
pub struct FocusArbiter {
    platform: Arc<dyn AudioFocusPlatform>,
    hub: Arc<CallbackHub>,
    held: bool,
}

impl FocusArbiter {
    pub fn new(platform: Arc<dyn AudioFocusPlatform>, hub: Arc<CallbackHub>) -> Self {
        Self {
            platform,
            hub,
            held: false,
        }
    }

    #[must_use]
    pub fn is_held(&self) -> bool {
        self.held
    }

    /// Requests focus. A grant unmutes listeners.
    pub fn request(&mut self) -> FocusRequest {
        let result = self.platform.request_focus();
        log::debug!("[FocusArbiter] focus request: {:?}", result);
        if result == FocusRequest::Granted {
            self.held = true;
            self.hub.dispatch(&RadioEvent::MuteChanged { muted: false });
        }
        result
    }

    /// Abandons focus. Listeners see the radio muted.
    pub fn abandon(&mut self) {
        self.platform.abandon_focus();
        self.held = false;
        self.hub.dispatch(&RadioEvent::MuteChanged { muted: true });
    }

    /// Records an out-of-band change. Returns true if focus is now held.
    ///
    /// A permanent loss is left to the owner, which closes the tuner before
    /// calling [`abandon`](Self::abandon).
    pub fn on_focus_change(&mut self, change: FocusChange) -> bool {
        match change {
            FocusChange::Gained => self.held = true,
            FocusChange::Lost { .. } => self.held = false,
        }
        self.held
    }

    /// Muted when focus is not held, when the platform says so, or when the
    /// platform cannot tell.
    #[must_use]
    pub fn is_muted(&self) -> bool {
        if !self.held {
            return true;
        }
        self.platform.is_media_muted().unwrap_or(true)
    }
}
