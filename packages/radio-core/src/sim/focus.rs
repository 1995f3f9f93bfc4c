use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::focus::{AudioFocusPlatform, FocusRequest};

/// Audio focus platform with a grant switch and call counters.
#[derive(Debug)]
pub struct SimulatedAudioFocus {
    grant: AtomicBool,
    media_muted: Mutex<Option<bool>>,
    requests: AtomicUsize,
    abandons: AtomicUsize,
}

impl Default for SimulatedAudioFocus {
    fn default() -> Self {
        Self {
            grant: AtomicBool::new(true),
            media_muted: Mutex::new(Some(false)),
            requests: AtomicUsize::new(0),
            abandons: AtomicUsize::new(0),
        }
    }
}

impl SimulatedAudioFocus {
    /// Grants every request and reports media as unmuted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether future requests are granted.
    pub fn set_grant(&self, grant: bool) {
        self.grant.store(grant, Ordering::SeqCst);
    }

    pub fn set_media_muted(&self, muted: Option<bool>) {
        *self.media_muted.lock() = muted;
    }

    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn abandon_count(&self) -> usize {
        self.abandons.load(Ordering::SeqCst)
    }
}

impl AudioFocusPlatform for SimulatedAudioFocus {
    fn request_focus(&self) -> FocusRequest {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if self.grant.load(Ordering::SeqCst) {
            FocusRequest::Granted
        } else {
            FocusRequest::Denied
        }
    }

    fn abandon_focus(&self) {
        self.abandons.fetch_add(1, Ordering::SeqCst);
    }

    fn is_media_muted(&self) -> Option<bool> {
        *self.media_muted.lock()
    }
}
