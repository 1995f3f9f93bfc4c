//! Simulated hardware for demo mode and tests.
//!
//! [`SimulatedRadio`] implements [`RadioHal`](crate::hardware::RadioHal) over
//! in-memory station lists and records every driver call.
//! [`SimulatedAudioFocus`] implements
//! [`AudioFocusPlatform`](crate::focus::AudioFocusPlatform) with a grant
//! switch.

mod focus;
mod radio;

pub use focus::SimulatedAudioFocus;
pub use radio::{SimCall, SimStation, SimulatedRadio};
