//! Shared test fixtures for hardware descriptors, simulated radios and
//! listener recording.

use parking_lot::Mutex;

use crate::band::{BandConfig, BandDescriptor};
use crate::error::ListenerError;
use crate::events::{RadioEvent, RadioListener};
use crate::hardware::{ModuleProperties, SlotId};
use crate::sim::{SimStation, SimulatedRadio};
use crate::station::Band;

pub fn fm_descriptor() -> BandDescriptor {
    BandDescriptor {
        band: Band::Fm,
        lower_limit: 87_500,
        upper_limit: 108_000,
        spacing: 100,
        stereo_supported: true,
    }
}

pub fn am_descriptor() -> BandDescriptor {
    BandDescriptor {
        band: Band::Am,
        lower_limit: 530,
        upper_limit: 1710,
        spacing: 10,
        stereo_supported: true,
    }
}

pub fn fm_config() -> BandConfig {
    BandConfig::from_descriptor(&fm_descriptor(), true)
}

fn modules(count: u32) -> Vec<ModuleProperties> {
    (0..count)
        .map(|id| ModuleProperties {
            id: SlotId(id),
            bands: vec![fm_descriptor(), am_descriptor()],
        })
        .collect()
}

fn with_test_stations(radio: SimulatedRadio) -> SimulatedRadio {
    radio
        .with_stations(
            Band::Fm,
            vec![SimStation::new(88_100), SimStation::named(98_700, "KRCK")],
        )
        .with_stations(Band::Am, vec![SimStation::new(1010)])
}

/// One tuner. FM has stations at 88100 and 98700 ("KRCK"), AM at 1010.
pub fn single_module_radio() -> SimulatedRadio {
    with_test_stations(SimulatedRadio::new(modules(1)))
}

/// Same stations as [`single_module_radio`] with a second tuner.
pub fn dual_tuner_radio() -> SimulatedRadio {
    with_test_stations(SimulatedRadio::new(modules(2)))
}

/// Listener that records every event it receives.
#[derive(Default)]
pub struct RecordingListener {
    events: Mutex<Vec<RadioEvent>>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RadioEvent> {
        self.events.lock().clone()
    }

    pub fn count(&self, pred: impl Fn(&RadioEvent) -> bool) -> usize {
        self.events.lock().iter().filter(|e| pred(e)).count()
    }
}

impl RadioListener for RecordingListener {
    fn on_event(&self, event: &RadioEvent) -> Result<(), ListenerError> {
        self.events.lock().push(event.clone());
        Ok(())
    }
}
