use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::band::{BandConfig, BandDescriptor};
use crate::error::HalError;
use crate::hardware::{
    ModuleProperties, ProgramInfo, RadioHal, ScanDirection, SlotId, TunerDevice, TunerEvent,
    TunerEventSink,
};
use crate::station::{Band, StationMetadata};

/// A station the simulated hardware can receive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimStation {
    pub channel: u32,
    /// RDS program service name, emitted as metadata when tuned.
    pub program_service: Option<String>,
}

impl SimStation {
    pub fn new(channel: u32) -> Self {
        Self {
            channel,
            program_service: None,
        }
    }

    pub fn named(channel: u32, name: impl Into<String>) -> Self {
        Self {
            channel,
            program_service: Some(name.into()),
        }
    }
}

/// A driver call recorded by [`SimulatedRadio`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimCall {
    Open { slot: SlotId, band: Band },
    Tune { slot: SlotId, channel: u32 },
    Scan { slot: SlotId, direction: ScanDirection },
    SetConfiguration { slot: SlotId, band: Band },
    Close { slot: SlotId },
}

#[derive(Default)]
struct SimState {
    /// AM-family stations, sorted by channel.
    am: Vec<SimStation>,
    /// FM-family stations, sorted by channel.
    fm: Vec<SimStation>,
    sinks: HashMap<SlotId, TunerEventSink>,
    failing_opens: u32,
    calls: Vec<SimCall>,
}

impl SimState {
    fn stations_for(&self, band: Band) -> &[SimStation] {
        if band.is_am() {
            &self.am
        } else {
            &self.fm
        }
    }
}

/// In-memory radio hardware.
///
/// Each module can be opened once at a time (the owner enforces that). Opening
/// and reconfiguring emit `ConfigurationChanged`; tuning and scanning emit
/// `ProgramInfoChanged` followed by `MetadataChanged` when the station has a
/// program service name. Scanning a band without stations reports
/// `ScanTimeout`.
#[derive(Clone)]
pub struct SimulatedRadio {
    modules: Vec<ModuleProperties>,
    state: Arc<Mutex<SimState>>,
}

impl SimulatedRadio {
    pub fn new(modules: Vec<ModuleProperties>) -> Self {
        Self {
            modules,
            state: Arc::new(Mutex::new(SimState::default())),
        }
    }

    /// Two tuners covering FM and AM with a handful of named stations.
    pub fn demo() -> Self {
        let bands = vec![
            BandDescriptor {
                band: Band::Fm,
                lower_limit: 87_500,
                upper_limit: 108_000,
                spacing: 100,
                stereo_supported: true,
            },
            BandDescriptor {
                band: Band::Am,
                lower_limit: 530,
                upper_limit: 1710,
                spacing: 10,
                stereo_supported: false,
            },
        ];
        let modules = (0..2)
            .map(|id| ModuleProperties {
                id: SlotId(id),
                bands: bands.clone(),
            })
            .collect();
        Self::new(modules)
            .with_stations(
                Band::Fm,
                vec![
                    SimStation::named(88_100, "KXYZ"),
                    SimStation::named(94_900, "JAZZ FM"),
                    SimStation::new(98_700),
                    SimStation::named(104_300, "CLASSIC"),
                ],
            )
            .with_stations(
                Band::Am,
                vec![SimStation::new(680), SimStation::named(1010, "NEWS")],
            )
    }

    /// Replaces the stations of `band`'s family.
    pub fn with_stations(self, band: Band, mut stations: Vec<SimStation>) -> Self {
        stations.sort_by_key(|s| s.channel);
        stations.dedup_by_key(|s| s.channel);
        let mut state = self.state.lock();
        if band.is_am() {
            state.am = stations;
        } else {
            state.fm = stations;
        }
        drop(state);
        self
    }

    /// Makes the next `count` opens fail with a driver error.
    pub fn fail_next_opens(&self, count: u32) {
        self.state.lock().failing_opens = count;
    }

    /// Delivers `event` through the sink of the handle currently open on
    /// `slot`. Returns false if nothing is open there.
    pub fn emit(&self, slot: SlotId, event: TunerEvent) -> bool {
        let state = self.state.lock();
        match state.sinks.get(&slot) {
            Some(sink) => {
                sink.send(event);
                true
            }
            None => false,
        }
    }

    pub fn calls(&self) -> Vec<SimCall> {
        self.state.lock().calls.clone()
    }

    pub fn open_count(&self, slot: SlotId) -> usize {
        self.count(|call| matches!(call, SimCall::Open { slot: s, .. } if *s == slot))
    }

    pub fn close_count(&self, slot: SlotId) -> usize {
        self.count(|call| matches!(call, SimCall::Close { slot: s } if *s == slot))
    }

    pub fn scan_count(&self, slot: SlotId) -> usize {
        self.count(|call| matches!(call, SimCall::Scan { slot: s, .. } if *s == slot))
    }

    fn count(&self, pred: impl Fn(&SimCall) -> bool) -> usize {
        self.state.lock().calls.iter().filter(|call| pred(call)).count()
    }
}

impl RadioHal for SimulatedRadio {
    fn modules(&self) -> Vec<ModuleProperties> {
        self.modules.clone()
    }

    fn open(
        &self,
        slot: SlotId,
        config: &BandConfig,
        events: TunerEventSink,
    ) -> Result<Box<dyn TunerDevice>, HalError> {
        if !self.modules.iter().any(|m| m.id == slot) {
            return Err(HalError::InvalidArgument(format!("no module {}", slot)));
        }

        let mut state = self.state.lock();
        if state.failing_opens > 0 {
            state.failing_opens -= 1;
            return Err(HalError::Failed(format!("injected open failure on {}", slot)));
        }
        state.calls.push(SimCall::Open {
            slot,
            band: config.band,
        });
        state.sinks.insert(slot, events.clone());
        drop(state);

        events.send(TunerEvent::ConfigurationChanged { band: config.band });
        Ok(Box::new(SimulatedTuner {
            slot,
            config: config.clone(),
            channel: config.lower_limit,
            tuned: false,
            events,
            state: Arc::clone(&self.state),
        }))
    }
}

struct SimulatedTuner {
    slot: SlotId,
    config: BandConfig,
    channel: u32,
    tuned: bool,
    events: TunerEventSink,
    state: Arc<Mutex<SimState>>,
}

impl SimulatedTuner {
    fn settle(&mut self, channel: u32, name: Option<String>) {
        self.channel = channel;
        self.tuned = true;
        self.events.send(TunerEvent::ProgramInfoChanged {
            info: ProgramInfo::new(channel),
        });
        if let Some(name) = name {
            self.events.send(TunerEvent::MetadataChanged {
                metadata: StationMetadata::program_service(name),
            });
        }
    }
}

impl TunerDevice for SimulatedTuner {
    fn tune(&mut self, channel: u32, _sub_channel: u32) -> Result<(), HalError> {
        let mut state = self.state.lock();
        state.calls.push(SimCall::Tune {
            slot: self.slot,
            channel,
        });
        if !self.config.contains(channel) {
            return Err(HalError::InvalidArgument(format!(
                "{} outside {}",
                channel, self.config.band
            )));
        }
        let name = state
            .stations_for(self.config.band)
            .iter()
            .find(|s| s.channel == channel)
            .and_then(|s| s.program_service.clone());
        drop(state);

        self.settle(channel, name);
        Ok(())
    }

    fn scan(&mut self, direction: ScanDirection) -> Result<(), HalError> {
        let mut state = self.state.lock();
        state.calls.push(SimCall::Scan {
            slot: self.slot,
            direction,
        });
        let stations = state.stations_for(self.config.band);
        let current = self.channel;
        let next = match direction {
            ScanDirection::Up => stations
                .iter()
                .find(|s| s.channel > current)
                .or_else(|| stations.first()),
            ScanDirection::Down => stations
                .iter()
                .rev()
                .find(|s| s.channel < current)
                .or_else(|| stations.last()),
        }
        .cloned();
        drop(state);

        match next {
            Some(station) => self.settle(station.channel, station.program_service),
            None => self.events.send(TunerEvent::Error {
                code: crate::hardware::TunerErrorCode::ScanTimeout,
            }),
        }
        Ok(())
    }

    fn set_configuration(&mut self, config: &BandConfig) -> Result<(), HalError> {
        self.state.lock().calls.push(SimCall::SetConfiguration {
            slot: self.slot,
            band: config.band,
        });
        self.config = config.clone();
        self.channel = config.lower_limit;
        self.tuned = false;
        self.events.send(TunerEvent::ConfigurationChanged { band: config.band });
        Ok(())
    }

    fn program_info(&self) -> Option<ProgramInfo> {
        self.tuned.then(|| ProgramInfo::new(self.channel))
    }

    fn close(&mut self) {
        let mut state = self.state.lock();
        state.calls.push(SimCall::Close { slot: self.slot });
        let current = state
            .sinks
            .get(&self.slot)
            .is_some_and(|sink| sink.handle() == self.events.handle());
        if current {
            state.sinks.remove(&self.slot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::{HandleId, SlotEvent};
    use crate::test_fixtures::fm_config;
    use tokio::sync::mpsc;

    fn open(radio: &SimulatedRadio) -> (Box<dyn TunerDevice>, mpsc::UnboundedReceiver<SlotEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink = TunerEventSink::new(SlotId(0), HandleId(1), tx);
        (radio.open(SlotId(0), &fm_config(), sink).unwrap(), rx)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<SlotEvent>) -> Vec<TunerEvent> {
        let mut events = Vec::new();
        while let Ok(tagged) = rx.try_recv() {
            events.push(tagged.event);
        }
        events
    }

    #[test]
    fn scan_walks_stations_and_wraps() {
        let radio = SimulatedRadio::demo();
        let (mut device, mut rx) = open(&radio);
        drain(&mut rx);

        let mut seen = Vec::new();
        for _ in 0..5 {
            device.scan(ScanDirection::Up).unwrap();
            for event in drain(&mut rx) {
                if let TunerEvent::ProgramInfoChanged { info } = event {
                    seen.push(info.channel);
                }
            }
        }
        assert_eq!(seen, vec![88_100, 94_900, 98_700, 104_300, 88_100]);
    }

    #[test]
    fn scan_down_wraps_to_top() {
        let radio = SimulatedRadio::demo();
        let (mut device, mut rx) = open(&radio);
        drain(&mut rx);

        device.scan(ScanDirection::Down).unwrap();
        assert_eq!(
            drain(&mut rx).first(),
            Some(&TunerEvent::ProgramInfoChanged {
                info: ProgramInfo::new(104_300)
            })
        );
    }

    #[test]
    fn tune_emits_metadata_for_named_stations() {
        let radio = SimulatedRadio::demo();
        let (mut device, mut rx) = open(&radio);
        assert_eq!(
            drain(&mut rx),
            vec![TunerEvent::ConfigurationChanged { band: Band::Fm }]
        );

        device.tune(94_900, 0).unwrap();
        assert_eq!(
            drain(&mut rx),
            vec![
                TunerEvent::ProgramInfoChanged {
                    info: ProgramInfo::new(94_900)
                },
                TunerEvent::MetadataChanged {
                    metadata: StationMetadata::program_service("JAZZ FM")
                },
            ]
        );
        assert_eq!(device.program_info(), Some(ProgramInfo::new(94_900)));
        assert!(device.tune(1010, 0).is_err());
    }

    #[test]
    fn empty_band_reports_scan_timeout() {
        let radio = SimulatedRadio::demo().with_stations(Band::Fm, vec![]);
        let (mut device, mut rx) = open(&radio);
        drain(&mut rx);

        device.scan(ScanDirection::Up).unwrap();
        assert_eq!(
            drain(&mut rx),
            vec![TunerEvent::Error {
                code: crate::hardware::TunerErrorCode::ScanTimeout
            }]
        );
        assert_eq!(device.program_info(), None);
    }

    #[test]
    fn injected_failures_and_emit() {
        let radio = SimulatedRadio::demo();
        radio.fail_next_opens(1);
        let (tx, _rx) = mpsc::unbounded_channel();
        let sink = TunerEventSink::new(SlotId(0), HandleId(1), tx);
        assert!(radio.open(SlotId(0), &fm_config(), sink).is_err());
        assert!(!radio.emit(SlotId(0), TunerEvent::ControlLost));

        let (mut device, mut rx) = open(&radio);
        drain(&mut rx);
        assert!(radio.emit(SlotId(0), TunerEvent::ControlLost));
        assert_eq!(drain(&mut rx), vec![TunerEvent::ControlLost]);

        device.close();
        assert!(!radio.emit(SlotId(0), TunerEvent::ControlRegained));
        assert_eq!(radio.open_count(SlotId(0)), 1);
        assert_eq!(radio.close_count(SlotId(0)), 1);
    }
}
