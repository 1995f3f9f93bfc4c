//! Station storage collaborator.
//!
//! Presets and pre-scanned stations are persisted by an injected
//! [`StationStore`]. The core only ever calls it from async tasks, never from
//! the session actor's event handling path.

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::constants::STORE_EVENT_CHANNEL_CAPACITY;
use crate::error::StoreError;
use crate::station::{Band, Station, StationIdentity};

/// Change notifications published by a store after a successful write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    PresetsChanged,
    PreScannedReplaced { band: Band, count: usize },
}

/// Storage for presets and pre-scanned stations.
#[async_trait]
pub trait StationStore: Send + Sync {
    async fn get_presets(&self) -> Result<Vec<Station>, StoreError>;

    /// Inserts or replaces the preset with the same identity.
    async fn upsert_preset(&self, station: Station) -> Result<(), StoreError>;

    async fn delete_preset(&self, identity: &StationIdentity) -> Result<(), StoreError>;

    /// Replaces every pre-scanned station of `band`.
    async fn replace_pre_scanned(
        &self,
        band: Band,
        stations: Vec<Station>,
    ) -> Result<(), StoreError>;

    async fn get_pre_scanned(&self, band: Band) -> Result<Vec<Station>, StoreError>;
}

/// In-memory store backed by concurrent maps.
pub struct MemoryStationStore {
    presets: DashMap<StationIdentity, Station>,
    pre_scanned: DashMap<Band, Vec<Station>>,
    events: broadcast::Sender<StoreEvent>,
}

impl Default for MemoryStationStore {
    fn default() -> Self {
        let (events, _) = broadcast::channel(STORE_EVENT_CHANNEL_CAPACITY);
        Self {
            presets: DashMap::new(),
            pre_scanned: DashMap::new(),
            events,
        }
    }
}

impl MemoryStationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes to change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    fn notify(&self, event: StoreEvent) {
        if self.events.send(event).is_err() {
            log::trace!("[StationStore] No store subscribers");
        }
    }
}

#[async_trait]
impl StationStore for MemoryStationStore {
    async fn get_presets(&self) -> Result<Vec<Station>, StoreError> {
        let mut presets: Vec<Station> = self.presets.iter().map(|e| e.value().clone()).collect();
        presets.sort_by_key(|s| s.identity);
        Ok(presets)
    }

    async fn upsert_preset(&self, station: Station) -> Result<(), StoreError> {
        self.presets.insert(station.identity, station);
        self.notify(StoreEvent::PresetsChanged);
        Ok(())
    }

    async fn delete_preset(&self, identity: &StationIdentity) -> Result<(), StoreError> {
        if self.presets.remove(identity).is_none() {
            return Err(StoreError::NotFound(identity.to_string()));
        }
        self.notify(StoreEvent::PresetsChanged);
        Ok(())
    }

    async fn replace_pre_scanned(
        &self,
        band: Band,
        stations: Vec<Station>,
    ) -> Result<(), StoreError> {
        let count = stations.len();
        self.pre_scanned.insert(band, stations);
        log::info!("[StationStore] Stored {} pre-scanned station(s) for {}", count, band);
        self.notify(StoreEvent::PreScannedReplaced { band, count });
        Ok(())
    }

    async fn get_pre_scanned(&self, band: Band) -> Result<Vec<Station>, StoreError> {
        Ok(self
            .pre_scanned
            .get(&band)
            .map(|entry| entry.value().clone())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::station::StationMetadata;

    fn station(channel: u32) -> Station {
        Station::bare(StationIdentity::main(channel, Band::Fm))
    }

    #[tokio::test]
    async fn upsert_replaces_by_identity() {
        let store = MemoryStationStore::new();
        store.upsert_preset(station(98_700)).await.unwrap();
        store.upsert_preset(station(88_100)).await.unwrap();
        store
            .upsert_preset(Station::new(
                StationIdentity::main(98_700, Band::Fm),
                Some(StationMetadata::program_service("KRCK")),
            ))
            .await
            .unwrap();

        let presets = store.get_presets().await.unwrap();
        assert_eq!(presets.len(), 2);
        assert_eq!(presets[0].identity.channel(), 88_100);
        assert!(presets[1].metadata.is_some());
    }

    #[tokio::test]
    async fn notifications_fire_on_success_only() {
        let store = MemoryStationStore::new();
        let mut rx = store.subscribe();

        store.upsert_preset(station(98_700)).await.unwrap();
        assert_eq!(rx.try_recv().unwrap(), StoreEvent::PresetsChanged);

        let missing = StationIdentity::main(1010, Band::Am);
        assert!(matches!(
            store.delete_preset(&missing).await,
            Err(StoreError::NotFound(_))
        ));
        assert!(rx.try_recv().is_err());

        store
            .delete_preset(&StationIdentity::main(98_700, Band::Fm))
            .await
            .unwrap();
        assert_eq!(rx.try_recv().unwrap(), StoreEvent::PresetsChanged);
    }

    #[tokio::test]
    async fn pre_scanned_is_replaced_per_band() {
        let store = MemoryStationStore::new();
        let mut rx = store.subscribe();

        store
            .replace_pre_scanned(Band::Fm, vec![station(88_100), station(98_700)])
            .await
            .unwrap();
        store
            .replace_pre_scanned(Band::Fm, vec![station(94_900)])
            .await
            .unwrap();

        assert_eq!(store.get_pre_scanned(Band::Fm).await.unwrap(), vec![station(94_900)]);
        assert!(store.get_pre_scanned(Band::Am).await.unwrap().is_empty());
        assert_eq!(
            rx.try_recv().unwrap(),
            StoreEvent::PreScannedReplaced {
                band: Band::Fm,
                count: 2
            }
        );
    }
}
