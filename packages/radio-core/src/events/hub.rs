//! Fan-out registry of session listeners.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use super::{RadioEvent, RadioListener};

/// Registration token returned by [`CallbackHub::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Delivers every dispatched event to every registered listener exactly once.
///
/// Dispatch iterates a snapshot taken when it starts: a listener registered
/// or unregistered mid-delivery does not change who receives the in-flight
/// event, and an unregistered listener receives nothing afterwards. Errors
/// and panics are isolated per listener.
#[derive(Default)]
pub struct CallbackHub {
    listeners: RwLock<Vec<(ListenerId, Arc<dyn RadioListener>)>>,
    next_id: AtomicU64,
}

impl CallbackHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, listener: Arc<dyn RadioListener>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.write().push((id, listener));
        log::debug!("[CallbackHub] registered listener {:?}", id);
        id
    }

    /// Returns false if the id was not registered.
    pub fn unregister(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        before != listeners.len()
    }

    /// Removes every listener and returns how many there were.
    pub fn clear(&self) -> usize {
        let mut listeners = self.listeners.write();
        let count = listeners.len();
        listeners.clear();
        count
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.read().is_empty()
    }

    /// Delivers `event` to the current listeners. Returns the number of
    /// successful deliveries.
    pub fn dispatch(&self, event: &RadioEvent) -> usize {
        let snapshot: Vec<_> = self
            .listeners
            .read()
            .iter()
            .map(|(id, listener)| (*id, Arc::clone(listener)))
            .collect();

        let mut delivered = 0;
        for (id, listener) in snapshot {
            match catch_unwind(AssertUnwindSafe(|| listener.on_event(event))) {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(e)) => {
                    log::warn!("[CallbackHub] listener {:?} failed: {}", id, e);
                }
                Err(_) => {
                    log::error!("[CallbackHub] listener {:?} panicked during delivery", id);
                }
            }
        }
        delivered
    }
}

impl std::fmt::Debug for CallbackHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackHub")
            .field("listeners", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ListenerError;
    use crate::station::Band;
    use crate::test_fixtures::RecordingListener;
    use parking_lot::Mutex;

    fn band(b: Band) -> RadioEvent {
        RadioEvent::BandChanged { band: b }
    }

    struct FailingListener;

    impl RadioListener for FailingListener {
        fn on_event(&self, _event: &RadioEvent) -> Result<(), ListenerError> {
            Err(ListenerError("display gone".into()))
        }
    }

    struct PanickingListener;

    impl RadioListener for PanickingListener {
        fn on_event(&self, _event: &RadioEvent) -> Result<(), ListenerError> {
            panic!("listener bug");
        }
    }

    /// Unregisters another listener the first time it sees an event.
    struct UnregisteringListener {
        hub: Arc<CallbackHub>,
        victim: Mutex<Option<ListenerId>>,
    }

    impl RadioListener for UnregisteringListener {
        fn on_event(&self, _event: &RadioEvent) -> Result<(), ListenerError> {
            if let Some(victim) = self.victim.lock().take() {
                self.hub.unregister(victim);
            }
            Ok(())
        }
    }

    /// Registers `late` the first time it sees an event.
    struct RegisteringListener {
        hub: Arc<CallbackHub>,
        late: Mutex<Option<Arc<RecordingListener>>>,
    }

    impl RadioListener for RegisteringListener {
        fn on_event(&self, _event: &RadioEvent) -> Result<(), ListenerError> {
            if let Some(late) = self.late.lock().take() {
                self.hub.register(late);
            }
            Ok(())
        }
    }

    #[test]
    fn n_listeners_receive_one_event_each() {
        let hub = CallbackHub::new();
        let recorders: Vec<_> = (0..5).map(|_| Arc::new(RecordingListener::new())).collect();
        for recorder in &recorders {
            hub.register(recorder.clone());
        }

        let event = band(Band::Am);
        assert_eq!(hub.dispatch(&event), 5);
        for recorder in &recorders {
            assert_eq!(recorder.events(), vec![event.clone()]);
        }
    }

    #[test]
    fn events_arrive_in_dispatch_order() {
        let hub = CallbackHub::new();
        let recorder = Arc::new(RecordingListener::new());
        hub.register(recorder.clone());

        hub.dispatch(&band(Band::Fm));
        hub.dispatch(&RadioEvent::MuteChanged { muted: true });
        hub.dispatch(&band(Band::Am));

        assert_eq!(
            recorder.events(),
            vec![
                band(Band::Fm),
                RadioEvent::MuteChanged { muted: true },
                band(Band::Am)
            ]
        );
    }

    #[test]
    fn failing_listeners_do_not_block_others() {
        let hub = CallbackHub::new();
        let before = Arc::new(RecordingListener::new());
        let after = Arc::new(RecordingListener::new());
        hub.register(before.clone());
        hub.register(Arc::new(FailingListener));
        hub.register(Arc::new(PanickingListener));
        hub.register(after.clone());

        assert_eq!(hub.dispatch(&band(Band::Fm)), 2);
        assert_eq!(before.events().len(), 1);
        assert_eq!(after.events().len(), 1);
    }

    #[test]
    fn unregister_during_dispatch_keeps_in_flight_delivery() {
        let hub = Arc::new(CallbackHub::new());
        let victim = Arc::new(RecordingListener::new());

        let unregistering = Arc::new(UnregisteringListener {
            hub: hub.clone(),
            victim: Mutex::new(None),
        });
        hub.register(unregistering.clone());
        let victim_id = hub.register(victim.clone());
        *unregistering.victim.lock() = Some(victim_id);

        // The victim was registered before dispatch began and still sees E.
        hub.dispatch(&band(Band::Am));
        assert_eq!(victim.events(), vec![band(Band::Am)]);
        assert_eq!(hub.len(), 1);

        // Nothing after E.
        hub.dispatch(&band(Band::Fm));
        assert_eq!(victim.events(), vec![band(Band::Am)]);
    }

    #[test]
    fn register_during_dispatch_waits_for_next_event() {
        let hub = Arc::new(CallbackHub::new());
        let late = Arc::new(RecordingListener::new());
        hub.register(Arc::new(RegisteringListener {
            hub: hub.clone(),
            late: Mutex::new(Some(late.clone())),
        }));

        assert_eq!(hub.dispatch(&band(Band::Am)), 1);
        assert!(late.events().is_empty());
        assert_eq!(hub.len(), 2);

        assert_eq!(hub.dispatch(&band(Band::Fm)), 2);
        assert_eq!(late.events(), vec![band(Band::Fm)]);
    }

    #[test]
    fn unregister_and_clear() {
        let hub = CallbackHub::new();
        let a = hub.register(Arc::new(RecordingListener::new()));
        hub.register(Arc::new(RecordingListener::new()));

        assert!(hub.unregister(a));
        assert!(!hub.unregister(a));
        assert_eq!(hub.len(), 1);
        assert_eq!(hub.clear(), 1);
        assert!(hub.is_empty());
        assert_eq!(hub.dispatch(&band(Band::Fm)), 0);
    }
}
