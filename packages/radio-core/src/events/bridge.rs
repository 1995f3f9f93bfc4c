//! Listener that bridges session events into a broadcast channel.
//!
//! The [`BroadcastListener`] lives at the boundary between the synchronous
//! callback hub and async consumers: each subscriber gets its own receiver.

use tokio::sync::broadcast;

use crate::error::ListenerError;

use super::{RadioEvent, RadioListener};

/// Forwards hub events to a `tokio::sync::broadcast` channel.
///
/// # Thread Safety
///
/// The bridge is `Send + Sync` and can be shared across async tasks.
#[derive(Clone)]
pub struct BroadcastListener {
    tx: broadcast::Sender<RadioEvent>,
}

impl BroadcastListener {
    /// Creates a new bridge with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Returns a new receiver. Lagging receivers lose the oldest events.
    pub fn subscribe(&self) -> broadcast::Receiver<RadioEvent> {
        self.tx.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl RadioListener for BroadcastListener {
    fn on_event(&self, event: &RadioEvent) -> Result<(), ListenerError> {
        if let Err(e) = self.tx.send(event.clone()) {
            log::trace!("[BroadcastListener] No broadcast receivers: {}", e);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::events::CallbackHub;
    use crate::station::Band;

    struct FailingListener;

    impl RadioListener for FailingListener {
        fn on_event(&self, _event: &RadioEvent) -> Result<(), ListenerError> {
            Err(ListenerError("display gone".into()))
        }
    }

    #[tokio::test]
    async fn subscribers_receive_forwarded_events() {
        let bridge = BroadcastListener::new(8);
        let mut rx = bridge.subscribe();

        bridge
            .on_event(&RadioEvent::BandChanged { band: Band::Am })
            .unwrap();

        assert_eq!(
            rx.recv().await.unwrap(),
            RadioEvent::BandChanged { band: Band::Am }
        );
    }

    #[test]
    fn no_receivers_is_not_an_error() {
        let bridge = BroadcastListener::new(8);
        assert_eq!(bridge.receiver_count(), 0);
        assert!(bridge
            .on_event(&RadioEvent::MuteChanged { muted: true })
            .is_ok());
    }

    #[test]
    fn failing_sibling_listener_does_not_starve_subscribers() {
        let hub = CallbackHub::new();
        let bridge = Arc::new(BroadcastListener::new(8));
        let mut rx = bridge.subscribe();
        hub.register(Arc::new(FailingListener));
        hub.register(bridge);

        hub.dispatch(&RadioEvent::BandChanged { band: Band::Am });
        assert_eq!(
            rx.try_recv().unwrap(),
            RadioEvent::BandChanged { band: Band::Am }
        );
    }
}
