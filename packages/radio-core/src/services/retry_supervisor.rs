//! Reopen scheduling after fatal tuner errors.
//!
//! Backoff is linear: the n-th consecutive failure waits `n * base`. There is
//! no cap; the session stays eligible for the next attempt until it shuts
//! down. At most one timer is ever pending: scheduling cancels the previous
//! one, and every timer carries a generation number so a fire that raced a
//! cancel is recognised and ignored by the owner.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::runtime::{TaskSpawner, TokioSpawner};

#[derive(Debug)]
struct PendingReopen {
    generation: u64,
    delay: Duration,
    cancel: CancellationToken,
}

/// Owns the reopen timer of one session.
///
/// Fires are delivered as generation numbers on the channel given to
/// [`new`](Self::new); the owner passes each one to
/// [`on_fire`](Self::on_fire) before acting on it.
pub struct RetrySupervisor {
    base_delay: Duration,
    attempts: u32,
    generation: u64,
    pending: Option<PendingReopen>,
    fire_tx: mpsc::UnboundedSender<u64>,
    spawner: TokioSpawner,
}

impl RetrySupervisor {
    pub fn new(
        base_delay: Duration,
        fire_tx: mpsc::UnboundedSender<u64>,
        spawner: TokioSpawner,
    ) -> Self {
        Self {
            base_delay,
            attempts: 0,
            generation: 0,
            pending: None,
            fire_tx,
            spawner,
        }
    }

    /// Records a failure and schedules the next reopen, superseding any
    /// pending one. Returns the delay.
    pub fn schedule_reopen(&mut self) -> Duration {
        self.cancel();

        self.attempts = self.attempts.saturating_add(1);
        let delay = self.base_delay.saturating_mul(self.attempts);
        self.generation += 1;
        let generation = self.generation;

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let tx = self.fire_tx.clone();
        self.spawner.spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    let _ = tx.send(generation);
                }
            }
        });

        log::info!(
            "[RetrySupervisor] Reopen attempt {} scheduled in {}ms",
            self.attempts,
            delay.as_millis()
        );
        self.pending = Some(PendingReopen {
            generation,
            delay,
            cancel,
        });
        delay
    }

    /// Accepts a timer fire. Returns true only for the currently pending
    /// timer, which is then no longer pending.
    pub fn on_fire(&mut self, generation: u64) -> bool {
        match self.pending {
            Some(ref pending) if pending.generation == generation => {
                self.pending = None;
                true
            }
            _ => {
                log::debug!("[RetrySupervisor] Ignoring stale fire {}", generation);
                false
            }
        }
    }

    /// Cancels the pending timer. Returns true if one was pending.
    pub fn cancel(&mut self) -> bool {
        match self.pending.take() {
            Some(pending) => {
                pending.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Resets the consecutive failure counter after a successful open.
    pub fn reset(&mut self) {
        if self.attempts > 0 {
            log::info!(
                "[RetrySupervisor] Tuner reopened after {} attempt(s)",
                self.attempts
            );
        }
        self.attempts = 0;
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Number of pending timers, always 0 or 1.
    pub fn pending_count(&self) -> usize {
        usize::from(self.pending.is_some())
    }

    pub fn pending_delay(&self) -> Option<Duration> {
        self.pending.as_ref().map(|p| p.delay)
    }
}

impl Drop for RetrySupervisor {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: Duration = Duration::from_millis(5000);

    fn supervisor() -> (RetrySupervisor, mpsc::UnboundedReceiver<u64>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (RetrySupervisor::new(BASE, tx, TokioSpawner::current()), rx)
    }

    #[tokio::test(start_paused = true)]
    async fn delays_grow_linearly_and_reset() {
        let (mut retry, _rx) = supervisor();
        assert_eq!(retry.schedule_reopen(), BASE);
        assert_eq!(retry.schedule_reopen(), BASE * 2);
        assert_eq!(retry.schedule_reopen(), BASE * 3);
        assert_eq!(retry.attempts(), 3);

        retry.reset();
        assert_eq!(retry.attempts(), 0);
        assert_eq!(retry.schedule_reopen(), BASE);
    }

    #[tokio::test(start_paused = true)]
    async fn superseded_timers_never_fire() {
        let (mut retry, mut rx) = supervisor();
        for _ in 0..4 {
            retry.schedule_reopen();
            assert_eq!(retry.pending_count(), 1);
        }

        tokio::time::sleep(BASE * 5).await;
        let fired = rx.recv().await.unwrap();
        assert!(retry.on_fire(fired));
        assert_eq!(retry.pending_count(), 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn fire_waits_for_full_delay() {
        let (mut retry, mut rx) = supervisor();
        retry.schedule_reopen();

        tokio::time::sleep(BASE - Duration::from_millis(1)).await;
        assert!(rx.try_recv().is_err());

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert!(rx.recv().await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn stale_fire_after_cancel_is_ignored() {
        let (mut retry, mut rx) = supervisor();
        retry.schedule_reopen();
        tokio::time::sleep(BASE * 2).await;
        let fired = rx.recv().await.unwrap();

        // A new failure arrived before the owner consumed the fire.
        retry.schedule_reopen();
        assert!(!retry.on_fire(fired));
        assert_eq!(retry.pending_count(), 1);
        assert_eq!(retry.pending_delay(), Some(BASE * 2));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_clears_pending_timer() {
        let (mut retry, mut rx) = supervisor();
        retry.schedule_reopen();
        assert!(retry.cancel());
        assert!(!retry.cancel());

        tokio::time::sleep(BASE * 2).await;
        assert!(rx.try_recv().is_err());
        assert_eq!(retry.pending_count(), 0);
    }
}
