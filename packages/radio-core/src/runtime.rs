//! Task spawning abstraction.
//!
//! The session actor, the background scanner actor and the retry timers are
//! all spawned through [`TaskSpawner`], so embedders choose the runtime they
//! run on.

use std::future::Future;

/// Abstraction for spawning background tasks.
///
/// Spawned tasks run detached. Their lifetime is controlled through
/// cancellation tokens and channel closure, never by joining.
pub trait TaskSpawner: Send + Sync {
    /// Spawns a future as a background task.
    fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static;
}

/// Tokio-based spawner.
#[derive(Clone, Debug)]
pub struct TokioSpawner {
    handle: tokio::runtime::Handle,
}

impl TokioSpawner {
    #[must_use]
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }

    /// Creates a spawner on the current runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime context.
    #[must_use]
    pub fn current() -> Self {
        Self {
            handle: tokio::runtime::Handle::current(),
        }
    }
}

impl TaskSpawner for TokioSpawner {
    fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.handle.spawn(future);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn tokio_spawner_runs_detached_task() {
        let spawner = TokioSpawner::current();
        let (tx, rx) = oneshot::channel();

        spawner.spawn(async move {
            let _ = tx.send(42u32);
        });

        assert_eq!(rx.await.unwrap(), 42);
    }
}
