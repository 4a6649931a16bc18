//! Background session pruning
//!
//! Runs on a fixed interval until the shutdown channel flips. A failed
//! prune is logged and the loop keeps going.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use crate::db::{DbError, SessionRepo};

/// Default interval between prunes.
pub const DEFAULT_PRUNE_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Something that can delete expired sessions (testable)
#[async_trait]
pub trait PruneSessions: Send + Sync {
    async fn prune_expired(&self) -> Result<u64, DbError>;
}

#[async_trait]
impl PruneSessions for PgPool {
    async fn prune_expired(&self) -> Result<u64, DbError> {
        SessionRepo::new(self).prune().await
    }
}

/// Periodic session pruner
pub struct SessionPruner<P> {
    store: Arc<P>,
    every: Duration,
}

impl<P: PruneSessions + 'static> SessionPruner<P> {
    pub fn new(store: Arc<P>, every: Duration) -> Self {
        Self { store, every }
    }

    /// Spawn the prune loop; it exits once `shutdown` carries `true`.
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    async fn run(self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(interval = ?self.every, "session pruner started");

        let mut ticker = interval(self.every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick fires immediately; skip it so startup does no work.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.store.prune_expired().await {
                        Ok(removed) => tracing::debug!(removed, "pruned expired sessions"),
                        Err(e) => tracing::error!(error = %e, "session prune failed"),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!("session pruner stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Default)]
    struct CountingStore {
        calls: AtomicU32,
        fail: bool,
    }

    #[async_trait]
    impl PruneSessions for CountingStore {
        async fn prune_expired(&self) -> Result<u64, DbError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(DbError::Conflict("boom".into()));
            }
            Ok(2)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn prunes_every_interval_until_shutdown() {
        let store = Arc::new(CountingStore::default());
        let (tx, rx) = watch::channel(false);
        let handle = SessionPruner::new(store.clone(), Duration::from_secs(60)).spawn(rx);

        tokio::time::sleep(Duration::from_secs(185)).await;
        assert_eq!(store.calls.load(Ordering::SeqCst), 3);

        tx.send(true).unwrap();
        handle.await.unwrap();

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(store.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn keeps_running_after_errors() {
        let store = Arc::new(CountingStore {
            fail: true,
            ..Default::default()
        });
        let (tx, rx) = watch::channel(false);
        let handle = SessionPruner::new(store.clone(), Duration::from_secs(10)).spawn(rx);

        tokio::time::sleep(Duration::from_secs(35)).await;
        assert_eq!(store.calls.load(Ordering::SeqCst), 3);

        tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn stops_when_sender_dropped() {
        let store = Arc::new(CountingStore::default());
        let (tx, rx) = watch::channel(false);
        let handle = SessionPruner::new(store, Duration::from_secs(10)).spawn(rx);

        drop(tx);
        handle.await.unwrap();
    }
}
