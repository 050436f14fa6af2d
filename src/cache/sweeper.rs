//! Background sweep of stale cache entries.

use super::store::ExplanationCache;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Default sweep interval: 10 minutes.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Shorter intervals, including zero, are raised to this.
pub const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(1);

/// Periodically removes stale entries, independent of request traffic.
pub struct CacheSweeper;

impl CacheSweeper {
    /// Start sweeping `cache` every `interval` until the handle is shut down.
    ///
    /// `interval` is clamped to [`MIN_SWEEP_INTERVAL`]. Must be called from
    /// within a tokio runtime.
    pub fn spawn(cache: Arc<ExplanationCache>, interval: Duration) -> SweeperHandle {
        let interval = interval.max(MIN_SWEEP_INTERVAL);
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await; // skip first immediate tick

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let removed = cache.sweep();
                        debug!(removed, remaining = cache.len(), "periodic cache sweep");
                    }
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            info!("cache sweeper stopped");
        });

        SweeperHandle {
            shutdown_tx,
            handle,
        }
    }
}

/// Owner of a running sweeper task.
pub struct SweeperHandle {
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl SweeperHandle {
    /// Signal the sweeper to stop and wait for it to exit.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        let _ = self.handle.await;
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}
