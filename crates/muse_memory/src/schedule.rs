//! Periodic consolidation driver for the host runtime.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::store::MemoryStore;

/// Run `consolidate()` every `interval` until `shutdown` flips to `true`.
///
/// The first tick fires one full interval after spawning. Abandoned sweeps are
/// logged and simply retried on the next tick.
pub fn spawn_consolidation(
    store: Arc<MemoryStore>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let start = tokio::time::Instant::now() + interval;
        let mut ticker = tokio::time::interval_at(start, interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = store.consolidate().await {
                        tracing::warn!("Consolidation sweep abandoned: {}", e);
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::info!("Consolidation scheduler stopping");
                        break;
                    }
                }
            }
        }
    })
}
