//! Background sweep of expired cache entries.
//!
//! Lazy expiration only removes entries that are read again. The sweep task
//! walks the store on a fixed period so that cold entries are reclaimed too.
//! The task is owned by a [`SweepHandle`]: stopping or dropping the handle
//! cancels it.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::store::CacheStore;

/// Default sweep period: 5 minutes.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Shortest accepted sweep period.
const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(1);

/// Handle to a running sweep task.
#[derive(Debug)]
pub struct SweepHandle {
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl SweepHandle {
    /// Cancel the sweep and wait for the task to finish.
    pub async fn stop(mut self) {
        self.token.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }

    /// Whether the sweep task is still running.
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for SweepHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

impl CacheStore {
    /// Start a background task that purges expired entries every `period`.
    ///
    /// The first sweep runs one period after the call. Must be called from
    /// within a tokio runtime.
    pub fn spawn_sweeper(self: &Arc<Self>, period: Duration) -> SweepHandle {
        let period = period.max(MIN_SWEEP_INTERVAL);
        let store = Arc::clone(self);
        let token = CancellationToken::new();
        let cancelled = token.clone();

        // Schedule from the call site, not from the task's first poll.
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let task = tokio::spawn(async move {
            info!(period_secs = period.as_secs_f64(), "Cache sweep started");

            loop {
                tokio::select! {
                    _ = cancelled.cancelled() => break,
                    _ = ticker.tick() => {
                        let removed = store.purge_expired().await;
                        if removed > 0 {
                            info!(removed, "Cache sweep removed expired entries");
                        } else {
                            debug!("Cache sweep found no expired entries");
                        }
                    }
                }
            }

            info!("Cache sweep stopped");
        });

        SweepHandle {
            token,
            task: Some(task),
        }
    }
}
