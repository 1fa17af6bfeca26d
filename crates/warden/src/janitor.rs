//! Background pruning of stale session-index entries.
//!
//! Session records expire on their own through the store TTL, but their ids
//! linger in `user_sessions:<user_id>` until something removes them. The
//! janitor calls [`SessionAuthority::cleanup_expired_sessions`] on a fixed
//! period. Nothing depends on it for correctness: readers already skip
//! dangling ids.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info};
use warden_session::SessionAuthority;
use warden_store::SessionStore;

/// Shortest period the janitor will run at.
const MIN_PERIOD: Duration = Duration::from_secs(1);

/// Handle to the running cleanup task.
///
/// Dropping the handle also stops the task (the shutdown channel closes),
/// but [`shutdown`](Self::shutdown) additionally waits for an in-flight
/// pass to finish.
pub struct Janitor {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl Janitor {
    /// Spawns the cleanup loop on the current Tokio runtime.
    ///
    /// The first pass runs after `period` plus a random delay of up to
    /// `max_jitter`; later passes every `period`. Passes that fall behind
    /// are skipped, never bunched up.
    pub fn spawn<S: SessionStore>(
        authority: Arc<SessionAuthority<S>>,
        period: Duration,
        max_jitter: Duration,
    ) -> Self {
        let period = period.max(MIN_PERIOD);
        let jitter = initial_jitter(max_jitter);
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period + jitter, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            info!(?period, ?jitter, "session janitor started");
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        debug!("session janitor tick");
                        if let Err(e) = authority.cleanup_expired_sessions().await {
                            error!(error = %e, "session cleanup pass failed");
                        }
                    }
                    // Either an explicit signal or the handle was dropped.
                    _ = shutdown_rx.changed() => break,
                }
            }
            info!("session janitor stopped");
        });

        Self {
            shutdown: shutdown_tx,
            handle,
        }
    }

    /// Stops the loop and waits for the task to exit.
    pub async fn shutdown(self) {
        // Err only if the task already exited and dropped its receiver.
        let _ = self.shutdown.send(true);
        if let Err(e) = self.handle.await {
            error!(error = %e, "session janitor task failed");
        }
    }

    /// `true` once the task has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

fn initial_jitter(max: Duration) -> Duration {
    let max_ms = u64::try_from(max.as_millis()).unwrap_or(u64::MAX);
    if max_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::rng().random_range(0..max_ms))
}
