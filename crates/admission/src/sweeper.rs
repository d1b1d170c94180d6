//! Background pruning of the rate-limit window.
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::AdmissionConfig;
use crate::tracker::ConnectionTracker;

/// Owns the sweeper task. Call [`shutdown`](Self::shutdown) to stop it;
/// dropping the handle also stops the task at its next wake-up.
pub struct SweeperHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Signal the sweeper and wait for it to exit.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(err) = self.task.await {
            debug!(error = %err, "sweeper_join_failed");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Shortest period the sweeper will run at.
pub const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Run [`ConnectionTracker::sweep`] every `interval` until shut down.
/// Intervals below [`MIN_SWEEP_INTERVAL`] are raised to it.
///
/// Must be called from inside a tokio runtime.
pub fn spawn_sweeper(tracker: Arc<ConnectionTracker>, interval: Duration) -> SweeperHandle {
    if interval < MIN_SWEEP_INTERVAL {
        warn!(
            requested_ms = interval.as_millis() as u64,
            "sweep_interval_raised_to_minimum"
        );
    }
    let interval = interval.max(MIN_SWEEP_INTERVAL);
    let (shutdown, mut signal) = watch::channel(false);
    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // the first tick completes immediately
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = tracker.sweep();
                    if removed > 0 {
                        debug!(removed, "rate_window_swept");
                    }
                }
                changed = signal.changed() => {
                    if changed.is_err() || *signal.borrow() {
                        break;
                    }
                }
            }
        }
        info!("sweeper_stopped");
    });
    SweeperHandle { shutdown, task }
}

impl ConnectionTracker {
    /// Build a tracker and start its sweeper on the current runtime.
    pub fn spawn(config: AdmissionConfig) -> (Arc<ConnectionTracker>, SweeperHandle) {
        let interval = config.sweep_interval();
        let tracker = Arc::new(ConnectionTracker::new(config));
        let handle = spawn_sweeper(Arc::clone(&tracker), interval);
        (tracker, handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    #[tokio::test(start_paused = true)]
    async fn sweeps_on_interval_and_stops_on_shutdown() {
        let clock = Arc::new(ManualClock::new());
        let tracker = Arc::new(ConnectionTracker::with_clock(
            AdmissionConfig::default(),
            clock.clone(),
        ));
        tracker.check_and_track_connection("u1", None, None).unwrap();
        tracker.check_and_track_connection("u2", None, None).unwrap();

        let handle = spawn_sweeper(Arc::clone(&tracker), Duration::from_secs(60));
        clock.advance(Duration::from_secs(61));
        tokio::time::sleep(Duration::from_secs(61)).await;

        assert_eq!(tracker.stats().rate_window_entries, 0);
        // open connections are untouched by the sweep
        assert_eq!(tracker.user_connection_count("u1"), 1);

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn zero_interval_is_raised_instead_of_killing_the_task() {
        let (tracker, handle) = ConnectionTracker::spawn(AdmissionConfig {
            sweep_interval_secs: 0,
            ..AdmissionConfig::default()
        });
        tracker.check_and_track_connection("u1", None, None).unwrap();

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(!handle.is_finished());

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn dropping_the_handle_stops_the_task() {
        let (tracker, handle) = ConnectionTracker::spawn(AdmissionConfig::default());
        let task = handle.task;
        drop(handle.shutdown);
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("sweeper did not stop")
            .unwrap();
        assert_eq!(tracker.stats().tracked_users, 0);
    }
}
