//! Background task keeping this process's ONLINE records alive.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time;
use tokio_util::sync::CancellationToken;

use super::tracker::PresenceTracker;

/// Spawn the refresher. It stops when `shutdown` is cancelled.
pub fn spawn_refresher(
    tracker: Arc<PresenceTracker>,
    period: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = time::interval(period);
        interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
        interval.tick().await;

        tracing::info!(period_secs = period.as_secs(), "Presence refresher started");
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = interval.tick() => {
                    let refreshed = tracker.refresh_local().await;
                    tracing::trace!(refreshed, "Presence records refreshed");
                }
            }
        }
        tracing::info!("Presence refresher stopped");
    })
}
