// radiobot-core/src/tasks/presence_tick.rs

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::services::presence_announcer::PresenceAnnouncer;

/// Spawns a background task that asks the announcer for a fresh title
/// every `period` until shutdown.
pub fn spawn_presence_task(
    announcer: Arc<PresenceAnnouncer>,
    period: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!("Presence task started (every {period:?})");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    // Ticks run detached so a hung probe cannot delay the schedule;
                    // the announcer skips a tick that overlaps the previous one.
                    let announcer = announcer.clone();
                    tokio::spawn(async move {
                        let outcome = announcer.tick().await;
                        debug!("Presence tick => {outcome:?}");
                    });
                }
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }
        info!("Presence task stopped");
    })
}
