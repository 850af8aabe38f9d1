// radiobot-core/src/tasks/watchdog.rs

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::warn;

use crate::services::playback_supervisor::PlaybackSupervisor;

/// Spawns the playback watchdog. `None` if it is already running.
pub fn spawn_watchdog_task(supervisor: Arc<PlaybackSupervisor>) -> Option<JoinHandle<()>> {
    let Some(rx) = supervisor.take_end_receiver() else {
        warn!("Playback watchdog already running");
        return None;
    };
    Some(tokio::spawn(supervisor.run_watchdog(rx)))
}
