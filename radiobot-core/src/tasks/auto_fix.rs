// radiobot-core/src/tasks/auto_fix.rs

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{error, info};

use radiobot_common::models::message::OutgoingMessage;
use radiobot_common::traits::platform_traits::ChatGateway;
use crate::services::config_service::ConfigService;
use crate::services::playback_supervisor::PlaybackSupervisor;

/// Restarts every active session. Returns how many restarted cleanly.
pub async fn run_auto_fix(
    supervisor: &PlaybackSupervisor,
    chat: &dyn ChatGateway,
    config: &ConfigService,
) -> usize {
    let guilds = supervisor.active_guilds().await;
    if guilds.is_empty() {
        info!("Auto-fix: no active sessions");
        return 0;
    }

    let channel = config.snapshot().settings.channel_id;
    if let Err(e) = chat
        .send_message(channel, &OutgoingMessage::text("Auto-fix initiated"))
        .await
    {
        error!("Auto-fix: could not announce: {e}");
    }

    let mut restarted = 0;
    for guild_id in guilds {
        match supervisor.restart(guild_id).await {
            Ok(_) => restarted += 1,
            Err(e) => error!("Auto-fix: guild {guild_id} restart failed: {e}"),
        }
    }
    info!("Auto-fix: restarted {restarted} session(s)");
    restarted
}

/// The first run happens one full `period` after startup.
pub fn spawn_auto_fix_task(
    supervisor: Arc<PlaybackSupervisor>,
    chat: Arc<dyn ChatGateway>,
    config: Arc<ConfigService>,
    period: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    run_auto_fix(&supervisor, chat.as_ref(), &config).await;
                }
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }
    })
}
