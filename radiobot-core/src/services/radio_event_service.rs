// File: radiobot-core/src/services/radio_event_service.rs

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use twilight_model::id::Id;
use twilight_model::id::marker::GuildMarker;

use radiobot_common::models::playback::PlayOutcome;
use radiobot_common::traits::platform_traits::ChatGateway;
use crate::eventbus::{BotEvent, CommandMessage, EventBus};
use crate::services::command_service::CommandService;
use crate::services::config_service::ConfigService;
use crate::services::identity_sync::IdentitySync;
use crate::services::occupancy_monitor::ChannelOccupancyMonitor;
use crate::services::playback_supervisor::PlaybackSupervisor;

/// Service that listens on the EventBus and routes gateway events to the
/// command surface, the occupancy monitor and the startup sequence.
pub struct RadioEventService {
    event_bus: Arc<EventBus>,
    chat: Arc<dyn ChatGateway>,
    commands: Arc<CommandService>,
    occupancy: Arc<ChannelOccupancyMonitor>,
    supervisor: Arc<PlaybackSupervisor>,
    identity: IdentitySync,
    config: Arc<ConfigService>,
}

impl RadioEventService {
    pub fn new(
        event_bus: Arc<EventBus>,
        chat: Arc<dyn ChatGateway>,
        commands: Arc<CommandService>,
        occupancy: Arc<ChannelOccupancyMonitor>,
        supervisor: Arc<PlaybackSupervisor>,
        identity: IdentitySync,
        config: Arc<ConfigService>,
    ) -> Self {
        Self {
            event_bus,
            chat,
            commands,
            occupancy,
            supervisor,
            identity,
            config,
        }
    }

    /// Runs until the bus shuts down. `rx` should be subscribed before the
    /// gateway connects so the first Ready is not missed.
    pub async fn start(self: Arc<Self>, mut rx: mpsc::Receiver<BotEvent>) {
        let mut shutdown_rx = self.event_bus.shutdown_rx.clone();
        info!("RadioEventService: Started, listening on EventBus");

        loop {
            tokio::select! {
                maybe_event = rx.recv() => {
                    let Some(event) = maybe_event else { break };
                    self.clone().route(event);
                }
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }

        info!("RadioEventService: Shutting down listener loop");
    }

    /// Each event runs on its own task so a slow command never delays
    /// voice-state handling.
    fn route(self: Arc<Self>, event: BotEvent) {
        debug!("RadioEventService: routing '{}'", event.event_type());
        match event {
            BotEvent::ChatCommand(message) => {
                tokio::spawn(async move { self.handle_command(message).await });
            }
            BotEvent::VoiceStateChanged { guild_id, .. } => {
                tokio::spawn(async move {
                    match self.occupancy.on_voice_state_change(guild_id).await {
                        Ok(outcome) => debug!("Guild {guild_id}: occupancy => {outcome:?}"),
                        Err(e) => error!("Guild {guild_id}: occupancy check failed: {e}"),
                    }
                });
            }
            BotEvent::Ready { guild_ids } => {
                tokio::spawn(async move { self.handle_ready(guild_ids).await });
            }
        }
    }

    pub async fn handle_command(&self, message: CommandMessage) {
        let Some(response) = self.commands.dispatch(&message).await else {
            return;
        };
        for msg in &response.messages {
            if let Err(e) = self.chat.send_message(response.channel_id, msg).await {
                error!("Failed to send reply '{}': {e}", msg.summary());
            }
        }
    }

    /// Joins the default voice channel in its guild, starts the default
    /// stream there, and brings every guild's nickname in line.
    pub async fn handle_ready(&self, guild_ids: Vec<Id<GuildMarker>>) {
        let config = self.config.snapshot();
        let default_channel = config.settings.default_voice_channel_id;
        let home_guild = self.chat.channel_guild(default_channel).await;

        match home_guild {
            Some(guild_id) => match self.supervisor.resume_default(guild_id).await {
                Ok(PlayOutcome::Started { station, .. }) => {
                    info!("Guild {guild_id}: started default station '{}'", station.name);
                }
                Ok(PlayOutcome::AlreadyPlaying(_)) => {}
                Err(e) => error!("Guild {guild_id}: could not start default stream: {e}"),
            },
            None => warn!("Default voice channel {default_channel} not found in any guild"),
        }

        for guild_id in guild_ids {
            let Some(url) = self.supervisor.snapshot(guild_id).await.and_then(|s| s.active_url) else {
                continue;
            };
            let station = self.config.snapshot().directory.resolve_by_url(&url);
            if let Err(e) = self.identity.sync_station(guild_id, &station.name).await {
                warn!("Guild {guild_id}: initial nickname sync failed: {e}");
            }
        }
    }
}
