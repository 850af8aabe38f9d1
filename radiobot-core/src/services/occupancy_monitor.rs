// File: radiobot-core/src/services/occupancy_monitor.rs

use std::sync::Arc;

use tracing::{debug, info, warn};
use twilight_model::id::Id;
use twilight_model::id::marker::{ChannelMarker, GuildMarker};

use radiobot_common::traits::platform_traits::ChatGateway;
use crate::Error;
use crate::services::config_service::ConfigService;
use crate::services::playback_supervisor::PlaybackSupervisor;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OccupancyOutcome {
    NotConnected,
    /// Someone besides the bot is listening; holds the member count.
    Occupied(usize),
    AlreadyHome,
    Relocated(Id<ChannelMarker>),
    /// The default channel is unknown or in another guild.
    NoDefault,
}

/// Sends the bot back to the default voice channel when it has been left
/// alone somewhere else.
pub struct ChannelOccupancyMonitor {
    chat: Arc<dyn ChatGateway>,
    supervisor: Arc<PlaybackSupervisor>,
    config: Arc<ConfigService>,
}

impl ChannelOccupancyMonitor {
    pub fn new(
        chat: Arc<dyn ChatGateway>,
        supervisor: Arc<PlaybackSupervisor>,
        config: Arc<ConfigService>,
    ) -> Self {
        Self { chat, supervisor, config }
    }

    pub async fn on_voice_state_change(&self, guild_id: Id<GuildMarker>) -> Result<OccupancyOutcome, Error> {
        let Some(current) = self.supervisor.current_channel(guild_id).await else {
            return Ok(OccupancyOutcome::NotConnected);
        };

        let members = self.chat.voice_channel_members(current).await;
        let bot_alone = match (self.chat.bot_user_id(), members.as_slice()) {
            (Some(bot), [only]) => *only == bot,
            _ => false,
        };
        if !bot_alone {
            return Ok(OccupancyOutcome::Occupied(members.len()));
        }

        let default_channel = self.config.snapshot().settings.default_voice_channel_id;
        if current == default_channel {
            debug!("Guild {guild_id}: alone in the default channel, staying");
            return Ok(OccupancyOutcome::AlreadyHome);
        }

        if self.chat.channel_guild(default_channel).await != Some(guild_id) {
            warn!("Guild {guild_id}: default voice channel {default_channel} is not in this guild");
            return Ok(OccupancyOutcome::NoDefault);
        }

        info!("Guild {guild_id}: left alone in {current}, returning to {default_channel}");
        self.supervisor.relocate(guild_id, default_channel).await?;
        Ok(OccupancyOutcome::Relocated(default_channel))
    }
}
