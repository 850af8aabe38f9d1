// ================================================================
// File: radiobot-common/src/traits/platform_traits.rs
// ================================================================

use async_trait::async_trait;
use twilight_model::id::Id;
use twilight_model::id::marker::{ChannelMarker, GuildMarker, UserMarker};

use crate::Error;
use crate::models::message::OutgoingMessage;
use crate::models::playback::SourceEndSignal;

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
    Reconnecting,
    Error(String),
}

/// The per-guild audio destination (a voice call). Only the playback
/// supervisor calls the mutating methods.
#[async_trait]
pub trait VoiceSink: Send + Sync {
    /// Joins `channel`, or moves there if already connected in this guild.
    async fn connect(&self, guild_id: Id<GuildMarker>, channel_id: Id<ChannelMarker>) -> Result<(), Error>;

    async fn disconnect(&self, guild_id: Id<GuildMarker>) -> Result<(), Error>;

    async fn current_channel(&self, guild_id: Id<GuildMarker>) -> Option<Id<ChannelMarker>>;

    async fn is_playing(&self, guild_id: Id<GuildMarker>) -> bool;

    /// Starts streaming `url`. The sink must call `on_end.fire(..)` when the
    /// source stops for any reason other than an explicit `stop`.
    async fn start(
        &self,
        guild_id: Id<GuildMarker>,
        url: &str,
        volume: f32,
        on_end: SourceEndSignal,
    ) -> Result<(), Error>;

    /// Must not return until the sink reports not-playing.
    async fn stop(&self, guild_id: Id<GuildMarker>) -> Result<(), Error>;

    async fn set_volume(&self, guild_id: Id<GuildMarker>, volume: f32) -> Result<(), Error>;
}

/// Everything the engine needs from the chat platform apart from audio.
#[async_trait]
pub trait ChatGateway: Send + Sync {
    async fn send_message(&self, channel_id: Id<ChannelMarker>, message: &OutgoingMessage) -> Result<(), Error>;

    /// Shows the "bot is typing" indicator in `channel_id`.
    async fn trigger_typing(&self, channel_id: Id<ChannelMarker>) -> Result<(), Error>;

    /// Fails with `Error::RateLimited` when the platform asks us to back off.
    async fn set_nickname(&self, guild_id: Id<GuildMarker>, nickname: &str) -> Result<(), Error>;

    async fn current_nickname(&self, guild_id: Id<GuildMarker>) -> Option<String>;

    /// Sets the global "Listening to ..." activity.
    async fn set_presence(&self, activity: &str) -> Result<(), Error>;

    async fn voice_channel_members(&self, channel_id: Id<ChannelMarker>) -> Vec<Id<UserMarker>>;

    async fn channel_guild(&self, channel_id: Id<ChannelMarker>) -> Option<Id<GuildMarker>>;

    async fn channel_name(&self, channel_id: Id<ChannelMarker>) -> Option<String>;

    fn bot_user_id(&self) -> Option<Id<UserMarker>>;

    async fn connection_status(&self) -> ConnectionStatus;
}
