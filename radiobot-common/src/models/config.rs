use std::time::Duration;

use twilight_model::id::Id;
use twilight_model::id::marker::{ChannelMarker, RoleMarker};

use crate::models::station::{BanList, StationDirectory};

pub const DEFAULT_PRESENCE_INTERVAL: Duration = Duration::from_secs(120);
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_RESTART_DELAY: Duration = Duration::from_secs(1);
pub const DEFAULT_AUTO_FIX_HOURS: u64 = 6;

/// The `[settings]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct BotSettings {
    pub token: String,
    /// Text channel that accepts gated commands.
    pub channel_id: Id<ChannelMarker>,
    pub default_voice_channel_id: Id<ChannelMarker>,
    pub default_stream_url: String,
    /// Percent, `0..=100`.
    pub default_volume: u8,
    pub allowed_role_ids: Vec<Id<RoleMarker>>,
    pub client_id: Option<String>,
    pub presence_interval: Duration,
    pub probe_timeout: Duration,
    pub restart_delay: Duration,
    /// `None` disables the periodic auto-fix.
    pub auto_fix_interval: Option<Duration>,
}

impl BotSettings {
    pub fn default_gain(&self) -> f32 {
        f32::from(self.default_volume) / 100.0
    }
}

/// The optional `[spotify]` section used for cover art.
#[derive(Debug, Clone, PartialEq)]
pub struct SpotifySettings {
    pub client_id: String,
    pub client_secret: String,
    pub update_channel_id: Option<Id<ChannelMarker>>,
    pub default_cover_url: Option<String>,
}

/// One immutable snapshot of everything read from the config store.
#[derive(Debug, Clone, PartialEq)]
pub struct RadioConfig {
    pub settings: BotSettings,
    pub spotify: Option<SpotifySettings>,
    pub directory: StationDirectory,
    pub ban_list: BanList,
}

impl RadioConfig {
    /// Where "Now Playing" posts go: the Spotify update channel, else the command channel.
    pub fn update_channel(&self) -> Id<ChannelMarker> {
        self.spotify
            .as_ref()
            .and_then(|s| s.update_channel_id)
            .unwrap_or(self.settings.channel_id)
    }

    pub fn default_cover_url(&self) -> Option<&str> {
        self.spotify.as_ref().and_then(|s| s.default_cover_url.as_deref())
    }
}
