//! songbird.rs
//!
//! Voice playback through Songbird. One track per guild; each track carries
//! the end signal it was started with.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use songbird::events::{Event, EventContext, EventHandler as VoiceEventHandler, TrackEvent};
use songbird::input::HttpRequest;
use songbird::tracks::{PlayMode, TrackHandle};
use songbird::Songbird;
use tracing::{debug, info, warn};
use twilight_model::id::Id;
use twilight_model::id::marker::{ChannelMarker, GuildMarker};

use radiobot_common::models::playback::SourceEndSignal;
use radiobot_common::traits::platform_traits::VoiceSink;
use crate::Error;

const STOP_POLL_INTERVAL: Duration = Duration::from_millis(20);
const STOP_POLL_ATTEMPTS: usize = 100;

/// Fires the track's end signal once, on End or Error.
struct TrackEndNotifier {
    signal: SourceEndSignal,
}

#[async_trait]
impl VoiceEventHandler for TrackEndNotifier {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        let error = match ctx {
            EventContext::Track(tracks) => tracks.iter().find_map(|(state, _)| match &state.playing {
                PlayMode::Errored(e) => Some(e.to_string()),
                _ => None,
            }),
            _ => None,
        };
        if self.signal.fire(error) {
            debug!(
                "Guild {}: track generation {} ended",
                self.signal.guild_id(),
                self.signal.generation()
            );
        }
        Some(Event::Cancel)
    }
}

struct ActiveTrack {
    handle: TrackHandle,
    signal: SourceEndSignal,
}

pub struct SongbirdManager {
    songbird: Arc<Songbird>,
    http: reqwest::Client,
    tracks: DashMap<Id<GuildMarker>, ActiveTrack>,
}

impl SongbirdManager {
    pub fn new(songbird: Arc<Songbird>) -> Self {
        Self {
            songbird,
            http: reqwest::Client::new(),
            tracks: DashMap::new(),
        }
    }

    pub fn songbird(&self) -> &Arc<Songbird> {
        &self.songbird
    }

    async fn track_playing(handle: &TrackHandle) -> bool {
        match handle.get_info().await {
            Ok(state) => matches!(state.playing, PlayMode::Play),
            Err(_) => false,
        }
    }
}

#[async_trait]
impl VoiceSink for SongbirdManager {
    async fn connect(&self, guild_id: Id<GuildMarker>, channel_id: Id<ChannelMarker>) -> Result<(), Error> {
        self.songbird
            .join(guild_id, channel_id)
            .await
            .map_err(|e| Error::Platform(format!("voice join failed: {e}")))?;
        info!("Guild {guild_id}: joined voice channel {channel_id}");
        Ok(())
    }

    async fn disconnect(&self, guild_id: Id<GuildMarker>) -> Result<(), Error> {
        if let Some((_, track)) = self.tracks.remove(&guild_id) {
            track.signal.disarm();
            let _ = track.handle.stop();
        }
        self.songbird
            .remove(guild_id)
            .await
            .map_err(|e| Error::Platform(format!("voice leave failed: {e}")))?;
        info!("Guild {guild_id}: left voice");
        Ok(())
    }

    async fn current_channel(&self, guild_id: Id<GuildMarker>) -> Option<Id<ChannelMarker>> {
        let call = self.songbird.get(guild_id)?;
        let channel = call.lock().await.current_channel()?;
        Id::new_checked(channel.0.get())
    }

    async fn is_playing(&self, guild_id: Id<GuildMarker>) -> bool {
        let handle = match self.tracks.get(&guild_id) {
            Some(track) => track.handle.clone(),
            None => return false,
        };
        Self::track_playing(&handle).await
    }

    async fn start(
        &self,
        guild_id: Id<GuildMarker>,
        url: &str,
        volume: f32,
        on_end: SourceEndSignal,
    ) -> Result<(), Error> {
        let call = self
            .songbird
            .get(guild_id)
            .ok_or_else(|| Error::NoVoiceChannel(format!("not connected to voice in guild {guild_id}")))?;

        let input = HttpRequest::new(self.http.clone(), url.to_string());
        let handle = call.lock().await.play_input(input.into());

        // Watch the track before it can fail, so an early end still fires.
        for kind in [TrackEvent::End, TrackEvent::Error] {
            if let Err(e) = handle.add_event(Event::Track(kind), TrackEndNotifier { signal: on_end.clone() }) {
                on_end.disarm();
                let _ = handle.stop();
                return Err(Error::PlaybackStart(format!("cannot watch track: {e}")));
            }
        }

        if let Err(e) = handle.make_playable_async().await {
            // The caller reports a failed start itself.
            on_end.disarm();
            let _ = handle.stop();
            return Err(Error::PlaybackStart(format!("{url}: {e}")));
        }

        let _ = handle.set_volume(volume);
        self.tracks.insert(guild_id, ActiveTrack { handle, signal: on_end });
        Ok(())
    }

    async fn stop(&self, guild_id: Id<GuildMarker>) -> Result<(), Error> {
        let Some((_, track)) = self.tracks.remove(&guild_id) else {
            return Ok(());
        };
        track.signal.disarm();
        let _ = track.handle.stop();

        for _ in 0..STOP_POLL_ATTEMPTS {
            if !Self::track_playing(&track.handle).await {
                return Ok(());
            }
            tokio::time::sleep(STOP_POLL_INTERVAL).await;
        }
        warn!("Guild {guild_id}: track still reports playing after stop");
        Err(Error::Platform("track did not stop".into()))
    }

    async fn set_volume(&self, guild_id: Id<GuildMarker>, volume: f32) -> Result<(), Error> {
        if let Some(track) = self.tracks.get(&guild_id) {
            track
                .handle
                .set_volume(volume)
                .map_err(|e| Error::Platform(format!("set volume failed: {e}")))?;
        }
        Ok(())
    }
}
