// File: radiobot-core/src/services/playback_supervisor.rs
//
// Owns one PlaybackSession per guild and the watchdog that restarts a
// source after it ends on its own. Every start, stop and restart for a guild
// runs under that guild's session lock, so at most one source is ever live.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::RwLock;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use twilight_model::id::Id;
use twilight_model::id::marker::{ChannelMarker, GuildMarker};

use radiobot_common::models::playback::{
    PlayOutcome, PlaybackSession, PlaybackState, RestartOutcome, Selection, SourceEndSignal,
    SourceEnded,
};
use radiobot_common::models::station::Station;
use radiobot_common::traits::platform_traits::VoiceSink;
use crate::Error;
use crate::services::config_service::ConfigService;

pub struct PlaybackSupervisor {
    sink: Arc<dyn VoiceSink>,
    config: Arc<ConfigService>,
    sessions: DashMap<Id<GuildMarker>, Arc<Mutex<PlaybackSession>>>,
    selection: RwLock<Option<Selection>>,
    end_tx: UnboundedSender<SourceEnded>,
    end_rx: parking_lot::Mutex<Option<UnboundedReceiver<SourceEnded>>>,
}

impl PlaybackSupervisor {
    pub fn new(sink: Arc<dyn VoiceSink>, config: Arc<ConfigService>) -> Self {
        let (end_tx, end_rx) = unbounded_channel();
        Self {
            sink,
            config,
            sessions: DashMap::new(),
            selection: RwLock::new(None),
            end_tx,
            end_rx: parking_lot::Mutex::new(Some(end_rx)),
        }
    }

    fn session(&self, guild_id: Id<GuildMarker>) -> Arc<Mutex<PlaybackSession>> {
        self.sessions
            .entry(guild_id)
            .or_insert_with(|| {
                let gain = self.config.snapshot().settings.default_gain();
                Arc::new(Mutex::new(PlaybackSession::new(gain)))
            })
            .clone()
    }

    fn restart_delay(&self) -> Duration {
        self.config.snapshot().settings.restart_delay
    }

    /// Switches `guild_id` to `station`, joining voice first if needed.
    pub async fn play(
        &self,
        guild_id: Id<GuildMarker>,
        station: &Station,
        requester_channel: Option<Id<ChannelMarker>>,
    ) -> Result<PlayOutcome, Error> {
        self.ensure_voice(guild_id, requester_channel).await?;

        let session = self.session(guild_id);
        let mut session = session.lock().await;

        if session.active_url.as_deref() == Some(station.url.as_str())
            && self.sink.is_playing(guild_id).await
        {
            debug!("Guild {guild_id}: '{}' already playing", station.name);
            return Ok(PlayOutcome::AlreadyPlaying(station.clone()));
        }

        let generation = self.start_locked(&mut session, guild_id, &station.url).await?;
        info!("Guild {guild_id}: now playing '{}' (generation {generation})", station.name);
        Ok(PlayOutcome::Started {
            station: station.clone(),
            generation,
        })
    }

    /// Connects to the requester's channel, else keeps the current one, else
    /// falls back to the configured default channel.
    async fn ensure_voice(
        &self,
        guild_id: Id<GuildMarker>,
        requester_channel: Option<Id<ChannelMarker>>,
    ) -> Result<(), Error> {
        let current = self.sink.current_channel(guild_id).await;

        let target = match (requester_channel, current) {
            (Some(req), Some(cur)) if req == cur => return Ok(()),
            (Some(req), _) => req,
            (None, Some(_)) => return Ok(()),
            (None, None) => self.config.snapshot().settings.default_voice_channel_id,
        };

        self.sink.connect(guild_id, target).await.map_err(|e| {
            warn!("Guild {guild_id}: cannot connect to voice channel {target}: {e}");
            Error::NoVoiceChannel(format!("could not join voice channel {target}: {e}"))
        })
    }

    /// Stops whatever the sink is doing and starts `url` as a new generation.
    /// Caller must hold the session lock.
    async fn start_locked(
        &self,
        session: &mut PlaybackSession,
        guild_id: Id<GuildMarker>,
        url: &str,
    ) -> Result<u64, Error> {
        if let Err(e) = self.sink.stop(guild_id).await {
            warn!("Guild {guild_id}: stopping previous source failed: {e}");
        }

        session.generation += 1;
        let generation = session.generation;
        session.active_url = Some(url.to_string());
        session.is_playing = false;
        session.state = PlaybackState::Starting;

        *self.selection.write() = Some(Selection {
            guild_id,
            url: url.to_string(),
        });

        let signal = SourceEndSignal::new(guild_id, generation, self.end_tx.clone());
        match self.sink.start(guild_id, url, session.volume, signal).await {
            Ok(()) => {
                session.is_playing = true;
                session.state = PlaybackState::Playing;
                Ok(generation)
            }
            Err(e) => {
                session.state = PlaybackState::Stalled;
                error!("Guild {guild_id}: failed to start {url}: {e}");
                Err(Error::PlaybackStart(e.to_string()))
            }
        }
    }

    /// Stops playback. A completion event still in flight becomes a no-op.
    pub async fn stop(&self, guild_id: Id<GuildMarker>) -> Result<(), Error> {
        let session = self.session(guild_id);
        let mut session = session.lock().await;
        self.stop_locked(&mut session, guild_id).await
    }

    async fn stop_locked(
        &self,
        session: &mut PlaybackSession,
        guild_id: Id<GuildMarker>,
    ) -> Result<(), Error> {
        session.active_url = None;
        session.is_playing = false;
        session.state = PlaybackState::Stopped;

        {
            let mut selection = self.selection.write();
            if selection.as_ref().is_some_and(|s| s.guild_id == guild_id) {
                *selection = None;
            }
        }

        self.sink.stop(guild_id).await?;
        info!("Guild {guild_id}: playback stopped");
        Ok(())
    }

    /// Forced restart: stop, wait, then start the active URL (or the default one).
    pub async fn restart(&self, guild_id: Id<GuildMarker>) -> Result<PlayOutcome, Error> {
        self.ensure_voice(guild_id, None).await?;

        let session = self.session(guild_id);
        let mut session = session.lock().await;

        let config = self.config.snapshot();
        let url = session
            .active_url
            .clone()
            .unwrap_or_else(|| config.settings.default_stream_url.clone());

        self.sink.stop(guild_id).await?;
        session.is_playing = false;
        tokio::time::sleep(self.restart_delay()).await;

        let generation = self.start_locked(&mut session, guild_id, &url).await?;
        let station = config.directory.resolve_by_url(&url);
        info!("Guild {guild_id}: restarted '{}' (generation {generation})", station.name);
        Ok(PlayOutcome::Started { station, generation })
    }

    /// Restarts `url` unless a newer generation took over or the sink is
    /// already playing again.
    pub async fn check_and_restart(
        &self,
        guild_id: Id<GuildMarker>,
        url: &str,
        expected_generation: Option<u64>,
    ) -> Result<RestartOutcome, Error> {
        let session = self.session(guild_id);
        let mut session = session.lock().await;

        if session.active_url.as_deref() != Some(url) {
            return Ok(RestartOutcome::Superseded);
        }
        if let Some(generation) = expected_generation {
            if !session.is_current(generation) {
                return Ok(RestartOutcome::Superseded);
            }
        }

        if self.sink.is_playing(guild_id).await {
            session.is_playing = true;
            session.state = PlaybackState::Playing;
            return Ok(RestartOutcome::AlreadyPlaying);
        }

        if let Err(e) = self.sink.stop(guild_id).await {
            warn!("Guild {guild_id}: stop before restart failed: {e}");
        }
        session.state = PlaybackState::Stalled;
        tokio::time::sleep(self.restart_delay()).await;

        match self.start_locked(&mut session, guild_id, url).await {
            Ok(generation) => Ok(RestartOutcome::Restarted { generation }),
            Err(e) => {
                // Nothing is live to report an end, so the failure itself
                // re-enters the watchdog for the generation that just failed.
                SourceEndSignal::new(guild_id, session.generation, self.end_tx.clone())
                    .fire(Some(e.to_string()));
                Err(e)
            }
        }
    }

    /// Reacts to a sink's end-of-source notification.
    pub async fn handle_source_ended(&self, ended: SourceEnded) -> Result<RestartOutcome, Error> {
        let guild_id = ended.guild_id;
        let Some(session) = self.sessions.get(&guild_id).map(|s| s.clone()) else {
            debug!("Guild {guild_id}: end event without a session");
            return Ok(RestartOutcome::Superseded);
        };

        let url = {
            let mut session = session.lock().await;
            if !session.is_current(ended.generation) {
                debug!(
                    "Guild {guild_id}: discarding stale end event (generation {} vs {})",
                    ended.generation, session.generation
                );
                return Ok(RestartOutcome::Superseded);
            }
            session.is_playing = false;
            session.state = PlaybackState::Stalled;
            match session.active_url.clone() {
                Some(url) => url,
                None => return Ok(RestartOutcome::Superseded),
            }
        };

        match &ended.error {
            Some(err) => warn!("Guild {guild_id}: source errored ({err}), restarting {url}"),
            None => warn!("Guild {guild_id}: source ended, restarting {url}"),
        }
        self.check_and_restart(guild_id, &url, Some(ended.generation)).await
    }

    /// The watchdog receiver. Only the first caller gets it.
    pub fn take_end_receiver(&self) -> Option<UnboundedReceiver<SourceEnded>> {
        self.end_rx.lock().take()
    }

    /// Consumes end events until every sender is gone. Each event is handled
    /// on its own task so one slow guild does not hold up another.
    pub async fn run_watchdog(self: Arc<Self>, mut rx: UnboundedReceiver<SourceEnded>) {
        info!("Playback watchdog started");
        while let Some(ended) = rx.recv().await {
            let this = self.clone();
            tokio::spawn(async move {
                let guild_id = ended.guild_id;
                match this.handle_source_ended(ended).await {
                    Ok(RestartOutcome::Restarted { generation }) => {
                        info!("Guild {guild_id}: watchdog restarted playback (generation {generation})");
                    }
                    Ok(outcome) => debug!("Guild {guild_id}: watchdog outcome {outcome:?}"),
                    Err(e) => error!("Guild {guild_id}: watchdog restart failed: {e}"),
                }
            });
        }
        info!("Playback watchdog stopped");
    }

    /// Percent in `0..=100`. Applies to the live source and every later one.
    pub async fn set_volume(&self, guild_id: Id<GuildMarker>, percent: i64) -> Result<u8, Error> {
        let percent = u8::try_from(percent)
            .ok()
            .filter(|p| *p <= 100)
            .ok_or_else(|| Error::InvalidArgument(format!("volume must be 0-100, got {percent}")))?;

        let session = self.session(guild_id);
        let mut session = session.lock().await;
        session.volume = f32::from(percent) / 100.0;
        if session.is_playing {
            self.sink.set_volume(guild_id, session.volume).await?;
        }
        Ok(percent)
    }

    pub async fn join(&self, guild_id: Id<GuildMarker>, channel_id: Id<ChannelMarker>) -> Result<(), Error> {
        self.sink.connect(guild_id, channel_id).await
    }

    /// Stops playback and leaves voice.
    pub async fn leave(&self, guild_id: Id<GuildMarker>) -> Result<(), Error> {
        let session = self.session(guild_id);
        let mut session = session.lock().await;
        self.stop_locked(&mut session, guild_id).await?;
        self.sink.disconnect(guild_id).await
    }

    /// Moves the existing voice connection; the session is left as it is.
    pub async fn relocate(&self, guild_id: Id<GuildMarker>, channel_id: Id<ChannelMarker>) -> Result<(), Error> {
        let session = self.session(guild_id);
        let _session = session.lock().await;
        self.sink.connect(guild_id, channel_id).await?;
        info!("Guild {guild_id}: moved to voice channel {channel_id}");
        Ok(())
    }

    /// Joins the default voice channel and plays the default stream, unless
    /// the guild is already playing something.
    pub async fn resume_default(&self, guild_id: Id<GuildMarker>) -> Result<PlayOutcome, Error> {
        let config = self.config.snapshot();
        let active_url = match self.sessions.get(&guild_id).map(|s| s.clone()) {
            Some(session) => session.lock().await.active_url.clone(),
            None => None,
        };
        if let Some(url) = active_url {
            if self.sink.is_playing(guild_id).await {
                debug!("Guild {guild_id}: keeping {url} instead of the default stream");
                return Ok(PlayOutcome::AlreadyPlaying(config.directory.resolve_by_url(&url)));
            }
        }

        let station = config.directory.resolve_by_url(&config.settings.default_stream_url);
        self.play(guild_id, &station, Some(config.settings.default_voice_channel_id))
            .await
    }

    pub async fn current_channel(&self, guild_id: Id<GuildMarker>) -> Option<Id<ChannelMarker>> {
        self.sink.current_channel(guild_id).await
    }

    /// Guilds whose session has an active URL.
    pub async fn active_guilds(&self) -> Vec<Id<GuildMarker>> {
        let sessions: Vec<_> = self
            .sessions
            .iter()
            .map(|e| (*e.key(), e.value().clone()))
            .collect();

        let mut active = Vec::new();
        for (guild_id, session) in sessions {
            if session.lock().await.active_url.is_some() {
                active.push(guild_id);
            }
        }
        active
    }

    pub async fn snapshot(&self, guild_id: Id<GuildMarker>) -> Option<PlaybackSession> {
        let session = self.sessions.get(&guild_id).map(|s| s.clone())?;
        let snapshot = session.lock().await.clone();
        Some(snapshot)
    }

    pub fn current_selection(&self) -> Option<Selection> {
        self.selection.read().clone()
    }

    /// The station behind the current selection, if any.
    pub fn current_station(&self) -> Option<Station> {
        let selection = self.current_selection()?;
        Some(self.config.snapshot().directory.resolve_by_url(&selection.url))
    }
}
