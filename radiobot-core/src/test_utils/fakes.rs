// File: radiobot-core/src/test_utils/fakes.rs
//
// In-memory stand-ins for the platform collaborators, shared by the unit
// and integration tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use twilight_model::id::Id;
use twilight_model::id::marker::{ChannelMarker, GuildMarker, RoleMarker, UserMarker};

use radiobot_common::models::config::{BotSettings, RadioConfig};
use radiobot_common::models::message::OutgoingMessage;
use radiobot_common::models::playback::SourceEndSignal;
use radiobot_common::models::station::{BanList, Station, StationDirectory};
use radiobot_common::traits::media_traits::{CoverArtLookup, TitleSource, UNKNOWN_TITLE};
use radiobot_common::traits::platform_traits::{ChatGateway, ConnectionStatus, VoiceSink};
use radiobot_common::traits::repository_traits::ConfigRepository;
use crate::Error;

pub const TEST_GUILD: u64 = 100;
pub const COMMAND_CHANNEL: u64 = 200;
pub const DEFAULT_VOICE_CHANNEL: u64 = 300;
pub const OTHER_VOICE_CHANNEL: u64 = 301;
pub const ALLOWED_ROLE: u64 = 400;
pub const BOT_USER: u64 = 500;

/// Three stations, short delays, default stream = station 1.
pub fn sample_config() -> RadioConfig {
    RadioConfig {
        settings: BotSettings {
            token: "test-token".into(),
            channel_id: Id::new(COMMAND_CHANNEL),
            default_voice_channel_id: Id::new(DEFAULT_VOICE_CHANNEL),
            default_stream_url: "http://alpha.example/stream".into(),
            default_volume: 50,
            allowed_role_ids: vec![Id::new(ALLOWED_ROLE)],
            client_id: None,
            presence_interval: Duration::from_millis(50),
            probe_timeout: Duration::from_millis(100),
            restart_delay: Duration::from_millis(10),
            auto_fix_interval: None,
        },
        spotify: None,
        directory: StationDirectory::from_pairs([
            ("Alpha", "http://alpha.example/stream"),
            ("Bravo", "http://bravo.example/stream"),
            ("Charlie", "http://charlie.example/stream"),
        ]),
        ban_list: BanList::default(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SinkCall {
    Connect(Id<GuildMarker>, Id<ChannelMarker>),
    Disconnect(Id<GuildMarker>),
    Start(Id<GuildMarker>, String, u64),
    Stop(Id<GuildMarker>),
    SetVolume(Id<GuildMarker>, f32),
}

#[derive(Default)]
struct SinkState {
    channels: HashMap<Id<GuildMarker>, Id<ChannelMarker>>,
    playing: HashMap<Id<GuildMarker>, (String, SourceEndSignal)>,
    calls: Vec<SinkCall>,
    fail_starts: usize,
    fail_connect: bool,
}

/// Voice sink that records calls and lets tests end the current source.
#[derive(Default)]
pub struct FakeVoiceSink {
    state: Mutex<SinkState>,
    live: AtomicUsize,
    max_live: AtomicUsize,
}

impl FakeVoiceSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next `n` calls to `start` fail.
    pub fn fail_next_starts(&self, n: usize) {
        self.state.lock().fail_starts = n;
    }

    pub fn fail_connects(&self, fail: bool) {
        self.state.lock().fail_connect = fail;
    }

    /// Simulates the upstream dropping: the source stops and its signal fires.
    pub fn end_current(&self, guild_id: Id<GuildMarker>, error: Option<&str>) -> bool {
        let removed = self.state.lock().playing.remove(&guild_id);
        match removed {
            Some((_, signal)) => {
                self.live.fetch_sub(1, Ordering::SeqCst);
                signal.fire(error.map(str::to_string))
            }
            None => false,
        }
    }

    /// The end signal of the current source, e.g. to fire it twice.
    pub fn current_signal(&self, guild_id: Id<GuildMarker>) -> Option<SourceEndSignal> {
        self.state.lock().playing.get(&guild_id).map(|(_, s)| s.clone())
    }

    pub fn playing_url(&self, guild_id: Id<GuildMarker>) -> Option<String> {
        self.state.lock().playing.get(&guild_id).map(|(u, _)| u.clone())
    }

    pub fn calls(&self) -> Vec<SinkCall> {
        self.state.lock().calls.clone()
    }

    pub fn start_count(&self) -> usize {
        self.calls().iter().filter(|c| matches!(c, SinkCall::Start(..))).count()
    }

    /// Highest number of sources that were ever live at once.
    pub fn max_concurrent_sources(&self) -> usize {
        self.max_live.load(Ordering::SeqCst)
    }

    pub fn set_channel(&self, guild_id: Id<GuildMarker>, channel_id: Id<ChannelMarker>) {
        self.state.lock().channels.insert(guild_id, channel_id);
    }
}

#[async_trait]
impl VoiceSink for FakeVoiceSink {
    async fn connect(&self, guild_id: Id<GuildMarker>, channel_id: Id<ChannelMarker>) -> Result<(), Error> {
        let mut state = self.state.lock();
        state.calls.push(SinkCall::Connect(guild_id, channel_id));
        if state.fail_connect {
            return Err(Error::Platform("voice gateway unavailable".into()));
        }
        state.channels.insert(guild_id, channel_id);
        Ok(())
    }

    async fn disconnect(&self, guild_id: Id<GuildMarker>) -> Result<(), Error> {
        let mut state = self.state.lock();
        state.calls.push(SinkCall::Disconnect(guild_id));
        state.channels.remove(&guild_id);
        if let Some((_, signal)) = state.playing.remove(&guild_id) {
            signal.disarm();
            self.live.fetch_sub(1, Ordering::SeqCst);
        }
        Ok(())
    }

    async fn current_channel(&self, guild_id: Id<GuildMarker>) -> Option<Id<ChannelMarker>> {
        self.state.lock().channels.get(&guild_id).copied()
    }

    async fn is_playing(&self, guild_id: Id<GuildMarker>) -> bool {
        self.state.lock().playing.contains_key(&guild_id)
    }

    async fn start(
        &self,
        guild_id: Id<GuildMarker>,
        url: &str,
        _volume: f32,
        on_end: SourceEndSignal,
    ) -> Result<(), Error> {
        let mut state = self.state.lock();
        state
            .calls
            .push(SinkCall::Start(guild_id, url.to_string(), on_end.generation()));
        if state.fail_starts > 0 {
            state.fail_starts -= 1;
            return Err(Error::Platform(format!("cannot open {url}")));
        }
        if state.playing.insert(guild_id, (url.to_string(), on_end)).is_none() {
            let live = self.live.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_live.fetch_max(live, Ordering::SeqCst);
        } else {
            // A start over a live source: count the overlap.
            self.max_live.fetch_max(self.live.load(Ordering::SeqCst) + 1, Ordering::SeqCst);
        }
        Ok(())
    }

    async fn stop(&self, guild_id: Id<GuildMarker>) -> Result<(), Error> {
        let mut state = self.state.lock();
        state.calls.push(SinkCall::Stop(guild_id));
        if let Some((_, signal)) = state.playing.remove(&guild_id) {
            signal.disarm();
            self.live.fetch_sub(1, Ordering::SeqCst);
        }
        Ok(())
    }

    async fn set_volume(&self, guild_id: Id<GuildMarker>, volume: f32) -> Result<(), Error> {
        self.state.lock().calls.push(SinkCall::SetVolume(guild_id, volume));
        Ok(())
    }
}

#[derive(Default)]
struct ChatState {
    sent: Vec<(Id<ChannelMarker>, OutgoingMessage)>,
    presences: Vec<String>,
    nickname_attempts: Vec<(Id<GuildMarker>, String)>,
    nickname_results: VecDeque<Result<(), Error>>,
    nicknames: HashMap<Id<GuildMarker>, String>,
    members: HashMap<Id<ChannelMarker>, Vec<Id<UserMarker>>>,
    channel_guilds: HashMap<Id<ChannelMarker>, Id<GuildMarker>>,
    channel_names: HashMap<Id<ChannelMarker>, String>,
    typing: usize,
    fail_sends: usize,
}

/// Chat gateway that records everything and replays scripted nickname results.
pub struct FakeChat {
    state: Mutex<ChatState>,
    bot_user: Id<UserMarker>,
}

impl Default for FakeChat {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeChat {
    /// The default voice and command channels belong to `TEST_GUILD`.
    pub fn new() -> Self {
        let chat = Self {
            state: Mutex::new(ChatState::default()),
            bot_user: Id::new(BOT_USER),
        };
        chat.set_channel_guild(Id::new(DEFAULT_VOICE_CHANNEL), Id::new(TEST_GUILD));
        chat.set_channel_guild(Id::new(OTHER_VOICE_CHANNEL), Id::new(TEST_GUILD));
        chat.set_channel_guild(Id::new(COMMAND_CHANNEL), Id::new(TEST_GUILD));
        chat.set_channel_name(Id::new(DEFAULT_VOICE_CHANNEL), "Radio Lounge");
        chat.set_channel_name(Id::new(OTHER_VOICE_CHANNEL), "Gaming");
        chat
    }

    /// Queues the outcome of the next `set_nickname` calls. Once the queue
    /// is empty, calls succeed.
    pub fn push_nickname_result(&self, result: Result<(), Error>) {
        self.state.lock().nickname_results.push_back(result);
    }

    pub fn set_members(&self, channel_id: Id<ChannelMarker>, members: Vec<Id<UserMarker>>) {
        self.state.lock().members.insert(channel_id, members);
    }

    pub fn set_channel_guild(&self, channel_id: Id<ChannelMarker>, guild_id: Id<GuildMarker>) {
        self.state.lock().channel_guilds.insert(channel_id, guild_id);
    }

    pub fn clear_channel_guild(&self, channel_id: Id<ChannelMarker>) {
        self.state.lock().channel_guilds.remove(&channel_id);
    }

    pub fn set_channel_name(&self, channel_id: Id<ChannelMarker>, name: &str) {
        self.state.lock().channel_names.insert(channel_id, name.to_string());
    }

    pub fn set_current_nickname(&self, guild_id: Id<GuildMarker>, nick: &str) {
        self.state.lock().nicknames.insert(guild_id, nick.to_string());
    }

    pub fn fail_next_sends(&self, n: usize) {
        self.state.lock().fail_sends = n;
    }

    pub fn sent(&self) -> Vec<(Id<ChannelMarker>, OutgoingMessage)> {
        self.state.lock().sent.clone()
    }

    pub fn sent_summaries(&self) -> Vec<String> {
        self.sent().iter().map(|(_, m)| m.summary()).collect()
    }

    pub fn presences(&self) -> Vec<String> {
        self.state.lock().presences.clone()
    }

    pub fn nickname_attempts(&self) -> Vec<(Id<GuildMarker>, String)> {
        self.state.lock().nickname_attempts.clone()
    }

    pub fn nickname(&self, guild_id: Id<GuildMarker>) -> Option<String> {
        self.state.lock().nicknames.get(&guild_id).cloned()
    }

    pub fn typing_count(&self) -> usize {
        self.state.lock().typing
    }
}

#[async_trait]
impl ChatGateway for FakeChat {
    async fn send_message(&self, channel_id: Id<ChannelMarker>, message: &OutgoingMessage) -> Result<(), Error> {
        let mut state = self.state.lock();
        if state.fail_sends > 0 {
            state.fail_sends -= 1;
            return Err(Error::Platform("send failed".into()));
        }
        state.sent.push((channel_id, message.clone()));
        Ok(())
    }

    async fn trigger_typing(&self, _channel_id: Id<ChannelMarker>) -> Result<(), Error> {
        self.state.lock().typing += 1;
        Ok(())
    }

    async fn set_nickname(&self, guild_id: Id<GuildMarker>, nickname: &str) -> Result<(), Error> {
        let mut state = self.state.lock();
        state.nickname_attempts.push((guild_id, nickname.to_string()));
        let result = state.nickname_results.pop_front().unwrap_or(Ok(()));
        if result.is_ok() {
            state.nicknames.insert(guild_id, nickname.to_string());
        }
        result
    }

    async fn current_nickname(&self, guild_id: Id<GuildMarker>) -> Option<String> {
        self.state.lock().nicknames.get(&guild_id).cloned()
    }

    async fn set_presence(&self, activity: &str) -> Result<(), Error> {
        self.state.lock().presences.push(activity.to_string());
        Ok(())
    }

    async fn voice_channel_members(&self, channel_id: Id<ChannelMarker>) -> Vec<Id<UserMarker>> {
        self.state.lock().members.get(&channel_id).cloned().unwrap_or_default()
    }

    async fn channel_guild(&self, channel_id: Id<ChannelMarker>) -> Option<Id<GuildMarker>> {
        self.state.lock().channel_guilds.get(&channel_id).copied()
    }

    async fn channel_name(&self, channel_id: Id<ChannelMarker>) -> Option<String> {
        self.state.lock().channel_names.get(&channel_id).cloned()
    }

    fn bot_user_id(&self) -> Option<Id<UserMarker>> {
        Some(self.bot_user)
    }

    async fn connection_status(&self) -> ConnectionStatus {
        ConnectionStatus::Connected
    }
}

/// Returns scripted titles in order, then `UNKNOWN_TITLE`.
#[derive(Default)]
pub struct ScriptedProber {
    titles: Mutex<VecDeque<String>>,
    probed: Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl ScriptedProber {
    pub fn new<I, S>(titles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            titles: Mutex::new(titles.into_iter().map(Into::into).collect()),
            probed: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Every probe sleeps for `delay` first.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn probed_urls(&self) -> Vec<String> {
        self.probed.lock().clone()
    }
}

#[async_trait]
impl TitleSource for ScriptedProber {
    async fn probe(&self, url: &str, _timeout: Duration) -> String {
        self.probed.lock().push(url.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.titles
            .lock()
            .pop_front()
            .unwrap_or_else(|| UNKNOWN_TITLE.to_string())
    }
}

pub struct StaticCoverLookup(pub String);

#[async_trait]
impl CoverArtLookup for StaticCoverLookup {
    async fn cover_for(&self, _title: &str) -> String {
        self.0.clone()
    }
}

/// Config store backed by a `RadioConfig` in memory.
pub struct InMemoryConfigRepository {
    config: Mutex<RadioConfig>,
}

impl InMemoryConfigRepository {
    pub fn new(config: RadioConfig) -> Self {
        Self {
            config: Mutex::new(config),
        }
    }

    pub fn replace(&self, config: RadioConfig) {
        *self.config.lock() = config;
    }
}

#[async_trait]
impl ConfigRepository for InMemoryConfigRepository {
    async fn load(&self) -> Result<RadioConfig, Error> {
        Ok(self.config.lock().clone())
    }

    async fn add_station(&self, station: &Station) -> Result<(), Error> {
        let mut config = self.config.lock();
        let mut pairs: Vec<(String, String)> = config
            .directory
            .stations()
            .iter()
            .map(|s| (s.name.clone(), s.url.clone()))
            .collect();
        pairs.push((station.name.clone(), station.url.clone()));
        config.directory = StationDirectory::from_pairs(pairs);
        Ok(())
    }

    async fn remove_station(&self, index: usize) -> Result<Station, Error> {
        let mut config = self.config.lock();
        let removed = config.directory.resolve_by_index(index)?.clone();
        let pairs: Vec<(String, String)> = config
            .directory
            .stations()
            .iter()
            .filter(|s| s.name != removed.name)
            .map(|s| (s.name.clone(), s.url.clone()))
            .collect();
        config.directory = StationDirectory::from_pairs(pairs);
        Ok(removed)
    }

    async fn set_default_stream_url(&self, url: &str) -> Result<(), Error> {
        self.config.lock().settings.default_stream_url = url.to_string();
        Ok(())
    }
}

/// A command line from an allowed member in the command channel.
pub fn command_from(text: &str) -> crate::eventbus::CommandMessage {
    crate::eventbus::CommandMessage {
        guild_id: Id::new(TEST_GUILD),
        channel_id: Id::new(COMMAND_CHANNEL),
        author_id: Id::new(900),
        author_name: "listener".into(),
        author_roles: vec![Id::<RoleMarker>::new(ALLOWED_ROLE)],
        author_voice_channel: None,
        text: text.to_string(),
        timestamp: chrono::Utc::now(),
    }
}
