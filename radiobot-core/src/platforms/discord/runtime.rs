use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use songbird::shards::TwilightMap;
use songbird::Songbird;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use twilight_cache_inmemory::{InMemoryCache, ResourceType};
use twilight_gateway::{
    self as gateway,
    CloseFrame,
    Config,
    Event,
    EventTypeFlags,
    Intents,
    MessageSender,
    Shard,
    StreamExt,
};
use twilight_http::api_error::ApiError;
use twilight_http::client::ClientBuilder;
use twilight_http::error::ErrorType;
use twilight_http::Client as HttpClient;
use twilight_model::channel::message::Embed;
use twilight_model::gateway::payload::incoming::MessageCreate;
use twilight_model::gateway::payload::outgoing::UpdatePresence;
use twilight_model::gateway::presence::{Activity, ActivityType, MinimalActivity, Status};
use twilight_model::id::marker::{ChannelMarker, GuildMarker, UserMarker};
use twilight_model::id::Id;
use twilight_model::util::Timestamp;
use twilight_util::builder::embed::{EmbedBuilder, EmbedFieldBuilder, EmbedFooterBuilder, ImageSource};

use radiobot_common::models::message::{EmbedSpec, OutgoingMessage};
use radiobot_common::traits::platform_traits::{ChatGateway, ConnectionStatus};
use crate::Error;
use crate::eventbus::{BotEvent, CommandMessage, EventBus};
use crate::platforms::discord::songbird::SongbirdManager;
use crate::services::command_service::COMMAND_PREFIX;

/// The shard runner:
///   - calls `shard.next_event(...)`
///   - updates the in-memory cache and feeds Songbird's voice state
///   - publishes the events the radio cares about on the bus.
async fn shard_runner(
    mut shard: Shard,
    cache: Arc<InMemoryCache>,
    songbird: Arc<Songbird>,
    event_bus: Arc<EventBus>,
    status: Arc<RwLock<ConnectionStatus>>,
) {
    let shard_id = shard.id().number();
    info!("(ShardRunner) Shard {shard_id} started. Listening for events.");

    while let Some(item) = shard.next_event(EventTypeFlags::all()).await {
        let event = match item {
            Ok(event) => event,
            Err(err) => {
                warn!("Shard {shard_id} => error receiving event: {err:?}");
                continue;
            }
        };

        cache.update(&event);
        songbird.process(&event).await;

        match &event {
            Event::Ready(ready) => {
                info!(
                    "Shard {shard_id} => READY as {} (ID={}) in {} guild(s)",
                    ready.user.name,
                    ready.user.id,
                    ready.guilds.len()
                );
                *status.write() = ConnectionStatus::Connected;
                let guild_ids = ready.guilds.iter().map(|g| g.id).collect();
                event_bus.publish(BotEvent::Ready { guild_ids }).await;
            }
            Event::Resumed => {
                *status.write() = ConnectionStatus::Connected;
            }
            Event::GatewayClose(frame) => {
                warn!("Shard {shard_id} => gateway closed: {frame:?}");
                *status.write() = ConnectionStatus::Reconnecting;
            }
            Event::MessageCreate(msg_create) => {
                if let Some(cmd) = command_from_message(msg_create, &cache) {
                    event_bus.publish(BotEvent::ChatCommand(cmd)).await;
                }
            }
            Event::VoiceStateUpdate(update) => {
                if let Some(guild_id) = update.guild_id {
                    event_bus
                        .publish(BotEvent::VoiceStateChanged {
                            guild_id,
                            user_id: update.user_id,
                            channel_id: update.channel_id,
                        })
                        .await;
                }
            }
            _ => {
                trace!("Shard {shard_id} => unhandled event: {:?}", event.kind());
            }
        }
    }

    warn!("(ShardRunner) Shard {shard_id} event loop ended.");
}

/// Turns a guild message starting with `!` into a command for the bus.
fn command_from_message(msg: &MessageCreate, cache: &InMemoryCache) -> Option<CommandMessage> {
    if msg.author.bot {
        return None;
    }
    if !msg.content.trim_start().starts_with(COMMAND_PREFIX) {
        return None;
    }
    let Some(guild_id) = msg.guild_id else {
        debug!("Ignoring DM command from {}", msg.author.name);
        return None;
    };

    let author_roles = msg
        .member
        .as_ref()
        .map(|m| m.roles.clone())
        .unwrap_or_default();
    let author_voice_channel = cache
        .voice_state(msg.author.id, guild_id)
        .map(|vs| vs.channel_id());

    Some(CommandMessage {
        guild_id,
        channel_id: msg.channel_id,
        author_id: msg.author.id,
        author_name: msg.author.name.clone(),
        author_roles,
        author_voice_channel,
        text: msg.content.clone(),
        timestamp: chrono::Utc::now(),
    })
}

/// Maps a twilight error, surfacing 429s as `Error::RateLimited`.
fn map_http_error(err: twilight_http::Error) -> Error {
    if let ErrorType::Response {
        error: ApiError::Ratelimited(limited),
        ..
    } = err.kind()
    {
        return Error::RateLimited {
            retry_after: Duration::from_secs_f64(limited.retry_after.max(0.0)),
        };
    }
    Error::Platform(format!("Discord HTTP error: {err}"))
}

/// Renders a platform-neutral embed with twilight's builders.
pub fn build_embed(desc: &EmbedSpec) -> Result<Embed, Error> {
    let mut builder = EmbedBuilder::new();
    if let Some(title) = &desc.title {
        builder = builder.title(title);
    }
    if let Some(description) = &desc.description {
        builder = builder.description(description);
    }
    if let Some(color) = desc.color {
        builder = builder.color(color);
    }
    if let Some(url) = &desc.thumbnail_url {
        match ImageSource::url(url) {
            Ok(source) => builder = builder.thumbnail(source),
            Err(e) => warn!("Skipping invalid thumbnail URL '{url}': {e}"),
        }
    }
    for field in &desc.fields {
        let mut field_builder = EmbedFieldBuilder::new(&field.name, &field.value);
        if field.inline {
            field_builder = field_builder.inline();
        }
        builder = builder.field(field_builder);
    }
    if let Some(footer) = &desc.footer {
        builder = builder.footer(EmbedFooterBuilder::new(footer));
    }
    if desc.timestamp {
        let now = Timestamp::from_secs(chrono::Utc::now().timestamp())
            .map_err(|e| Error::Platform(format!("bad timestamp: {e}")))?;
        builder = builder.timestamp(now);
    }
    Ok(builder.build())
}

/// The connected Discord bot: HTTP client, gateway shards, cache and voice.
pub struct DiscordPlatform {
    http: Arc<HttpClient>,
    cache: Arc<InMemoryCache>,
    bot_user_id: Id<UserMarker>,
    shard_senders: Vec<MessageSender>,
    shard_tasks: parking_lot::Mutex<Vec<JoinHandle<()>>>,
    voice: Arc<SongbirdManager>,
    status: Arc<RwLock<ConnectionStatus>>,
}

impl DiscordPlatform {
    /// Logs in, starts every recommended shard and wires Songbird to them.
    pub async fn connect(token: &str, event_bus: Arc<EventBus>) -> Result<Self, Error> {
        if token.trim().is_empty() {
            return Err(Error::Config("Discord token is empty".into()));
        }

        let http = Arc::new(
            ClientBuilder::new()
                .token(token.to_string())
                .timeout(Duration::from_secs(30))
                .build(),
        );

        let bot_user = http
            .current_user()
            .await
            .map_err(map_http_error)?
            .model()
            .await
            .map_err(|e| Error::Platform(format!("current user parse error: {e}")))?;
        info!("(DiscordPlatform) Logged in as {} (ID={})", bot_user.name, bot_user.id);

        let cache = Arc::new(
            InMemoryCache::builder()
                .resource_types(
                    ResourceType::GUILD
                        | ResourceType::CHANNEL
                        | ResourceType::MEMBER
                        | ResourceType::VOICE_STATE
                        | ResourceType::USER_CURRENT,
                )
                .build(),
        );

        let config = Config::new(
            token.to_string(),
            Intents::GUILDS
                | Intents::GUILD_MESSAGES
                | Intents::MESSAGE_CONTENT
                | Intents::GUILD_VOICE_STATES,
        );
        let shards: Vec<Shard> = gateway::create_recommended(&http, config, |_, b| b.build())
            .await
            .map_err(|e| Error::Platform(format!("create_recommended error: {e}")))?
            .collect();

        let senders: HashMap<u32, MessageSender> = shards
            .iter()
            .map(|s| (s.id().number(), s.sender()))
            .collect();
        let songbird = Arc::new(Songbird::twilight(
            Arc::new(TwilightMap::new(senders)),
            bot_user.id,
        ));

        let status = Arc::new(RwLock::new(ConnectionStatus::Reconnecting));
        let mut shard_senders = Vec::with_capacity(shards.len());
        let mut shard_tasks = Vec::with_capacity(shards.len());
        for shard in shards {
            shard_senders.push(shard.sender());
            shard_tasks.push(tokio::spawn(shard_runner(
                shard,
                cache.clone(),
                songbird.clone(),
                event_bus.clone(),
                status.clone(),
            )));
        }

        Ok(Self {
            http,
            cache,
            bot_user_id: bot_user.id,
            shard_senders,
            shard_tasks: parking_lot::Mutex::new(shard_tasks),
            voice: Arc::new(SongbirdManager::new(songbird)),
            status,
        })
    }

    pub fn voice(&self) -> Arc<SongbirdManager> {
        self.voice.clone()
    }

    /// Closes every shard and waits for the runners to finish.
    pub async fn disconnect(&self) {
        *self.status.write() = ConnectionStatus::Disconnected;
        for sender in &self.shard_senders {
            let _ = sender.close(CloseFrame::NORMAL);
        }
        let tasks: Vec<_> = std::mem::take(&mut *self.shard_tasks.lock());
        for task in tasks {
            let _ = task.await;
        }
    }
}

#[async_trait]
impl ChatGateway for DiscordPlatform {
    async fn send_message(&self, channel_id: Id<ChannelMarker>, message: &OutgoingMessage) -> Result<(), Error> {
        let embeds = match &message.embed {
            Some(desc) => vec![build_embed(desc)?],
            None => Vec::new(),
        };
        let mut request = self.http.create_message(channel_id);
        if let Some(content) = &message.content {
            request = request.content(content);
        }
        if !embeds.is_empty() {
            request = request.embeds(&embeds);
        }
        request.await.map_err(map_http_error)?;
        Ok(())
    }

    async fn trigger_typing(&self, channel_id: Id<ChannelMarker>) -> Result<(), Error> {
        self.http
            .create_typing_trigger(channel_id)
            .await
            .map_err(map_http_error)?;
        Ok(())
    }

    async fn set_nickname(&self, guild_id: Id<GuildMarker>, nickname: &str) -> Result<(), Error> {
        self.http
            .update_current_member(guild_id)
            .nick(Some(nickname))
            .await
            .map_err(map_http_error)?;
        Ok(())
    }

    async fn current_nickname(&self, guild_id: Id<GuildMarker>) -> Option<String> {
        let cached = self
            .cache
            .member(guild_id, self.bot_user_id)
            .map(|m| m.nick().map(str::to_string));
        if let Some(nick) = cached {
            return nick;
        }
        match self.http.guild_member(guild_id, self.bot_user_id).await {
            Ok(resp) => resp.model().await.ok().and_then(|m| m.nick),
            Err(e) => {
                warn!("Guild {guild_id}: cannot read own nickname: {e}");
                None
            }
        }
    }

    async fn set_presence(&self, activity: &str) -> Result<(), Error> {
        let listening: Activity = MinimalActivity {
            kind: ActivityType::Listening,
            name: activity.to_string(),
            url: None,
        }
        .into();
        let presence = UpdatePresence::new(vec![listening], false, None, Status::Online)
            .map_err(|e| Error::Platform(format!("invalid presence: {e}")))?;
        for sender in &self.shard_senders {
            sender
                .command(&presence)
                .map_err(|e| Error::Platform(format!("presence update failed: {e}")))?;
        }
        Ok(())
    }

    async fn voice_channel_members(&self, channel_id: Id<ChannelMarker>) -> Vec<Id<UserMarker>> {
        match self.cache.voice_channel_states(channel_id) {
            Some(states) => states.map(|vs| vs.user_id()).collect(),
            None => Vec::new(),
        }
    }

    async fn channel_guild(&self, channel_id: Id<ChannelMarker>) -> Option<Id<GuildMarker>> {
        let cached = self.cache.channel(channel_id).map(|c| c.guild_id);
        if let Some(guild_id) = cached {
            return guild_id;
        }
        match self.http.channel(channel_id).await {
            Ok(resp) => resp.model().await.ok().and_then(|c| c.guild_id),
            Err(e) => {
                error!("Error fetching channel {channel_id} => {e:?}");
                None
            }
        }
    }

    async fn channel_name(&self, channel_id: Id<ChannelMarker>) -> Option<String> {
        let cached = self.cache.channel(channel_id).map(|c| c.name.clone());
        if let Some(name) = cached {
            return name;
        }
        let resp = self.http.channel(channel_id).await.ok()?;
        resp.model().await.ok().and_then(|c| c.name)
    }

    fn bot_user_id(&self) -> Option<Id<UserMarker>> {
        Some(self.bot_user_id)
    }

    async fn connection_status(&self) -> ConnectionStatus {
        self.status.read().clone()
    }
}
