//! radiobot-server/src/context.rs
//!
//! Defines the main "global" context (RadioContext) for the bot process.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::info;

use radiobot_common::traits::media_traits::{CoverArtLookup, TitleSource};
use radiobot_common::traits::platform_traits::ChatGateway;
use radiobot_common::traits::repository_traits::ConfigRepository;
use radiobot_core::eventbus::{BotEvent, EventBus};
use radiobot_core::platforms::discord::DiscordPlatform;
use radiobot_core::platforms::spotify::{PlaceholderCoverLookup, SpotifyCoverLookup};
use radiobot_core::repositories::IniConfigRepository;
use radiobot_core::services::{
    ChannelOccupancyMonitor, CommandService, ConfigService, FfmpegTitleProber, IdentitySync,
    PlaybackSupervisor, PresenceAnnouncer, RadioEventService,
};
use radiobot_core::Error;

use crate::Args;

/// Environment variable that overrides `[settings] token`.
pub const TOKEN_ENV: &str = "DISCORD_TOKEN";

/// Everything the process keeps alive between startup and shutdown.
pub struct RadioContext {
    pub event_bus: Arc<EventBus>,
    pub config: Arc<ConfigService>,
    pub discord: Arc<DiscordPlatform>,
    pub chat: Arc<dyn ChatGateway>,
    pub supervisor: Arc<PlaybackSupervisor>,
    pub announcer: Arc<PresenceAnnouncer>,
    pub event_service: Arc<RadioEventService>,
    /// Subscribed before the gateway connects; handed to the event service.
    pub event_rx: Option<mpsc::Receiver<BotEvent>>,
}

impl RadioContext {
    /// Loads the config, connects to Discord and wires every service.
    /// A bad or missing config is returned as `Error::Config`.
    pub async fn new(args: &Args) -> Result<Self, Error> {
        // 1) Config
        let repo = Arc::new(IniConfigRepository::new(args.config.clone()));
        let mut initial = repo.load().await?;
        if let Ok(token) = std::env::var(TOKEN_ENV) {
            if !token.trim().is_empty() {
                info!("Using bot token from {TOKEN_ENV}");
                initial.settings.token = token.trim().to_string();
            }
        }
        let token = initial.settings.token.clone();
        let config = Arc::new(ConfigService::with_config(repo, initial));

        // 2) Event bus, subscribed before any gateway event can arrive
        let event_bus = Arc::new(EventBus::new());
        let event_rx = event_bus.subscribe(None).await;

        // 3) Discord gateway + voice
        let discord = Arc::new(DiscordPlatform::connect(&token, event_bus.clone()).await?);
        let chat: Arc<dyn ChatGateway> = discord.clone();

        // 4) Services
        let supervisor = Arc::new(PlaybackSupervisor::new(discord.voice(), config.clone()));
        let identity = IdentitySync::new(chat.clone());
        let prober: Arc<dyn TitleSource> = Arc::new(FfmpegTitleProber::new());

        let snapshot = config.snapshot();
        let covers: Arc<dyn CoverArtLookup> = match &snapshot.spotify {
            Some(spotify) => Arc::new(SpotifyCoverLookup::new(spotify)),
            None => Arc::new(PlaceholderCoverLookup::new(snapshot.default_cover_url())),
        };

        let announcer = Arc::new(PresenceAnnouncer::new(
            prober.clone(),
            covers,
            chat.clone(),
            supervisor.clone(),
            config.clone(),
        ));
        let occupancy = Arc::new(ChannelOccupancyMonitor::new(
            chat.clone(),
            supervisor.clone(),
            config.clone(),
        ));
        let commands = Arc::new(CommandService::new(
            chat.clone(),
            supervisor.clone(),
            config.clone(),
            identity.clone(),
            prober,
            event_bus.clone(),
        ));
        let event_service = Arc::new(RadioEventService::new(
            event_bus.clone(),
            chat.clone(),
            commands,
            occupancy,
            supervisor.clone(),
            identity,
            config.clone(),
        ));

        Ok(Self {
            event_bus,
            config,
            discord,
            chat,
            supervisor,
            announcer,
            event_service,
            event_rx: Some(event_rx),
        })
    }
}
