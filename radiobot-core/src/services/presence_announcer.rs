// File: radiobot-core/src/services/presence_announcer.rs

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use radiobot_common::models::message::{EmbedSpec, OutgoingMessage};
use radiobot_common::traits::media_traits::{CoverArtLookup, TitleSource, UNKNOWN_TITLE};
use radiobot_common::traits::platform_traits::ChatGateway;
use crate::services::config_service::ConfigService;
use crate::services::playback_supervisor::PlaybackSupervisor;

pub const NOW_PLAYING_COLOR: u32 = 0x1DB954;

#[derive(Debug, Default)]
pub struct AnnouncementState {
    pub last_posted_title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// The previous tick is still running.
    Busy,
    NothingSelected,
    NoTitle,
    Banned(String),
    Duplicate(String),
    Published(String),
    /// Presence was updated but the channel post failed; the title will be retried next tick.
    PostFailed(String),
}

/// Turns probed stream titles into a "Listening to" presence and a
/// "Now Playing" post, skipping repeats and banned titles.
pub struct PresenceAnnouncer {
    prober: Arc<dyn TitleSource>,
    covers: Arc<dyn CoverArtLookup>,
    chat: Arc<dyn ChatGateway>,
    supervisor: Arc<PlaybackSupervisor>,
    config: Arc<ConfigService>,
    state: Mutex<AnnouncementState>,
}

impl PresenceAnnouncer {
    pub fn new(
        prober: Arc<dyn TitleSource>,
        covers: Arc<dyn CoverArtLookup>,
        chat: Arc<dyn ChatGateway>,
        supervisor: Arc<PlaybackSupervisor>,
        config: Arc<ConfigService>,
    ) -> Self {
        Self {
            prober,
            covers,
            chat,
            supervisor,
            config,
            state: Mutex::new(AnnouncementState::default()),
        }
    }

    pub async fn tick(&self) -> TickOutcome {
        let Ok(mut state) = self.state.try_lock() else {
            debug!("Presence tick skipped: previous tick still running");
            return TickOutcome::Busy;
        };

        let Some(selection) = self.supervisor.current_selection() else {
            return TickOutcome::NothingSelected;
        };

        let config = self.config.snapshot();
        let title = self
            .prober
            .probe(&selection.url, config.settings.probe_timeout)
            .await;
        let title = title.trim().to_string();

        if title.is_empty() || title == UNKNOWN_TITLE {
            return TickOutcome::NoTitle;
        }
        if config.ban_list.is_banned(&title) {
            info!("Skipping banned title '{title}'");
            return TickOutcome::Banned(title);
        }
        if state.last_posted_title.as_deref() == Some(title.as_str()) {
            return TickOutcome::Duplicate(title);
        }

        if let Err(e) = self.chat.set_presence(&title).await {
            warn!("Could not update presence to '{title}': {e}");
        }

        let cover = self.covers.cover_for(&title).await;
        let station = config.directory.resolve_by_url(&selection.url);
        let mut embed = EmbedSpec::new()
            .color(NOW_PLAYING_COLOR)
            .field("Now Playing", title.clone())
            .footer(station.name.clone());
        if !cover.is_empty() {
            embed = embed.thumbnail(cover);
        }

        match self
            .chat
            .send_message(config.update_channel(), &OutgoingMessage::embed(embed))
            .await
        {
            Ok(()) => {
                info!("Now playing: {title} ({})", station.name);
                state.last_posted_title = Some(title.clone());
                TickOutcome::Published(title)
            }
            Err(e) => {
                warn!("Could not post now-playing for '{title}': {e}");
                TickOutcome::PostFailed(title)
            }
        }
    }

    pub async fn last_posted_title(&self) -> Option<String> {
        self.state.lock().await.last_posted_title.clone()
    }
}
