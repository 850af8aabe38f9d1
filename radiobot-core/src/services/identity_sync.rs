// File: radiobot-core/src/services/identity_sync.rs

use std::sync::Arc;

use dashmap::DashMap;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use twilight_model::id::Id;
use twilight_model::id::marker::GuildMarker;

use radiobot_common::models::identity::{station_label, IdentityState, SyncOutcome};
use radiobot_common::traits::platform_traits::ChatGateway;
use crate::Error;

/// Keeps the bot's per-guild nickname in line with the playing station.
/// Nickname updates are heavily rate limited, so a rejected update schedules
/// exactly one retry and later calls coalesce into it.
#[derive(Clone)]
pub struct IdentitySync {
    chat: Arc<dyn ChatGateway>,
    states: Arc<DashMap<Id<GuildMarker>, Arc<Mutex<IdentityState>>>>,
}

impl IdentitySync {
    pub fn new(chat: Arc<dyn ChatGateway>) -> Self {
        Self {
            chat,
            states: Arc::new(DashMap::new()),
        }
    }

    fn state(&self, guild_id: Id<GuildMarker>) -> Arc<Mutex<IdentityState>> {
        self.states.entry(guild_id).or_default().clone()
    }

    pub async fn sync_station(&self, guild_id: Id<GuildMarker>, station_name: &str) -> Result<SyncOutcome, Error> {
        self.sync(guild_id, &station_label(station_name)).await
    }

    pub async fn sync(&self, guild_id: Id<GuildMarker>, label: &str) -> Result<SyncOutcome, Error> {
        let state = self.state(guild_id);
        let mut state = state.lock().await;
        state.desired_label = label.to_string();
        self.apply_locked(guild_id, &mut state).await
    }

    async fn apply_locked(
        &self,
        guild_id: Id<GuildMarker>,
        state: &mut IdentityState,
    ) -> Result<SyncOutcome, Error> {
        if !state.seeded {
            state.last_applied_label = self.chat.current_nickname(guild_id).await;
            state.seeded = true;
        }

        if state.last_applied_label.as_deref() == Some(state.desired_label.as_str()) {
            return Ok(SyncOutcome::Unchanged);
        }
        if state.pending_retry_at.is_some() {
            debug!("Guild {guild_id}: nickname retry already pending, deferring '{}'", state.desired_label);
            return Ok(SyncOutcome::Pending);
        }

        let desired = state.desired_label.clone();
        match self.chat.set_nickname(guild_id, &desired).await {
            Ok(()) => {
                info!("Guild {guild_id}: nickname set to '{desired}'");
                state.last_applied_label = Some(desired);
                Ok(SyncOutcome::Applied)
            }
            Err(Error::RateLimited { retry_after }) => {
                warn!("Guild {guild_id}: nickname change rate limited, retrying in {retry_after:?}");
                state.pending_retry_at = Some(Instant::now() + retry_after);
                self.schedule_retry(guild_id, retry_after);
                Ok(SyncOutcome::RetryScheduled(retry_after))
            }
            Err(e) => {
                warn!("Guild {guild_id}: failed to set nickname '{desired}': {e}");
                Err(e)
            }
        }
    }

    fn schedule_retry(&self, guild_id: Id<GuildMarker>, delay: std::time::Duration) {
        let this = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            match this.retry(guild_id).await {
                Ok(outcome) => debug!("Guild {guild_id}: nickname retry => {outcome:?}"),
                Err(e) => warn!("Guild {guild_id}: nickname retry failed: {e}"),
            }
        });
    }

    /// Clears the pending flag and applies whatever label is desired now.
    fn retry(&self, guild_id: Id<GuildMarker>) -> BoxFuture<'_, Result<SyncOutcome, Error>> {
        async move {
            let state = self.state(guild_id);
            let mut state = state.lock().await;
            state.pending_retry_at = None;
            self.apply_locked(guild_id, &mut state).await
        }
        .boxed()
    }

    pub async fn snapshot(&self, guild_id: Id<GuildMarker>) -> Option<IdentityState> {
        let state = self.states.get(&guild_id).map(|s| s.clone())?;
        let snapshot = state.lock().await.clone();
        Some(snapshot)
    }
}
