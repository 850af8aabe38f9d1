// File: radiobot-core/src/services/config_service.rs

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{info, warn};

use radiobot_common::models::config::RadioConfig;
use radiobot_common::models::station::Station;
use radiobot_common::traits::repository_traits::ConfigRepository;
use crate::Error;

/// Holds the live configuration snapshot. Readers clone the `Arc` and never
/// observe a half-applied reload.
pub struct ConfigService {
    repo: Arc<dyn ConfigRepository>,
    current: RwLock<Arc<RadioConfig>>,
}

impl ConfigService {
    /// Loads the initial snapshot. Any error here is fatal for the caller.
    pub async fn load(repo: Arc<dyn ConfigRepository>) -> Result<Self, Error> {
        let config = repo.load().await?;
        Ok(Self::with_config(repo, config))
    }

    pub fn with_config(repo: Arc<dyn ConfigRepository>, config: RadioConfig) -> Self {
        Self {
            repo,
            current: RwLock::new(Arc::new(config)),
        }
    }

    pub fn snapshot(&self) -> Arc<RadioConfig> {
        self.current.read().clone()
    }

    /// Re-reads the store and swaps the snapshot. On error the old snapshot stays.
    pub async fn reload(&self) -> Result<Arc<RadioConfig>, Error> {
        let fresh = match self.repo.load().await {
            Ok(cfg) => Arc::new(cfg),
            Err(e) => {
                warn!("Config reload failed, keeping previous snapshot: {e}");
                return Err(e);
            }
        };
        *self.current.write() = fresh.clone();
        info!(
            "Config reloaded: {} stations, {} banned title patterns",
            fresh.directory.len(),
            fresh.ban_list.len()
        );
        Ok(fresh)
    }

    pub async fn add_station(&self, station: Station) -> Result<Arc<RadioConfig>, Error> {
        if self.snapshot().directory.stations().iter().any(|s| s.name == station.name) {
            return Err(Error::InvalidArgument(format!(
                "a station named '{}' already exists",
                station.name
            )));
        }
        self.repo.add_station(&station).await?;
        self.reload().await
    }

    pub async fn remove_station(&self, index: usize) -> Result<Station, Error> {
        let removed = self.repo.remove_station(index).await?;
        self.reload().await?;
        Ok(removed)
    }

    pub async fn set_default_stream_url(&self, url: &str) -> Result<Arc<RadioConfig>, Error> {
        self.repo.set_default_stream_url(url).await?;
        self.reload().await
    }
}
