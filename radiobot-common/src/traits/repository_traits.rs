use async_trait::async_trait;

use crate::Error;
use crate::models::config::RadioConfig;
use crate::models::station::Station;

/// The persistent settings store (an INI file in production).
#[async_trait]
pub trait ConfigRepository: Send + Sync {
    /// Reads and validates the whole config. `Error::Config` on bad input.
    async fn load(&self) -> Result<RadioConfig, Error>;

    /// Appends a station after the highest existing index.
    async fn add_station(&self, station: &Station) -> Result<(), Error>;

    /// Removes the station at 1-based `index` (in directory order) and
    /// returns it. Remaining stations are renumbered.
    async fn remove_station(&self, index: usize) -> Result<Station, Error>;

    async fn set_default_stream_url(&self, url: &str) -> Result<(), Error>;
}
