use std::time::Duration;

use async_trait::async_trait;

/// Returned by a title source when it could not read a title.
pub const UNKNOWN_TITLE: &str = "Unknown Title";

/// Best-effort "what is playing on this stream right now" sensor.
#[async_trait]
pub trait TitleSource: Send + Sync {
    /// Never fails: any error or timeout yields [`UNKNOWN_TITLE`].
    async fn probe(&self, url: &str, timeout: Duration) -> String;
}

/// Album-art lookup by track title.
#[async_trait]
pub trait CoverArtLookup: Send + Sync {
    /// Never fails: a miss or lookup error yields the placeholder image URL.
    async fn cover_for(&self, title: &str) -> String;
}
