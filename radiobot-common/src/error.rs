// ================================================================
// File: radiobot-common/src/error.rs
// ================================================================

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Not found error: {0}")]
    NotFound(String),

    /// Malformed or missing settings. Fatal when raised during startup.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A voice command had nowhere to go: the caller is not in a voice
    /// channel and no usable default channel is configured.
    #[error("No voice channel: {0}")]
    NoVoiceChannel(String),

    #[error("Playback start error: {0}")]
    PlaybackStart(String),

    #[error("Probe timed out after {0:?}")]
    ProbeTimeout(Duration),

    #[error("Probe failure: {0}")]
    ProbeFailure(String),

    /// The platform refused the request and told us how long to back off.
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("Metadata lookup failure: {0}")]
    Lookup(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Permission denied: {0}")]
    Permission(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Platform error: {0}")]
    Platform(String),

    #[error("Parse error: {0}")]
    Parse(String),

}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Parse(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Parse(s.to_string())
    }
}

impl From<std::num::ParseIntError> for Error {
    fn from(err: std::num::ParseIntError) -> Self {
        Error::Parse(err.to_string())
    }
}
