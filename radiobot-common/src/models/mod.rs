pub mod config;
pub mod identity;
pub mod message;
pub mod playback;
pub mod station;

pub use config::{BotSettings, RadioConfig, SpotifySettings};
pub use identity::{IdentityState, SyncOutcome};
pub use message::{EmbedField, EmbedSpec, OutgoingMessage};
pub use playback::{
    PlayOutcome, PlaybackSession, PlaybackState, RestartOutcome, Selection, SourceEndSignal,
    SourceEnded,
};
pub use station::{BanList, Station, StationDirectory, UNKNOWN_STATION};
