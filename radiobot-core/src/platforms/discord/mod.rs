pub mod runtime;
pub mod songbird;

pub use runtime::DiscordPlatform;
pub use songbird::SongbirdManager;
