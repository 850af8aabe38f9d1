// File: src/services/mod.rs

pub mod builtin_commands;
pub mod command_service;
pub mod config_service;
pub mod identity_sync;
pub mod occupancy_monitor;
pub mod playback_supervisor;
pub mod presence_announcer;
pub mod radio_event_service;
pub mod title_prober;

pub use command_service::CommandService;
pub use config_service::ConfigService;
pub use identity_sync::IdentitySync;
pub use occupancy_monitor::{ChannelOccupancyMonitor, OccupancyOutcome};
pub use playback_supervisor::PlaybackSupervisor;
pub use presence_announcer::{PresenceAnnouncer, TickOutcome};
pub use radio_event_service::RadioEventService;
pub use title_prober::FfmpegTitleProber;
