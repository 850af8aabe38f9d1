// File: src/platforms/mod.rs

pub use radiobot_common::traits::platform_traits::{ChatGateway, ConnectionStatus, VoiceSink};

pub mod discord;
pub mod spotify;
