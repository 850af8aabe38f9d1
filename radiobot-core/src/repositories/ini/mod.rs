pub mod config;

pub use config::{parse_radio_config, IniConfigRepository};
