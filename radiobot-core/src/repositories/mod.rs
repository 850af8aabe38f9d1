// src/repositories/mod.rs

pub mod ini;

pub use ini::{parse_radio_config, IniConfigRepository};
