// src/lib.rs

pub mod eventbus;
pub mod platforms;
pub mod repositories;
pub mod services;
pub mod tasks;
pub mod test_utils;

pub use radiobot_common::error::Error;
