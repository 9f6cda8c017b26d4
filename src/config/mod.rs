//! Configuration management for the PUG queue service
//!
//! Loading from TOML files and environment variables, validation, and
//! default values.

pub mod app;

pub use app::{
    validate_config, AppConfig, AvatarSettings, BotSettings, QueueSettings, ServiceSettings,
};
