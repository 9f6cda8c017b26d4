//! Discord integration built on serenity
//!
//! The handler feeds guild messages into the command router; the platform
//! type gives the poll loop guild discovery, message sending and avatar
//! uploads.

pub mod client;
pub mod handler;
pub mod platform;

pub use client::DiscordBot;
pub use handler::PugHandler;
pub use platform::DiscordPlatform;
