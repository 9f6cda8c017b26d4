//! PUG queue - pick-up game matchmaking bot for Discord
//!
//! Players queue for one of two teams with chat commands; a background poll
//! loop announces the match once the queue fills, and the bot's avatar shows
//! how many players are waiting.

pub mod avatar;
pub mod commands;
pub mod config;
pub mod discord;
pub mod error;
pub mod metrics;
pub mod platform;
pub mod poll;
pub mod queue;
pub mod service;
pub mod types;
pub mod utils;

// Re-export commonly used types and traits
pub use error::{QueueError, Result};
pub use types::*;

// Re-export key components
pub use commands::CommandRouter;
pub use platform::ChatPlatform;
pub use poll::PollLoop;
pub use queue::{GuildRegistry, QueueState};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
