//! Chat platform interface used by the poll loop

use crate::error::QueueError;
use crate::types::{ChannelRef, GuildSnapshot};
use async_trait::async_trait;

/// Outbound side of the chat platform
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// Guilds the bot is currently connected to, with their text channels
    fn guilds(&self) -> Vec<GuildSnapshot>;

    /// Post a message to a channel
    async fn send_message(&self, channel: &ChannelRef, text: &str) -> Result<(), QueueError>;
}
