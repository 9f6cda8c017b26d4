//! Discord bot client setup and lifecycle management.

use super::{DiscordPlatform, PugHandler};
use crate::commands::CommandRouter;
use anyhow::{Context, Result};
use serenity::gateway::ShardManager;
use serenity::Client;
use std::sync::Arc;
use tracing::{info, instrument};

/// Discord gateway client for the PUG bot.
pub struct DiscordBot {
    client: Client,
}

impl DiscordBot {
    /// Build the serenity client.
    ///
    /// # Errors
    /// Returns an error if the token is malformed or the client cannot be
    /// initialised.
    #[instrument(skip(token, router), fields(token_len = token.len()))]
    pub async fn new(token: &str, router: Arc<CommandRouter>) -> Result<Self> {
        let intents = PugHandler::intents();
        info!("Building Serenity client with intents: {:?}", intents);

        let client = Client::builder(token, intents)
            .event_handler(PugHandler::new(router))
            .await
            .context("Failed to build Discord client")?;

        Ok(Self { client })
    }

    /// Platform handle sharing this client's HTTP and cache
    pub fn platform(&self) -> Arc<DiscordPlatform> {
        Arc::new(DiscordPlatform::new(
            self.client.http.clone(),
            self.client.cache.clone(),
        ))
    }

    pub fn shard_manager(&self) -> Arc<ShardManager> {
        self.client.shard_manager.clone()
    }

    /// Connect and process gateway events until the shards are shut down.
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> Result<()> {
        info!("Starting Discord bot");
        self.client
            .start()
            .await
            .context("Discord client stopped with an error")
    }
}
