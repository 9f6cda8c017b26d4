//! Serenity event handler for the PUG bot.
//!
//! Guild messages that look like commands are forwarded to the
//! `CommandRouter`; its reply, if any, is posted back to the same channel.

use crate::commands::{CommandInvocation, CommandRouter};
use crate::types::Player;
use serenity::all::{Context, EventHandler, GatewayIntents, Message, Ready};
use serenity::async_trait;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub struct PugHandler {
    router: Arc<CommandRouter>,
}

impl PugHandler {
    pub fn new(router: Arc<CommandRouter>) -> Self {
        Self { router }
    }

    /// Required gateway intents for the bot.
    pub fn intents() -> GatewayIntents {
        GatewayIntents::GUILDS | GatewayIntents::GUILD_MESSAGES | GatewayIntents::MESSAGE_CONTENT
    }
}

#[async_trait]
impl EventHandler for PugHandler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!(
            user = %ready.user.name,
            guilds = ready.guilds.len(),
            "Connected to Discord"
        );
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot {
            return;
        }
        let Some(guild_id) = msg.guild_id else {
            return;
        };
        if !msg
            .content
            .trim_start()
            .starts_with(&self.router.settings().command_prefix)
        {
            return;
        }

        let channel_name = match msg.channel_id.name(&ctx).await {
            Ok(name) => name,
            Err(e) => {
                warn!(channel_id = %msg.channel_id, error = %e, "Failed to resolve channel name");
                return;
            }
        };

        let invocation = CommandInvocation {
            guild_id: guild_id.get(),
            channel_name,
            player: Player::new(msg.author.id.get(), msg.author.name.clone()),
            text: msg.content.clone(),
        };

        let reply = match self.router.handle(&invocation) {
            Ok(Some(reply)) => reply,
            Ok(None) => return,
            Err(e) => {
                error!(guild_id = %guild_id, error = %e, "Command handling failed");
                return;
            }
        };

        match msg.channel_id.say(&ctx, reply).await {
            Ok(_) => debug!(channel_id = %msg.channel_id, "Sent command reply"),
            Err(e) => error!(channel_id = %msg.channel_id, error = %e, "Failed to send reply"),
        }
    }
}
