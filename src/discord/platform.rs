//! Discord implementations of the platform and avatar collaborators

use crate::avatar::AvatarUploader;
use crate::error::QueueError;
use crate::platform::ChatPlatform;
use crate::types::{ChannelRef, GuildSnapshot};
use async_trait::async_trait;
use serenity::all::{ChannelId, ChannelType, CreateAttachment, EditProfile};
use serenity::cache::Cache;
use serenity::http::Http;
use std::sync::Arc;
use tracing::debug;

/// Guild discovery from the gateway cache, messages and avatar via HTTP
#[derive(Clone)]
pub struct DiscordPlatform {
    http: Arc<Http>,
    cache: Arc<Cache>,
}

impl DiscordPlatform {
    pub fn new(http: Arc<Http>, cache: Arc<Cache>) -> Self {
        Self { http, cache }
    }
}

fn upstream(context: &str, error: serenity::Error) -> QueueError {
    QueueError::UpstreamTransientFailure {
        message: format!("{}: {}", context, error),
    }
}

#[async_trait]
impl ChatPlatform for DiscordPlatform {
    fn guilds(&self) -> Vec<GuildSnapshot> {
        self.cache
            .guilds()
            .into_iter()
            .map(|guild_id| {
                // Guilds not yet delivered by the gateway have no channels
                let channels = self
                    .cache
                    .guild(guild_id)
                    .map(|guild| {
                        guild
                            .channels
                            .values()
                            .filter(|channel| channel.kind == ChannelType::Text)
                            .map(|channel| ChannelRef {
                                guild_id: guild_id.get(),
                                channel_id: channel.id.get(),
                                name: channel.name.clone(),
                            })
                            .collect()
                    })
                    .unwrap_or_default();

                GuildSnapshot {
                    id: guild_id.get(),
                    channels,
                }
            })
            .collect()
    }

    async fn send_message(&self, channel: &ChannelRef, text: &str) -> Result<(), QueueError> {
        ChannelId::new(channel.channel_id)
            .say(&*self.http, text)
            .await
            .map_err(|e| upstream("failed to send message", e))?;
        debug!(channel_id = channel.channel_id, "Sent announcement");
        Ok(())
    }
}

#[async_trait]
impl AvatarUploader for DiscordPlatform {
    async fn upload(&self, image: Vec<u8>) -> Result<(), QueueError> {
        let mut user = self
            .http
            .get_current_user()
            .await
            .map_err(|e| upstream("failed to fetch current user", e))?;

        let attachment = CreateAttachment::bytes(image, "avatar.png");
        user.edit(&*self.http, EditProfile::new().avatar(&attachment))
            .await
            .map_err(|e| upstream("failed to edit avatar", e))
    }
}
