//! Test fixtures and mock implementations for integration testing

#![allow(dead_code)]

use async_trait::async_trait;
use pug_queue::avatar::{AvatarThrottler, AvatarUploader, BadgeRenderer};
use pug_queue::commands::{CommandInvocation, CommandRouter, RouterSettings};
use pug_queue::error::QueueError;
use pug_queue::metrics::MetricsCollector;
use pug_queue::platform::ChatPlatform;
use pug_queue::poll::{PollLoop, PollSettings};
use pug_queue::queue::{EmbeddedWordList, GuildRegistry, QueueTemplate};
use pug_queue::types::{ChannelRef, GuildSnapshot, Player, TeamNames};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const QUEUE_CHANNEL: &str = "pugs";
pub const PREFIX: &str = "!";

/// Chat platform with a settable guild list that records every message
#[derive(Default)]
pub struct MockChatPlatform {
    guilds: Mutex<Vec<GuildSnapshot>>,
    sent: Mutex<Vec<(ChannelRef, String)>>,
    /// Guilds whose channels reject every message
    failing_guilds: Mutex<HashSet<u64>>,
}

impl MockChatPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a guild with a queue channel and one unrelated channel
    pub fn add_guild(&self, guild_id: u64) {
        let channels = vec![
            ChannelRef {
                guild_id,
                channel_id: guild_id * 100 + 1,
                name: QUEUE_CHANNEL.to_string(),
            },
            ChannelRef {
                guild_id,
                channel_id: guild_id * 100 + 2,
                name: "general".to_string(),
            },
        ];
        self.guilds.lock().unwrap().push(GuildSnapshot {
            id: guild_id,
            channels,
        });
    }

    pub fn fail_sends_to(&self, guild_id: u64) {
        self.failing_guilds.lock().unwrap().insert(guild_id);
    }

    pub fn sent_messages(&self) -> Vec<(ChannelRef, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn messages_to_guild(&self, guild_id: u64) -> Vec<String> {
        self.sent_messages()
            .into_iter()
            .filter(|(channel, _)| channel.guild_id == guild_id)
            .map(|(_, text)| text)
            .collect()
    }
}

#[async_trait]
impl ChatPlatform for MockChatPlatform {
    fn guilds(&self) -> Vec<GuildSnapshot> {
        self.guilds.lock().unwrap().clone()
    }

    async fn send_message(&self, channel: &ChannelRef, text: &str) -> Result<(), QueueError> {
        if self.failing_guilds.lock().unwrap().contains(&channel.guild_id) {
            return Err(QueueError::UpstreamTransientFailure {
                message: "send rejected".to_string(),
            });
        }
        self.sent
            .lock()
            .unwrap()
            .push((channel.clone(), text.to_string()));
        Ok(())
    }
}

/// Renderer that encodes the level as a single byte
pub struct LevelRenderer;

impl BadgeRenderer for LevelRenderer {
    fn render(&self, level: u8) -> Result<Vec<u8>, QueueError> {
        Ok(vec![level])
    }
}

/// Uploader that records the level byte of every upload
#[derive(Default)]
pub struct RecordingUploader {
    uploads: Mutex<Vec<u8>>,
}

impl RecordingUploader {
    pub fn levels(&self) -> Vec<u8> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl AvatarUploader for RecordingUploader {
    async fn upload(&self, image: Vec<u8>) -> Result<(), QueueError> {
        self.uploads.lock().unwrap().extend(image);
        Ok(())
    }
}

/// A complete in-memory bot: router and poll loop sharing one registry
pub struct TestSystem {
    pub platform: Arc<MockChatPlatform>,
    pub uploader: Arc<RecordingUploader>,
    pub registry: Arc<GuildRegistry>,
    pub metrics: Arc<MetricsCollector>,
    pub router: CommandRouter,
    pub poll_loop: PollLoop,
}

impl TestSystem {
    pub fn new(players_required_total: usize) -> Self {
        Self::with_rate_limit(players_required_total, Duration::from_secs(60))
    }

    pub fn with_rate_limit(players_required_total: usize, rate_limit: Duration) -> Self {
        let platform = Arc::new(MockChatPlatform::new());
        let uploader = Arc::new(RecordingUploader::default());
        let metrics = Arc::new(MetricsCollector::new().unwrap());
        let registry = Arc::new(
            GuildRegistry::new(QueueTemplate {
                players_required_total,
                allow_requeue: false,
                avatar_rate_limit: rate_limit,
            })
            .unwrap(),
        );

        let router = CommandRouter::with_rng(
            registry.clone(),
            Arc::new(EmbeddedWordList::default()),
            RouterSettings {
                command_prefix: PREFIX.to_string(),
                queue_channel_name: QUEUE_CHANNEL.to_string(),
                team_names: TeamNames::default(),
            },
            metrics.clone(),
            StdRng::seed_from_u64(7),
        );

        let throttler = Arc::new(
            AvatarThrottler::new(
                rate_limit,
                Duration::from_secs(5),
                Arc::new(LevelRenderer),
                uploader.clone(),
                metrics.clone(),
            )
            .unwrap(),
        );

        let poll_loop = PollLoop::new(
            platform.clone(),
            registry.clone(),
            throttler,
            metrics.clone(),
            PollSettings {
                interval: Duration::from_millis(20),
                queue_channel_name: QUEUE_CHANNEL.to_string(),
                command_prefix: PREFIX.to_string(),
                team_names: TeamNames::default(),
            },
        );

        Self {
            platform,
            uploader,
            registry,
            metrics,
            router,
            poll_loop,
        }
    }

    /// Send a command from `player_id` in the queue channel of `guild_id`
    pub fn command(&self, guild_id: u64, player_id: u64, text: &str) -> Option<String> {
        self.router
            .handle(&CommandInvocation {
                guild_id,
                channel_name: QUEUE_CHANNEL.to_string(),
                player: Player::new(player_id, format!("player{}", player_id)),
                text: text.to_string(),
            })
            .unwrap()
    }
}
