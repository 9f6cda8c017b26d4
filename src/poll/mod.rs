//! Background poll loop
//!
//! Every tick walks the guilds the platform reports, makes sure each queue
//! channel has a queue, refreshes the avatar badge when exactly one guild is
//! connected, and starts any queue that has filled up. Guilds are processed
//! concurrently and a failure in one never stops the others.

use crate::avatar::AvatarThrottler;
use crate::config::AppConfig;
use crate::error::QueueError;
use crate::metrics::MetricsCollector;
use crate::platform::ChatPlatform;
use crate::queue::{lock_queue, GuildRegistry};
use crate::types::{ChannelRef, GuildSnapshot, TeamNames};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// Poll loop settings taken from the application configuration
#[derive(Debug, Clone)]
pub struct PollSettings {
    pub interval: Duration,
    pub queue_channel_name: String,
    pub command_prefix: String,
    pub team_names: TeamNames,
}

impl From<&AppConfig> for PollSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            interval: config.polling_interval(),
            queue_channel_name: config.bot.queue_channel_name.clone(),
            command_prefix: config.bot.command_prefix.clone(),
            team_names: config.queue.team_names.clone(),
        }
    }
}

/// What happened during one tick
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub guilds_seen: usize,
    pub channels_polled: usize,
    pub matches_started: usize,
    pub degenerate_starts: usize,
    pub errors: usize,
}

impl TickReport {
    fn merge(&mut self, other: TickReport) {
        self.channels_polled += other.channels_polled;
        self.matches_started += other.matches_started;
        self.degenerate_starts += other.degenerate_starts;
        self.errors += other.errors;
    }
}

#[derive(Clone)]
pub struct PollLoop {
    platform: Arc<dyn ChatPlatform>,
    registry: Arc<GuildRegistry>,
    throttler: Arc<AvatarThrottler>,
    metrics: Arc<MetricsCollector>,
    settings: PollSettings,
}

impl PollLoop {
    pub fn new(
        platform: Arc<dyn ChatPlatform>,
        registry: Arc<GuildRegistry>,
        throttler: Arc<AvatarThrottler>,
        metrics: Arc<MetricsCollector>,
        settings: PollSettings,
    ) -> Self {
        Self {
            platform,
            registry,
            throttler,
            metrics,
            settings,
        }
    }

    /// Tick at the configured interval until `shutdown` flips to true or its
    /// sender is dropped. A tick in progress always runs to completion.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(self.settings.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(
            "Poll loop started ({:?} interval, channel #{})",
            self.settings.interval, self.settings.queue_channel_name
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                _ = interval.tick() => {
                    let report = self.tick().await;
                    debug!("Poll tick finished: {:?}", report);
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!("Poll loop stopped");
    }

    /// Run a single pass over every connected guild
    pub async fn tick(&self) -> TickReport {
        let timer = self.metrics.start_timer();
        let guilds = self.platform.guilds();
        let guild_count = guilds.len();

        let mut report = TickReport {
            guilds_seen: guild_count,
            ..TickReport::default()
        };

        let mut tasks = JoinSet::new();
        for guild in guilds {
            let this = self.clone();
            tasks.spawn(async move { this.process_guild(guild, guild_count).await });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(guild_report) => report.merge(guild_report),
                Err(e) => {
                    error!("Guild poll task failed: {}", e);
                    report.errors += 1;
                }
            }
        }

        self.metrics.record_poll_tick(timer.stop(), report.errors);
        if let (Ok(guilds), Ok(players)) = (self.registry.len(), self.registry.total_queued()) {
            self.metrics.update_queue_gauges(guilds, players);
        }
        report
    }

    async fn process_guild(&self, guild: GuildSnapshot, guild_count: usize) -> TickReport {
        let mut report = TickReport::default();

        for channel in guild
            .channels
            .iter()
            .filter(|c| c.name == self.settings.queue_channel_name)
        {
            report.channels_polled += 1;
            if let Err(e) = self
                .process_channel(channel, guild_count, &mut report)
                .await
            {
                error!(
                    "Failed to poll #{} in guild {}: {}",
                    channel.name, guild.id, e
                );
                report.errors += 1;
            }
        }
        report
    }

    async fn process_channel(
        &self,
        channel: &ChannelRef,
        guild_count: usize,
        report: &mut TickReport,
    ) -> Result<(), QueueError> {
        let queue = self.registry.get_or_create(channel.guild_id)?;

        // The avatar is shared by every guild, so it only tracks a lone guild
        if guild_count == 1 {
            self.throttler.update(&queue).await?;
        }

        // Start and reset under one lock so a full queue is announced once
        let announcement = {
            let mut state = lock_queue(&queue)?;
            if !state.is_full() {
                return Ok(());
            }
            match state.start_match() {
                Ok(announcement) => {
                    state.reset();
                    announcement
                }
                Err(QueueError::DegenerateStart) => {
                    warn!(
                        "Queue in guild {} filled with an empty team, reset without starting",
                        channel.guild_id
                    );
                    self.metrics.record_degenerate_start();
                    report.degenerate_starts += 1;
                    return Ok(());
                }
                Err(e) => return Err(e),
            }
        };

        self.metrics.record_match_started();
        report.matches_started += 1;
        info!(
            "PUG started in guild {}: {} vs {} players",
            channel.guild_id,
            announcement.team_a.len(),
            announcement.team_b.len()
        );

        let text = announcement.render(&self.settings.team_names, &self.settings.command_prefix);
        self.platform.send_message(channel, &text).await
    }
}
