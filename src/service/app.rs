//! Main application state and service coordination
//!
//! `AppState` owns every long-lived component: the guild registry, the
//! command router, metrics, the Discord gateway and the background tasks
//! (poll loop, health server, health metrics).

use crate::avatar::{ensure_base_avatar, AvatarThrottler, AvatarUploader, PngBadgeRenderer};
use crate::commands::{CommandRouter, RouterSettings};
use crate::config::AppConfig;
use crate::discord::DiscordBot;
use crate::metrics::{HealthServer, HealthServerConfig, MetricsCollector};
use crate::platform::ChatPlatform;
use crate::poll::{PollLoop, PollSettings};
use crate::queue::{EmbeddedWordList, GuildRegistry, QueueTemplate, WordSource};
use crate::service::health::{HealthCheck, HealthStatus};
use serenity::gateway::ShardManager;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

const POLL_TASK: &str = "poll_loop";
const HEALTH_METRICS_INTERVAL: Duration = Duration::from_secs(15);

/// Service-level errors
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Service initialization error: {message}")]
    Initialization { message: String },

    #[error("Discord connection error: {message}")]
    Discord { message: String },
}

/// Main application state containing all service components
pub struct AppState {
    config: AppConfig,

    registry: Arc<GuildRegistry>,
    router: Arc<CommandRouter>,
    metrics: Arc<MetricsCollector>,

    /// Flipped to true to stop every background task
    shutdown_tx: watch::Sender<bool>,

    /// Background task handles, by name
    background_tasks: Mutex<Vec<(&'static str, JoinHandle<()>)>>,

    /// Present once the Discord gateway has been started
    shard_manager: Mutex<Option<Arc<ShardManager>>>,

    is_running: RwLock<bool>,
    started_at: Instant,
}

impl AppState {
    /// Build the in-process components. Nothing connects to Discord yet.
    pub fn new(config: AppConfig) -> Result<Self, ServiceError> {
        info!("Initializing PUG queue service '{}'", config.service.name);

        let metrics =
            Arc::new(
                MetricsCollector::new().map_err(|e| ServiceError::Initialization {
                    message: format!("Failed to create metrics collector: {}", e),
                })?,
            );

        let registry = Arc::new(
            GuildRegistry::new(QueueTemplate {
                players_required_total: config.queue.players_required_total,
                allow_requeue: config.queue.allow_requeue,
                avatar_rate_limit: config.avatar_rate_limit(),
            })
            .map_err(|e| ServiceError::Configuration {
                message: e.to_string(),
            })?,
        );

        let words = Self::load_words(&config)?;
        let router = Arc::new(CommandRouter::new(
            registry.clone(),
            words,
            RouterSettings::from(&config),
            metrics.clone(),
        ));

        let (shutdown_tx, _) = watch::channel(false);

        Ok(Self {
            config,
            registry,
            router,
            metrics,
            shutdown_tx,
            background_tasks: Mutex::new(Vec::new()),
            shard_manager: Mutex::new(None),
            is_running: RwLock::new(false),
            started_at: Instant::now(),
        })
    }

    fn load_words(config: &AppConfig) -> Result<Arc<dyn WordSource>, ServiceError> {
        let words = match (&config.avatar.adjectives_path, &config.avatar.nouns_path) {
            (Some(adjectives), Some(nouns)) => EmbeddedWordList::from_files(adjectives, nouns)
                .map_err(|e| ServiceError::Configuration {
                    message: format!("Failed to load word lists: {:#}", e),
                })?,
            (None, None) => EmbeddedWordList::default(),
            _ => {
                return Err(ServiceError::Configuration {
                    message: "Adjective and noun word lists must be configured together"
                        .to_string(),
                })
            }
        };

        let (adjectives, nouns) = words.sizes();
        debug!("Loaded {} adjectives and {} nouns", adjectives, nouns);
        Ok(Arc::new(words))
    }

    /// Provision the base avatar, connect to Discord and start every
    /// background task
    pub async fn start(self: &Arc<Self>) -> Result<(), ServiceError> {
        info!("Starting PUG queue service");

        ensure_base_avatar(&self.config.avatar)
            .await
            .map_err(|e| ServiceError::Initialization {
                message: format!("Failed to provision base avatar: {:#}", e),
            })?;

        let mut bot = DiscordBot::new(&self.config.bot.token, self.router.clone())
            .await
            .map_err(|e| ServiceError::Discord {
                message: format!("{:#}", e),
            })?;
        let platform = bot.platform();
        *self.shard_manager.lock().await = Some(bot.shard_manager());

        let gateway = tokio::spawn(async move {
            if let Err(e) = bot.start().await {
                error!("Discord gateway stopped: {:#}", e);
            }
        });
        self.track_task("discord_gateway", gateway).await;

        self.start_with_platform(platform.clone(), platform).await
    }

    /// Start the health server, poll loop and health metrics task against
    /// the given platform
    pub async fn start_with_platform(
        self: &Arc<Self>,
        platform: Arc<dyn ChatPlatform>,
        uploader: Arc<dyn AvatarUploader>,
    ) -> Result<(), ServiceError> {
        let renderer = PngBadgeRenderer::from_path(&self.config.avatar.base_image_path).map_err(
            |e| ServiceError::Initialization {
                message: format!("{:#}", e),
            },
        )?;
        let throttler = Arc::new(
            AvatarThrottler::new(
                self.config.avatar_rate_limit(),
                self.config.avatar_upload_timeout(),
                Arc::new(renderer),
                uploader,
                self.metrics.clone(),
            )
            .map_err(|e| ServiceError::Configuration {
                message: e.to_string(),
            })?,
        );

        *self.is_running.write().await = true;

        self.start_health_server().await;

        let poll_loop = PollLoop::new(
            platform,
            self.registry.clone(),
            throttler,
            self.metrics.clone(),
            PollSettings::from(&self.config),
        );
        let shutdown = self.shutdown_tx.subscribe();
        let poll_task = tokio::spawn(async move { poll_loop.run(shutdown).await });
        self.track_task(POLL_TASK, poll_task).await;

        self.start_health_metrics_task().await;

        info!("PUG queue service started");
        Ok(())
    }

    async fn start_health_server(self: &Arc<Self>) {
        let server = HealthServer::new(
            HealthServerConfig {
                port: self.config.service.health_port,
                host: "0.0.0.0".to_string(),
            },
            self.metrics.clone(),
        )
        .with_app_state(self.clone());

        let shutdown = self.shutdown_tx.subscribe();
        let task = tokio::spawn(async move {
            if let Err(e) = server.serve(shutdown).await {
                error!("Health server failed: {:#}", e);
            }
        });
        self.track_task("health_server", task).await;
    }

    async fn start_health_metrics_task(self: &Arc<Self>) {
        let app_state = self.clone();
        let mut shutdown = self.shutdown_tx.subscribe();

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(HEALTH_METRICS_INTERVAL);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let metrics = app_state.metrics();
                        metrics.set_uptime(app_state.uptime());

                        let health = HealthCheck::check(app_state.clone()).await;
                        metrics.update_health_status(health.status.as_gauge());
                        for check in &health.checks {
                            metrics.update_component_health(
                                &check.name,
                                check.status != HealthStatus::Unhealthy,
                            );
                        }
                        debug!("Health metrics updated: {}", health.status);
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }
        });
        self.track_task("health_metrics", task).await;
    }

    async fn track_task(&self, name: &'static str, handle: JoinHandle<()>) {
        debug!("Background task '{}' started", name);
        self.background_tasks.lock().await.push((name, handle));
    }

    /// Stop every background task, waiting up to the configured shutdown
    /// timeout before aborting stragglers
    pub async fn shutdown(&self) {
        info!("Starting graceful shutdown of PUG queue service");
        *self.is_running.write().await = false;

        let _ = self.shutdown_tx.send(true);
        if let Some(shard_manager) = self.shard_manager.lock().await.take() {
            shard_manager.shutdown_all().await;
            info!("Discord gateway shut down");
        }

        let deadline = tokio::time::Instant::now() + self.config.shutdown_timeout();
        let tasks: Vec<_> = self.background_tasks.lock().await.drain(..).collect();
        for (name, mut handle) in tasks {
            match tokio::time::timeout_at(deadline, &mut handle).await {
                Ok(Ok(())) => debug!("Background task '{}' stopped", name),
                Ok(Err(e)) => warn!("Background task '{}' ended abnormally: {}", name, e),
                Err(_) => {
                    warn!("Background task '{}' did not stop in time, aborting", name);
                    handle.abort();
                }
            }
        }

        info!(
            "Final state: {} guilds, {} players queued, {} matches started",
            self.registry.len().unwrap_or_default(),
            self.registry.total_queued().unwrap_or_default(),
            self.metrics.queue().matches_started_total.get()
        );
        info!("PUG queue service shutdown completed");
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub async fn is_running(&self) -> bool {
        *self.is_running.read().await
    }

    pub fn registry(&self) -> Arc<GuildRegistry> {
        self.registry.clone()
    }

    pub fn router(&self) -> Arc<CommandRouter> {
        self.router.clone()
    }

    pub fn metrics(&self) -> Arc<MetricsCollector> {
        self.metrics.clone()
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// `None` before the poll loop has been started
    pub async fn poll_loop_alive(&self) -> Option<bool> {
        self.background_tasks
            .lock()
            .await
            .iter()
            .find(|(name, _)| *name == POLL_TASK)
            .map(|(_, handle)| !handle.is_finished())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_odd_player_count() {
        let mut config = AppConfig::default();
        config.queue.players_required_total = 7;

        let result = AppState::new(config);
        assert!(matches!(result, Err(ServiceError::Configuration { .. })));
    }

    #[test]
    fn test_rejects_half_configured_word_lists() {
        let mut config = AppConfig::default();
        config.avatar.adjectives_path = Some("adjectives.txt".into());

        let result = AppState::new(config);
        assert!(matches!(result, Err(ServiceError::Configuration { .. })));
    }

    #[tokio::test]
    async fn test_new_state_is_idle() {
        let state = AppState::new(AppConfig::default()).unwrap();
        assert!(!state.is_running().await);
        assert_eq!(state.poll_loop_alive().await, None);
        assert!(state.registry().is_empty().unwrap());
    }

    #[tokio::test]
    async fn test_shutdown_without_start() {
        let state = AppState::new(AppConfig::default()).unwrap();
        state.shutdown().await;
        assert!(!state.is_running().await);
    }
}
