//! Service lifecycle tests: AppState wiring against an in-memory platform

mod fixtures;

use fixtures::{MockChatPlatform, RecordingUploader};
use pug_queue::commands::CommandInvocation;
use pug_queue::config::AppConfig;
use pug_queue::service::{AppState, HealthCheck, HealthStatus, ServiceError};
use pug_queue::types::Player;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn test_config(dir: &TempDir) -> AppConfig {
    let base = dir.path().join("base.png");
    image::RgbaImage::new(32, 32).save(&base).unwrap();

    let mut config = AppConfig::default();
    // Ephemeral port so tests never collide
    config.service.health_port = 0;
    config.service.shutdown_timeout_seconds = 5;
    config.queue.players_required_total = 2;
    config.queue.polling_interval_seconds = 1;
    config.avatar.rate_limit_seconds = 1;
    config.avatar.base_image_path = base;
    config
}

fn join(app_state: &AppState, player_id: u64, team: &str) -> Option<String> {
    app_state
        .router()
        .handle(&CommandInvocation {
            guild_id: 1,
            channel_name: app_state.config().bot.queue_channel_name.clone(),
            player: Player::new(player_id, format!("player{}", player_id)),
            text: format!("!pug {}", team),
        })
        .unwrap()
}

#[tokio::test]
async fn test_service_lifecycle() {
    let dir = TempDir::new().unwrap();
    let app_state = Arc::new(AppState::new(test_config(&dir)).unwrap());

    let platform = Arc::new(MockChatPlatform::new());
    platform.add_guild(1);
    let uploader = Arc::new(RecordingUploader::default());

    join(&app_state, 10, "0").unwrap();
    join(&app_state, 11, "1").unwrap();
    // Joins refresh the badge timestamp; wait out the rate limit
    tokio::time::sleep(Duration::from_millis(1100)).await;

    app_state
        .start_with_platform(platform.clone(), uploader.clone())
        .await
        .unwrap();
    assert!(app_state.is_running().await);
    assert_eq!(app_state.poll_loop_alive().await, Some(true));

    let announced = tokio::time::timeout(Duration::from_secs(3), async {
        while platform.sent_messages().is_empty() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await;
    assert!(announced.is_ok(), "match was never announced");

    // The first tick shows the full queue before the match resets it
    assert_eq!(uploader.levels().first(), Some(&2));

    let health = HealthCheck::check(app_state.clone()).await;
    assert_eq!(health.status, HealthStatus::Healthy);
    assert_eq!(health.stats.guilds_tracked, 1);
    assert_eq!(health.stats.matches_started, 1);

    app_state.shutdown().await;
    assert!(!app_state.is_running().await);
    assert_eq!(app_state.poll_loop_alive().await, None);
    assert_eq!(
        HealthCheck::liveness_check(app_state.clone()).await,
        HealthStatus::Unhealthy
    );
}

#[tokio::test]
async fn test_missing_base_image_fails_start() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(&dir);
    config.avatar.base_image_path = dir.path().join("missing.png");
    let app_state = Arc::new(AppState::new(config).unwrap());

    let result = app_state
        .start_with_platform(
            Arc::new(MockChatPlatform::new()),
            Arc::new(RecordingUploader::default()),
        )
        .await;

    assert!(matches!(result, Err(ServiceError::Initialization { .. })));
    assert!(!app_state.is_running().await);
}

#[tokio::test]
async fn test_word_lists_from_files() {
    let dir = TempDir::new().unwrap();
    let adjectives = dir.path().join("adjectives.txt");
    let nouns = dir.path().join("nouns.txt");
    std::fs::write(&adjectives, "Sleepy\n").unwrap();
    std::fs::write(&nouns, "Ghost\n").unwrap();

    let mut config = test_config(&dir);
    config.avatar.adjectives_path = Some(adjectives);
    config.avatar.nouns_path = Some(nouns);
    let app_state = AppState::new(config).unwrap();

    // Seed a previous roster directly, then ask for a scramble
    {
        let queue = app_state.registry().get_or_create(1).unwrap();
        let mut state = pug_queue::queue::lock_queue(&queue).unwrap();
        state
            .join(Player::new(10, "a"), Some(pug_queue::types::Team::A), &mut rand::thread_rng())
            .unwrap();
        state
            .join(Player::new(11, "b"), Some(pug_queue::types::Team::B), &mut rand::thread_rng())
            .unwrap();
        state.start_match().unwrap();
        state.reset();
    }

    let reply = app_state
        .router()
        .handle(&CommandInvocation {
            guild_id: 1,
            channel_name: app_state.config().bot.queue_channel_name.clone(),
            player: Player::new(12, "c"),
            text: "!scramble".to_string(),
        })
        .unwrap()
        .unwrap();
    assert!(reply.contains("random shuffle id: sleepy ghost"));
}
