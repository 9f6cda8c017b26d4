//! Main application configuration
//!
//! This module defines the configuration structures for the PUG queue
//! service: loading from a TOML file or the environment, and validation.
//! The resulting `AppConfig` is built once at startup and handed to every
//! component by value or reference.

use crate::types::TeamNames;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main application configuration
///
/// `bot`, `queue` and `avatar` must be present in a config file; `service`
/// falls back to its defaults. Unknown keys are rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[serde(default)]
    pub service: ServiceSettings,
    pub bot: BotSettings,
    pub queue: QueueSettings,
    pub avatar: AvatarSettings,
}

/// Service-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceSettings {
    /// Service name for logging and metrics
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Port for health check and metrics endpoints
    pub health_port: u16,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,
}

/// Chat platform settings
#[derive(Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BotSettings {
    /// Bot secret token, usually supplied through `DISCORD_BOT_TOKEN`
    #[serde(default)]
    pub token: String,
    /// Prefix for chat commands
    pub command_prefix: String,
    /// Name of the channel in which queue commands are accepted
    pub queue_channel_name: String,
}

impl std::fmt::Debug for BotSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotSettings")
            .field("token", &"<redacted>")
            .field("command_prefix", &self.command_prefix)
            .field("queue_channel_name", &self.queue_channel_name)
            .finish()
    }
}

/// Queue rules
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QueueSettings {
    /// Players needed to start a match, split evenly across two teams
    pub players_required_total: usize,
    /// Allow a player to occupy more than one queue slot (debugging aid)
    pub allow_requeue: bool,
    /// Interval between queue polls in seconds
    pub polling_interval_seconds: u64,
    /// Display names of the two teams
    #[serde(default)]
    pub team_names: TeamNames,
}

/// Avatar badge settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AvatarSettings {
    /// Minimum seconds between avatar changes
    pub rate_limit_seconds: u64,
    /// Upper bound on a single avatar upload
    #[serde(default = "default_upload_timeout_seconds")]
    pub upload_timeout_seconds: u64,
    /// Where to fetch the base avatar if it is not on disk yet
    #[serde(default)]
    pub download_url: String,
    /// Local path of the base avatar image
    #[serde(default = "default_base_image_path")]
    pub base_image_path: PathBuf,
    /// Optional newline-separated adjective list for scramble ids
    #[serde(default)]
    pub adjectives_path: Option<PathBuf>,
    /// Optional newline-separated noun list for scramble ids
    #[serde(default)]
    pub nouns_path: Option<PathBuf>,
}

fn default_upload_timeout_seconds() -> u64 {
    10
}

fn default_base_image_path() -> PathBuf {
    PathBuf::from("static/avatars/default.png")
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "pug-queue".to_string(),
            log_level: "info".to_string(),
            health_port: 8080,
            shutdown_timeout_seconds: 30,
        }
    }
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            token: String::new(),
            command_prefix: "!".to_string(),
            queue_channel_name: "pugs".to_string(),
        }
    }
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            players_required_total: 10,
            allow_requeue: false,
            polling_interval_seconds: 5,
            team_names: TeamNames::default(),
        }
    }
}

impl Default for AvatarSettings {
    fn default() -> Self {
        Self {
            rate_limit_seconds: 300,
            upload_timeout_seconds: default_upload_timeout_seconds(),
            download_url: String::new(),
            base_image_path: default_base_image_path(),
            adjectives_path: None,
            nouns_path: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file, then apply environment overrides
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config: AppConfig = toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        config.apply_env_overrides()?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        validate_config(&config)?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        // Service settings
        if let Ok(name) = env::var("SERVICE_NAME") {
            self.service.name = name;
        }
        if let Ok(log_level) = env::var("LOG_LEVEL") {
            self.service.log_level = log_level;
        }
        if let Ok(port) = env::var("HEALTH_PORT") {
            self.service.health_port = port
                .parse()
                .map_err(|_| anyhow!("Invalid HEALTH_PORT value: {}", port))?;
        }

        // Bot settings
        if let Ok(token) = env::var("DISCORD_BOT_TOKEN") {
            self.bot.token = token;
        }
        if let Ok(prefix) = env::var("COMMAND_PREFIX") {
            self.bot.command_prefix = prefix;
        }
        if let Ok(channel) = env::var("PUG_CHANNEL_NAME") {
            self.bot.queue_channel_name = channel;
        }

        // Queue settings
        if let Ok(players) = env::var("NUM_PLAYERS_REQUIRED_TOTAL") {
            self.queue.players_required_total = players
                .parse()
                .map_err(|_| anyhow!("Invalid NUM_PLAYERS_REQUIRED_TOTAL value: {}", players))?;
        }
        if let Ok(requeue) = env::var("ALLOW_REQUEUE") {
            self.queue.allow_requeue = requeue
                .parse()
                .map_err(|_| anyhow!("Invalid ALLOW_REQUEUE value: {}", requeue))?;
        }
        if let Ok(interval) = env::var("QUEUE_POLLING_INTERVAL_SECS") {
            self.queue.polling_interval_seconds = interval
                .parse()
                .map_err(|_| anyhow!("Invalid QUEUE_POLLING_INTERVAL_SECS value: {}", interval))?;
        }

        // Avatar settings
        if let Ok(rate_limit) = env::var("AVATAR_RATE_LIMIT_SECS") {
            self.avatar.rate_limit_seconds = rate_limit
                .parse()
                .map_err(|_| anyhow!("Invalid AVATAR_RATE_LIMIT_SECS value: {}", rate_limit))?;
        }
        if let Ok(url) = env::var("AVATAR_DOWNLOAD_URL") {
            self.avatar.download_url = url;
        }

        Ok(())
    }

    /// Get polling interval as Duration
    pub fn polling_interval(&self) -> Duration {
        Duration::from_secs(self.queue.polling_interval_seconds)
    }

    /// Get avatar rate limit as Duration
    pub fn avatar_rate_limit(&self) -> Duration {
        Duration::from_secs(self.avatar.rate_limit_seconds)
    }

    /// Get avatar upload timeout as Duration
    pub fn avatar_upload_timeout(&self) -> Duration {
        Duration::from_secs(self.avatar.upload_timeout_seconds)
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.service.shutdown_timeout_seconds)
    }
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    // Validate log level
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow!("Invalid log level: {}", config.service.log_level)),
    }

    if config.service.health_port == 0 {
        return Err(anyhow!("Health port cannot be 0"));
    }
    if config.service.shutdown_timeout_seconds == 0 {
        return Err(anyhow!("Shutdown timeout must be greater than 0"));
    }

    // Validate bot settings
    if config.bot.command_prefix.is_empty() {
        return Err(anyhow!("Command prefix cannot be empty"));
    }
    if config.bot.queue_channel_name.is_empty() {
        return Err(anyhow!("Queue channel name cannot be empty"));
    }

    // Validate queue settings
    if config.queue.players_required_total == 0 {
        return Err(anyhow!("Players required must be greater than 0"));
    }
    if config.queue.players_required_total % 2 != 0 {
        return Err(anyhow!(
            "Players required must be even, got {}",
            config.queue.players_required_total
        ));
    }
    if config.queue.polling_interval_seconds == 0 {
        return Err(anyhow!("Polling interval must be greater than 0"));
    }
    if config
        .queue
        .team_names
        .0
        .iter()
        .any(|name| name.trim().is_empty())
    {
        return Err(anyhow!("Team names cannot be empty"));
    }

    // Validate avatar settings
    if config.avatar.rate_limit_seconds == 0 {
        return Err(anyhow!("Avatar rate limit must be greater than 0"));
    }
    if config.avatar.upload_timeout_seconds == 0 {
        return Err(anyhow!("Avatar upload timeout must be greater than 0"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(validate_config(&config).is_ok());
        assert_eq!(config.polling_interval(), Duration::from_secs(5));
        assert_eq!(config.avatar_rate_limit(), Duration::from_secs(300));
    }

    #[test]
    fn test_odd_player_count_rejected() {
        let mut config = AppConfig::default();
        config.queue.players_required_total = 5;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("even"));
    }

    #[test]
    fn test_zero_values_rejected() {
        let mut config = AppConfig::default();
        config.queue.players_required_total = 0;
        assert!(validate_config(&config).is_err());

        let mut config = AppConfig::default();
        config.queue.polling_interval_seconds = 0;
        assert!(validate_config(&config).is_err());

        let mut config = AppConfig::default();
        config.avatar.rate_limit_seconds = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_empty_channel_name_rejected() {
        let mut config = AppConfig::default();
        config.bot.queue_channel_name = String::new();
        assert!(validate_config(&config).is_err());
    }

    const MINIMAL_TOML: &str = r#"
        [bot]
        command_prefix = "."
        queue_channel_name = "neotokyo-pugs"

        [queue]
        players_required_total = 4
        allow_requeue = false
        polling_interval_seconds = 3

        [avatar]
        rate_limit_seconds = 120
    "#;

    #[test]
    fn test_minimal_toml_fills_optional_fields() {
        let config: AppConfig = toml::from_str(MINIMAL_TOML).unwrap();
        assert_eq!(config.bot.command_prefix, ".");
        assert_eq!(config.queue.players_required_total, 4);
        assert_eq!(config.queue.polling_interval_seconds, 3);
        assert_eq!(config.queue.team_names, TeamNames::default());
        assert_eq!(config.avatar.rate_limit_seconds, 120);
        assert_eq!(config.avatar.upload_timeout_seconds, 10);
        assert!(config.avatar.adjectives_path.is_none());
        assert_eq!(config.service.name, "pug-queue");
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_team_names_from_toml() {
        let raw = MINIMAL_TOML.replace(
            "polling_interval_seconds = 3",
            "polling_interval_seconds = 3\nteam_names = [\"Red\", \"Blue\"]",
        );
        let config: AppConfig = toml::from_str(&raw).unwrap();
        assert_eq!(config.queue.team_names.0[1], "Blue");
    }

    #[test]
    fn test_from_file_requires_player_count() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let raw = MINIMAL_TOML.replace("players_required_total = 4", "");
        std::fs::write(&path, raw).unwrap();

        let err = AppConfig::from_file(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("players_required_total"));
    }

    #[test]
    fn test_missing_section_rejected() {
        let raw = MINIMAL_TOML.replace("[avatar]\n        rate_limit_seconds = 120", "");
        assert!(toml::from_str::<AppConfig>(&raw).is_err());
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let err = toml::from_str::<AppConfig>("[bot]\ncommand_prefx = \"!\"\n").unwrap_err();
        assert!(err.to_string().contains("command_prefx"));

        let raw = MINIMAL_TOML.replace(
            "allow_requeue = false",
            "allow_requeue = false\nalow_requeue = true",
        );
        assert!(toml::from_str::<AppConfig>(&raw).is_err());
    }

    #[test]
    fn test_from_file_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[queue]\nplayers_required_total = \"ten\"\n").unwrap();
        let err = AppConfig::from_file(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_debug_redacts_token() {
        let mut config = AppConfig::default();
        config.bot.token = "super-secret".to_string();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("super-secret"));
    }
}
