//! Main entry point for the PUG queue bot
//!
//! Loads configuration, initializes logging, connects to Discord and runs
//! until SIGINT or SIGTERM, then shuts down gracefully.

use anyhow::Result;
use clap::Parser;
use pug_queue::config::{validate_config, AppConfig};
use pug_queue::service::AppState;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

/// PUG queue - Discord pick-up game matchmaking bot
#[derive(Parser)]
#[command(
    name = "pug-queue",
    version,
    about = "Discord bot that queues players for pick-up games",
    long_about = "Players join one of two teams with chat commands in a dedicated channel. \
                 When the queue fills, the bot announces the match and resets the queue. \
                 The bot's avatar shows how many players are waiting."
)]
struct Args {
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Path to configuration file (TOML format)"
    )]
    config: Option<PathBuf>,

    #[arg(
        short,
        long,
        value_name = "LEVEL",
        help = "Override log level (trace, debug, info, warn, error)"
    )]
    log_level: Option<String>,

    #[arg(long, value_name = "TOKEN", help = "Override Discord bot token")]
    token: Option<String>,

    #[arg(long, value_name = "PORT", help = "Override health/metrics server port")]
    health_port: Option<u16>,

    #[arg(short, long, help = "Enable debug mode with verbose logging")]
    debug: bool,

    #[arg(
        long,
        help = "Validate configuration and exit without connecting to Discord"
    )]
    dry_run: bool,
}

/// Initialize structured logging with the configured level
fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

/// Wait for shutdown signals (SIGINT, SIGTERM)
async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C) signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}

fn display_startup_banner(config: &AppConfig) {
    info!("PUG queue bot v{}", pug_queue::VERSION);
    info!("   Service: {}", config.service.name);
    info!("   Log level: {}", config.service.log_level);
    info!("   Health port: {}", config.service.health_port);
    info!("   Bot: {:?}", config.bot);
    info!(
        "   Queue: {} players, requeue {}, poll every {}s",
        config.queue.players_required_total,
        if config.queue.allow_requeue {
            "allowed"
        } else {
            "disallowed"
        },
        config.queue.polling_interval_seconds
    );
    info!(
        "   Teams: {} vs {}",
        config.queue.team_names.0[0], config.queue.team_names.0[1]
    );
    info!(
        "   Avatar: every {}s at most, base image {}",
        config.avatar.rate_limit_seconds,
        config.avatar.base_image_path.display()
    );
}

/// Load configuration, then apply CLI overrides and re-validate
fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = if let Some(config_path) = &args.config {
        AppConfig::from_file(config_path)?
    } else {
        AppConfig::from_env()?
    };

    if let Some(log_level) = &args.log_level {
        config.service.log_level = log_level.clone();
    }

    if args.debug {
        config.service.log_level = "debug".to_string();
    }

    if let Some(token) = &args.token {
        config.bot.token = token.clone();
    }

    if let Some(health_port) = args.health_port {
        config.service.health_port = health_port;
    }

    validate_config(&config)?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config(&args).unwrap_or_else(|e| {
        eprintln!("Configuration error: {:#}", e);
        std::process::exit(1);
    });

    if let Err(e) = init_logging(&config.service.log_level) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    display_startup_banner(&config);

    if args.dry_run {
        info!("Dry run completed - configuration is valid");
        return Ok(());
    }

    if config.bot.token.is_empty() {
        error!("No Discord token configured (set DISCORD_BOT_TOKEN or bot.token)");
        std::process::exit(1);
    }

    let app_state = match AppState::new(config) {
        Ok(state) => Arc::new(state),
        Err(e) => {
            error!("Failed to initialize application: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = app_state.start().await {
        error!("Failed to start service: {}", e);
        app_state.shutdown().await;
        std::process::exit(1);
    }

    info!("PUG queue bot is running, press Ctrl+C to stop");
    wait_for_shutdown_signal().await;

    info!("Shutdown signal received, beginning graceful shutdown");
    app_state.shutdown().await;

    info!("PUG queue bot stopped");
    Ok(())
}
