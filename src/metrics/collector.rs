//! Metrics collection using Prometheus
//!
//! This module provides metrics for the PUG queue service: command traffic,
//! queue activity, match starts and avatar badge updates.

use crate::error::QueueError;
use anyhow::Result;
use prometheus::{
    Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Outcome label for an avatar update attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvatarOutcome {
    Applied,
    Failed,
    TimedOut,
}

impl AvatarOutcome {
    fn as_label(self) -> &'static str {
        match self {
            AvatarOutcome::Applied => "applied",
            AvatarOutcome::Failed => "failed",
            AvatarOutcome::TimedOut => "timed_out",
        }
    }
}

/// Main metrics collector for the queue service
#[derive(Clone)]
pub struct MetricsCollector {
    /// Prometheus registry
    registry: Arc<Registry>,

    /// Service-level metrics
    service_metrics: ServiceMetrics,

    /// Queue-related metrics
    queue_metrics: QueueMetrics,

    /// Avatar badge metrics
    avatar_metrics: AvatarMetrics,
}

/// Service-level metrics
#[derive(Clone)]
pub struct ServiceMetrics {
    /// Service uptime in seconds
    pub uptime_seconds: IntGauge,

    /// Chat commands handled, by command name
    pub commands_total: IntCounterVec,

    /// Health check status (0=unhealthy, 1=degraded, 2=healthy)
    pub health_status: IntGauge,

    /// Component health status
    pub component_health: IntGaugeVec,
}

/// Queue-related metrics
#[derive(Clone)]
pub struct QueueMetrics {
    /// Guilds with a queue
    pub guilds_tracked: IntGauge,

    /// Players currently queued across all guilds
    pub players_queued: IntGauge,

    /// Successful joins
    pub joins_total: IntCounter,

    /// Rejected joins and leaves, by reason
    pub rejections_total: IntCounterVec,

    /// Matches announced
    pub matches_started_total: IntCounter,

    /// Start attempts aborted because a team was empty
    pub degenerate_starts_total: IntCounter,

    /// Poll loop ticks and per-guild failures
    pub poll_ticks_total: IntCounter,
    pub poll_errors_total: IntCounter,

    /// Time spent in a single poll tick
    pub poll_tick_duration: Histogram,
}

/// Avatar badge metrics
#[derive(Clone)]
pub struct AvatarMetrics {
    /// Avatar update attempts by outcome
    pub updates_total: IntCounterVec,

    /// Current badge level (-1 until first applied)
    pub badge_level: IntGauge,

    /// Render + upload duration
    pub upload_duration: Histogram,
}

impl MetricsCollector {
    /// Create a new metrics collector with default registry
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());
        Self::with_registry(registry)
    }

    /// Create a new metrics collector with custom registry
    pub fn with_registry(registry: Arc<Registry>) -> Result<Self> {
        let service_metrics = ServiceMetrics::new(&registry)?;
        let queue_metrics = QueueMetrics::new(&registry)?;
        let avatar_metrics = AvatarMetrics::new(&registry)?;

        Ok(Self {
            registry,
            service_metrics,
            queue_metrics,
            avatar_metrics,
        })
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    pub fn service(&self) -> &ServiceMetrics {
        &self.service_metrics
    }

    pub fn queue(&self) -> &QueueMetrics {
        &self.queue_metrics
    }

    pub fn avatar(&self) -> &AvatarMetrics {
        &self.avatar_metrics
    }

    /// Record a chat command being handled
    pub fn record_command(&self, command: &str) {
        self.service_metrics
            .commands_total
            .with_label_values(&[command])
            .inc();
    }

    pub fn record_join(&self) {
        self.queue_metrics.joins_total.inc();
    }

    /// Record a queue operation rejected with a user-facing error
    pub fn record_rejection(&self, error: &QueueError) {
        let reason = match error {
            QueueError::AlreadyQueued { .. } => "already_queued",
            QueueError::QueueFull { .. } => "queue_full",
            QueueError::NotQueued { .. } => "not_queued",
            QueueError::NoHistory => "no_history",
            QueueError::DegenerateStart => "degenerate_start",
            _ => "other",
        };
        self.queue_metrics
            .rejections_total
            .with_label_values(&[reason])
            .inc();
    }

    pub fn record_match_started(&self) {
        self.queue_metrics.matches_started_total.inc();
    }

    pub fn record_degenerate_start(&self) {
        self.queue_metrics.degenerate_starts_total.inc();
    }

    /// Record a completed poll tick
    pub fn record_poll_tick(&self, duration: Duration, errors: usize) {
        self.queue_metrics.poll_ticks_total.inc();
        self.queue_metrics.poll_errors_total.inc_by(errors as u64);
        self.queue_metrics
            .poll_tick_duration
            .observe(duration.as_secs_f64());
    }

    /// Update queue gauges from a registry snapshot
    pub fn update_queue_gauges(&self, guilds: usize, players: usize) {
        self.queue_metrics.guilds_tracked.set(guilds as i64);
        self.queue_metrics.players_queued.set(players as i64);
    }

    /// Record an avatar update attempt
    pub fn record_avatar_update(&self, outcome: AvatarOutcome, level: u8, duration: Duration) {
        self.avatar_metrics
            .updates_total
            .with_label_values(&[outcome.as_label()])
            .inc();
        self.avatar_metrics
            .upload_duration
            .observe(duration.as_secs_f64());
        if outcome == AvatarOutcome::Applied {
            self.avatar_metrics.badge_level.set(i64::from(level));
        }
    }

    /// Update health status
    pub fn update_health_status(&self, status: u8) {
        self.service_metrics.health_status.set(status as i64);
    }

    /// Update component health
    pub fn update_component_health(&self, component: &str, healthy: bool) {
        let status = if healthy { 1 } else { 0 };
        self.service_metrics
            .component_health
            .with_label_values(&[component])
            .set(status);
    }

    pub fn set_uptime(&self, uptime: Duration) {
        self.service_metrics
            .uptime_seconds
            .set(uptime.as_secs() as i64);
    }

    /// Create a timer for measuring operation duration
    pub fn start_timer(&self) -> MetricsTimer {
        MetricsTimer::new()
    }
}

/// Timer for measuring operation durations
pub struct MetricsTimer {
    start: Instant,
}

impl MetricsTimer {
    fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get the elapsed duration
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Stop the timer and return the duration
    pub fn stop(self) -> Duration {
        self.elapsed()
    }
}

impl ServiceMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let uptime_seconds = IntGauge::new("pug_queue_uptime_seconds", "Service uptime in seconds")?;
        registry.register(Box::new(uptime_seconds.clone()))?;

        let commands_total = IntCounterVec::new(
            Opts::new("pug_queue_commands_total", "Total chat commands handled"),
            &["command"],
        )?;
        registry.register(Box::new(commands_total.clone()))?;

        let health_status = IntGauge::new(
            "pug_queue_health_status",
            "Health status (0=unhealthy, 1=degraded, 2=healthy)",
        )?;
        registry.register(Box::new(health_status.clone()))?;

        let component_health = IntGaugeVec::new(
            Opts::new("pug_queue_component_health", "Component health status"),
            &["component"],
        )?;
        registry.register(Box::new(component_health.clone()))?;

        Ok(Self {
            uptime_seconds,
            commands_total,
            health_status,
            component_health,
        })
    }
}

impl QueueMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let guilds_tracked = IntGauge::new("pug_queue_guilds_tracked", "Guilds with a PUG queue")?;
        registry.register(Box::new(guilds_tracked.clone()))?;

        let players_queued =
            IntGauge::new("pug_queue_players_queued", "Players currently queued")?;
        registry.register(Box::new(players_queued.clone()))?;

        let joins_total = IntCounter::new("pug_queue_joins_total", "Total successful joins")?;
        registry.register(Box::new(joins_total.clone()))?;

        let rejections_total = IntCounterVec::new(
            Opts::new(
                "pug_queue_rejections_total",
                "Queue operations rejected, by reason",
            ),
            &["reason"],
        )?;
        registry.register(Box::new(rejections_total.clone()))?;

        let matches_started_total =
            IntCounter::new("pug_queue_matches_started_total", "Total matches announced")?;
        registry.register(Box::new(matches_started_total.clone()))?;

        let degenerate_starts_total = IntCounter::new(
            "pug_queue_degenerate_starts_total",
            "Match starts aborted because a team was empty",
        )?;
        registry.register(Box::new(degenerate_starts_total.clone()))?;

        let poll_ticks_total = IntCounter::new("pug_queue_poll_ticks_total", "Total poll ticks")?;
        registry.register(Box::new(poll_ticks_total.clone()))?;

        let poll_errors_total = IntCounter::new(
            "pug_queue_poll_errors_total",
            "Per-guild failures during poll ticks",
        )?;
        registry.register(Box::new(poll_errors_total.clone()))?;

        let poll_tick_duration = Histogram::with_opts(
            HistogramOpts::new(
                "pug_queue_poll_tick_duration_seconds",
                "Time spent processing one poll tick",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 15.0]),
        )?;
        registry.register(Box::new(poll_tick_duration.clone()))?;

        Ok(Self {
            guilds_tracked,
            players_queued,
            joins_total,
            rejections_total,
            matches_started_total,
            degenerate_starts_total,
            poll_ticks_total,
            poll_errors_total,
            poll_tick_duration,
        })
    }
}

impl AvatarMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let updates_total = IntCounterVec::new(
            Opts::new(
                "pug_queue_avatar_updates_total",
                "Avatar update attempts by outcome",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(updates_total.clone()))?;

        let badge_level = IntGauge::new("pug_queue_avatar_badge_level", "Last applied badge level")?;
        badge_level.set(-1);
        registry.register(Box::new(badge_level.clone()))?;

        let upload_duration = Histogram::with_opts(
            HistogramOpts::new(
                "pug_queue_avatar_upload_duration_seconds",
                "Time spent rendering and uploading the avatar",
            )
            .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        )?;
        registry.register(Box::new(upload_duration.clone()))?;

        Ok(Self {
            updates_total,
            badge_level,
            upload_duration,
        })
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new().expect("Failed to create default metrics collector")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_collector_creation() {
        let collector = MetricsCollector::new().expect("Failed to create metrics collector");

        let _service = collector.service();
        let _queue = collector.queue();
        let _avatar = collector.avatar();
        assert_eq!(collector.avatar().badge_level.get(), -1);
    }

    #[test]
    fn test_queue_recording() {
        let collector = MetricsCollector::new().expect("Failed to create metrics collector");

        collector.record_command("pug");
        collector.record_join();
        collector.record_rejection(&QueueError::QueueFull { player_id: 1 });
        collector.record_rejection(&QueueError::QueueFull { player_id: 2 });
        collector.record_match_started();
        collector.update_queue_gauges(2, 7);

        assert_eq!(collector.queue().joins_total.get(), 1);
        assert_eq!(
            collector
                .queue()
                .rejections_total
                .with_label_values(&["queue_full"])
                .get(),
            2
        );
        assert_eq!(collector.queue().matches_started_total.get(), 1);
        assert_eq!(collector.queue().players_queued.get(), 7);
    }

    #[test]
    fn test_avatar_recording() {
        let collector = MetricsCollector::new().expect("Failed to create metrics collector");

        collector.record_avatar_update(AvatarOutcome::Failed, 3, Duration::from_millis(20));
        assert_eq!(collector.avatar().badge_level.get(), -1);

        collector.record_avatar_update(AvatarOutcome::Applied, 4, Duration::from_millis(20));
        assert_eq!(collector.avatar().badge_level.get(), 4);
        assert_eq!(
            collector
                .avatar()
                .updates_total
                .with_label_values(&["failed"])
                .get(),
            1
        );
    }

    #[test]
    fn test_metrics_timer() {
        let collector = MetricsCollector::new().expect("Failed to create metrics collector");
        let timer = collector.start_timer();

        std::thread::sleep(Duration::from_millis(10));
        let duration = timer.elapsed();

        assert!(duration >= Duration::from_millis(10));

        let final_duration = timer.stop();
        assert!(final_duration >= Duration::from_millis(10));
    }
}
