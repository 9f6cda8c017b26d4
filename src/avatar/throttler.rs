//! Rate-limited avatar badge updates
//!
//! The throttler decides whether the bot avatar should show a new queue
//! count, then drives the render and upload collaborators. The whole
//! decide-render-upload step runs under one process-wide lock because the
//! avatar is a single shared resource.

use crate::avatar::badge::BadgeRenderer;
use crate::error::QueueError;
use crate::metrics::{AvatarOutcome, MetricsCollector};
use crate::queue::{lock_queue, QueueState, SharedQueue};
use crate::utils::current_timestamp;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Pushes a rendered avatar image to the chat platform
#[async_trait]
pub trait AvatarUploader: Send + Sync {
    async fn upload(&self, image: Vec<u8>) -> Result<(), QueueError>;
}

/// Why an update was not attempted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The rate-limit interval since the last change has not elapsed
    RateLimited,
    /// The badge already shows this value
    Unchanged,
}

/// Result of a throttling check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvatarDecision {
    Skip(SkipReason),
    Apply(u8),
}

pub struct AvatarThrottler {
    rate_limit: chrono::Duration,
    upload_timeout: Duration,
    renderer: Arc<dyn BadgeRenderer>,
    uploader: Arc<dyn AvatarUploader>,
    metrics: Arc<MetricsCollector>,
    /// Serialises decide + upload across the whole process
    gate: Mutex<()>,
}

impl AvatarThrottler {
    pub fn new(
        rate_limit: Duration,
        upload_timeout: Duration,
        renderer: Arc<dyn BadgeRenderer>,
        uploader: Arc<dyn AvatarUploader>,
        metrics: Arc<MetricsCollector>,
    ) -> Result<Self, QueueError> {
        let rate_limit = chrono::Duration::from_std(rate_limit).map_err(|e| {
            QueueError::Configuration {
                message: format!("avatar rate limit out of range: {}", e),
            }
        })?;

        Ok(Self {
            rate_limit,
            upload_timeout,
            renderer,
            uploader,
            metrics,
            gate: Mutex::new(()),
        })
    }

    /// Decide whether the badge should change, without side effects
    pub fn decide(&self, state: &QueueState, now: DateTime<Utc>) -> AvatarDecision {
        if now - state.last_changed_at() < self.rate_limit {
            return AvatarDecision::Skip(SkipReason::RateLimited);
        }

        let level = state.badge_level();
        if i32::from(level) == state.last_avatar_level() {
            return AvatarDecision::Skip(SkipReason::Unchanged);
        }

        AvatarDecision::Apply(level)
    }

    /// Run one throttled update for the given queue.
    ///
    /// Upstream failures never surface from here; only lock poisoning does.
    pub async fn update(&self, queue: &SharedQueue) -> Result<AvatarDecision, QueueError> {
        let _gate = self.gate.lock().await;

        let decision = {
            let state = lock_queue(queue)?;
            self.decide(&state, current_timestamp())
        };

        let level = match decision {
            AvatarDecision::Skip(reason) => {
                debug!("Skipping avatar update: {:?}", reason);
                return Ok(decision);
            }
            AvatarDecision::Apply(level) => level,
        };

        let timer = self.metrics.start_timer();
        let (result, failure) =
            match tokio::time::timeout(self.upload_timeout, self.apply(level)).await {
                Ok(result) => (result, AvatarOutcome::Failed),
                Err(_) => (
                    Err(QueueError::UpstreamTransientFailure {
                        message: format!("avatar upload timed out after {:?}", self.upload_timeout),
                    }),
                    AvatarOutcome::TimedOut,
                ),
            };
        let elapsed = timer.stop();

        let applied = match result {
            Ok(()) => {
                info!("Avatar badge updated to {}", level);
                self.metrics
                    .record_avatar_update(AvatarOutcome::Applied, level, elapsed);
                Some(level)
            }
            Err(error) => {
                self.metrics.record_avatar_update(failure, level, elapsed);
                absorb_upstream_failure(error);
                None
            }
        };

        // Refresh the change timestamp even on failure so a platform-side
        // rate limiter is not hit with rapid retries.
        lock_queue(queue)?.record_avatar_attempt(applied, current_timestamp());

        Ok(decision)
    }

    async fn apply(&self, level: u8) -> Result<(), QueueError> {
        let renderer = self.renderer.clone();
        let image = tokio::task::spawn_blocking(move || renderer.render(level))
            .await
            .map_err(|e| QueueError::Internal {
                message: format!("badge render task failed: {}", e),
            })??;

        self.uploader.upload(image).await
    }
}

/// Upload failures from the background loop are logged and dropped; the
/// next state change that clears the rate limit retries naturally.
fn absorb_upstream_failure(error: QueueError) {
    warn!("Avatar update failed, will retry after next change: {}", error);
}
