//! Metrics and monitoring for the PUG queue service
//!
//! Prometheus collectors plus the HTTP server exposing them alongside the
//! health probes.

pub mod collector;
pub mod health;

pub use collector::{
    AvatarMetrics, AvatarOutcome, MetricsCollector, MetricsTimer, QueueMetrics, ServiceMetrics,
};
pub use health::{HealthServer, HealthServerConfig};
