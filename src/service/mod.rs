//! Service layer for the PUG queue bot
//!
//! Application state, component wiring and background task management.

pub mod app;
pub mod health;

pub use app::{AppState, ServiceError};
pub use health::{HealthCheck, HealthStatus};
