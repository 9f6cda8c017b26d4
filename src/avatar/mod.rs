//! Avatar badge showing the queue size
//!
//! The badge is a process-wide resource, so updates are rate limited and
//! serialised. Rendering and uploading are collaborators behind traits.

pub mod badge;
pub mod source;
pub mod throttler;

pub use badge::{BadgeRenderer, PngBadgeRenderer};
pub use source::ensure_base_avatar;
pub use throttler::{AvatarDecision, AvatarThrottler, AvatarUploader, SkipReason};
