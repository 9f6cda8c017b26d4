//! Queue management for the PUG service
//!
//! This module holds the per-guild queue state machine, the registry that
//! maps guilds to their queues, and the word lists used by scrambles.

pub mod registry;
pub mod state;
pub mod words;

// Re-export commonly used types
pub use registry::{lock_queue, GuildRegistry, QueueTemplate, SharedQueue};
pub use state::{MatchAnnouncement, QueueState, ScrambleSuggestion, MAX_BADGE_LEVEL};
pub use words::{EmbeddedWordList, WordSource};
