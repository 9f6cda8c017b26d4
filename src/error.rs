//! Error types for the PUG queue service
//!
//! Queue-level failures are modelled as a closed taxonomy so command handlers
//! can render each one back to the player who triggered it. Service plumbing
//! uses anyhow for context-rich propagation.

/// Result type alias for convenience
pub type Result<T> = anyhow::Result<T>;

/// Custom error types for specific queue scenarios
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    #[error("Player is already queued: {player_id}")]
    AlreadyQueued { player_id: u64 },

    #[error("Team is full, cannot admit player: {player_id}")]
    QueueFull { player_id: u64 },

    #[error("Player is not queued: {player_id}")]
    NotQueued { player_id: u64 },

    #[error("No previous PUG roster to scramble")]
    NoHistory,

    #[error("Cannot start match, a team was empty")]
    DegenerateStart,

    #[error("Upstream transient failure: {message}")]
    UpstreamTransientFailure { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Internal service error: {message}")]
    Internal { message: String },
}

impl QueueError {
    /// Whether the error is caused by a player's own command and should be
    /// reported back to them rather than logged as a fault.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            QueueError::AlreadyQueued { .. }
                | QueueError::QueueFull { .. }
                | QueueError::NotQueued { .. }
                | QueueError::NoHistory
        )
    }

    pub(crate) fn lock_poisoned(what: &str) -> Self {
        QueueError::Internal {
            message: format!("Failed to acquire {} lock", what),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_facing_classification() {
        assert!(QueueError::AlreadyQueued { player_id: 1 }.is_user_facing());
        assert!(QueueError::NoHistory.is_user_facing());
        assert!(!QueueError::UpstreamTransientFailure {
            message: "429".to_string()
        }
        .is_user_facing());
        assert!(!QueueError::lock_poisoned("registry").is_user_facing());
    }

    #[test]
    fn test_degenerate_start_is_not_user_facing() {
        // Raised by the poll loop only; nobody issued a command to reply to
        assert!(!QueueError::DegenerateStart.is_user_facing());
    }
}
