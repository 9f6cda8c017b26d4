//! Guild registry: one lazily created queue per guild
//!
//! Each queue sits behind its own mutex so command handlers and the poll
//! loop serialise per guild while different guilds proceed in parallel.

use crate::error::QueueError;
use crate::queue::state::QueueState;
use crate::types::GuildId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::time::Duration;
use tracing::{debug, info};

/// A guild's queue, shared between command handlers and the poll loop
pub type SharedQueue = Arc<Mutex<QueueState>>;

/// Lock a shared queue, mapping poisoning to an internal error
pub fn lock_queue(queue: &SharedQueue) -> Result<MutexGuard<'_, QueueState>, QueueError> {
    queue.lock().map_err(|_| QueueError::lock_poisoned("queue"))
}

/// Parameters every newly created queue is built with
#[derive(Debug, Clone)]
pub struct QueueTemplate {
    pub players_required_total: usize,
    pub allow_requeue: bool,
    pub avatar_rate_limit: Duration,
}

/// Map from guild id to that guild's queue. Entries are never removed.
pub struct GuildRegistry {
    guilds: RwLock<HashMap<GuildId, SharedQueue>>,
    template: QueueTemplate,
}

impl GuildRegistry {
    /// Create an empty registry; fails if the template cannot build a queue
    pub fn new(template: QueueTemplate) -> Result<Self, QueueError> {
        // Surface an invalid player count at startup rather than on first use
        QueueState::new(
            template.players_required_total,
            template.allow_requeue,
            template.avatar_rate_limit,
        )?;

        Ok(Self {
            guilds: RwLock::new(HashMap::new()),
            template,
        })
    }

    /// Return the guild's queue, creating it on first use
    pub fn get_or_create(&self, guild_id: GuildId) -> Result<SharedQueue, QueueError> {
        if let Some(queue) = self.get(guild_id)? {
            return Ok(queue);
        }

        let mut guilds = self
            .guilds
            .write()
            .map_err(|_| QueueError::lock_poisoned("registry"))?;

        // Another caller may have inserted between the read and write locks
        if let Some(queue) = guilds.get(&guild_id) {
            debug!("Queue for guild {} created concurrently", guild_id);
            return Ok(queue.clone());
        }

        let queue = Arc::new(Mutex::new(QueueState::new(
            self.template.players_required_total,
            self.template.allow_requeue,
            self.template.avatar_rate_limit,
        )?));
        guilds.insert(guild_id, queue.clone());

        info!(
            "Created PUG queue for guild {} ({} players required, {} guilds tracked)",
            guild_id,
            self.template.players_required_total,
            guilds.len()
        );
        Ok(queue)
    }

    /// Return the guild's queue if one exists
    pub fn get(&self, guild_id: GuildId) -> Result<Option<SharedQueue>, QueueError> {
        let guilds = self
            .guilds
            .read()
            .map_err(|_| QueueError::lock_poisoned("registry"))?;
        Ok(guilds.get(&guild_id).cloned())
    }

    /// Number of guilds with a queue
    pub fn len(&self) -> Result<usize, QueueError> {
        let guilds = self
            .guilds
            .read()
            .map_err(|_| QueueError::lock_poisoned("registry"))?;
        Ok(guilds.len())
    }

    pub fn is_empty(&self) -> Result<bool, QueueError> {
        Ok(self.len()? == 0)
    }

    pub fn guild_ids(&self) -> Result<Vec<GuildId>, QueueError> {
        let guilds = self
            .guilds
            .read()
            .map_err(|_| QueueError::lock_poisoned("registry"))?;
        Ok(guilds.keys().copied().collect())
    }

    /// Players queued across every guild
    pub fn total_queued(&self) -> Result<usize, QueueError> {
        let queues: Vec<SharedQueue> = {
            let guilds = self
                .guilds
                .read()
                .map_err(|_| QueueError::lock_poisoned("registry"))?;
            guilds.values().cloned().collect()
        };

        let mut total = 0;
        for queue in &queues {
            total += lock_queue(queue)?.num_queued();
        }
        Ok(total)
    }
}
