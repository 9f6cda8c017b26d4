//! Common types used throughout the queue service

use serde::{Deserialize, Serialize};

/// Unique identifier for guilds, as reported by the chat platform
pub type GuildId = u64;

/// Unique identifier for players, as reported by the chat platform
pub type PlayerId = u64;

/// A participant supplied by the chat platform.
///
/// Identity is the platform id; name and mention are only used for rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub mention: String,
}

impl Player {
    /// Build a player with the platform's default `<@id>` mention syntax
    pub fn new(id: PlayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            mention: format!("<@{}>", id),
        }
    }
}

impl PartialEq for Player {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Player {}

/// One of the two team buckets of a queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Team {
    A,
    B,
}

impl Team {
    pub fn index(self) -> usize {
        match self {
            Team::A => 0,
            Team::B => 1,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Team::A),
            1 => Some(Team::B),
            _ => None,
        }
    }
}

impl std::fmt::Display for Team {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Team::A => write!(f, "A"),
            Team::B => write!(f, "B"),
        }
    }
}

/// Display names for the two teams, in `Team::index` order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamNames(pub [String; 2]);

impl TeamNames {
    pub fn name(&self, team: Team) -> &str {
        &self.0[team.index()]
    }

    /// Resolve a team from a user-supplied argument: an index or a team name
    pub fn parse(&self, arg: &str) -> Option<Team> {
        if let Ok(index) = arg.parse::<usize>() {
            return Team::from_index(index);
        }
        [Team::A, Team::B]
            .into_iter()
            .find(|team| self.name(*team).eq_ignore_ascii_case(arg))
    }
}

impl Default for TeamNames {
    fn default() -> Self {
        Self(["Jinrai".to_string(), "NSF".to_string()])
    }
}

/// A text channel inside a guild
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelRef {
    pub guild_id: GuildId,
    pub channel_id: u64,
    pub name: String,
}

/// A guild as currently visible to the bot, with its text channels
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildSnapshot {
    pub id: GuildId,
    pub channels: Vec<ChannelRef>,
}
