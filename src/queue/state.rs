//! Per-guild queue state and its transitions
//!
//! A `QueueState` holds the two team buckets of one guild, the roster of the
//! last started match and the bookkeeping the avatar badge needs. It performs
//! no I/O; randomness is injected by the caller.

use crate::error::QueueError;
use crate::queue::words::WordSource;
use crate::types::{Player, Team, TeamNames};
use crate::utils::{comma_list, current_timestamp};
use chrono::{DateTime, Duration, Utc};
use rand::seq::SliceRandom;
use rand::Rng;

/// Largest value the avatar badge displays
pub const MAX_BADGE_LEVEL: u8 = 10;

/// Sentinel for "no badge has been applied yet"
pub const AVATAR_NEVER_APPLIED: i32 = -1;

/// Rosters of a match that is starting, in join order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchAnnouncement {
    pub team_a: Vec<Player>,
    pub team_b: Vec<Player>,
}

impl MatchAnnouncement {
    /// Render the chat announcement, mentioning every player
    pub fn render(&self, team_names: &TeamNames, command_prefix: &str) -> String {
        format!(
            "**PUG is now ready!**\n_{} players:_\n{}\n_{} players:_\n{}\n\n\
             Teams unbalanced? Use **{}scramble** to suggest new random teams.",
            team_names.name(Team::A),
            comma_list(self.team_a.iter().map(|p| p.mention.as_str())),
            team_names.name(Team::B),
            comma_list(self.team_b.iter().map(|p| p.mention.as_str())),
            command_prefix,
        )
    }
}

/// A reshuffled split of the previous roster
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrambleSuggestion {
    /// Human-readable id so players can refer to a shuffle in voice chat
    pub shuffle_id: String,
    pub team_a: Vec<Player>,
    pub team_b: Vec<Player>,
}

impl ScrambleSuggestion {
    pub fn render(&self, requested_by: &str, team_names: &TeamNames, command_prefix: &str) -> String {
        format!(
            "{} suggests scrambled teams:\n_(random shuffle id: {})_\n\
             _{} players:_\n{}\n_{} players:_\n{}\n\n\
             Teams still unbalanced? Use **{}scramble** to suggest new random teams.",
            requested_by,
            self.shuffle_id,
            team_names.name(Team::A),
            comma_list(self.team_a.iter().map(|p| p.name.as_str())),
            team_names.name(Team::B),
            comma_list(self.team_b.iter().map(|p| p.name.as_str())),
            command_prefix,
        )
    }
}

/// Matchmaking state of a single guild
#[derive(Debug, Clone)]
pub struct QueueState {
    team_a: Vec<Player>,
    team_b: Vec<Player>,
    previous_roster: Vec<Player>,
    players_required_total: usize,
    players_per_team: usize,
    allow_requeue: bool,
    last_changed_at: DateTime<Utc>,
    last_avatar_level: i32,
}

impl QueueState {
    /// Create an empty queue.
    ///
    /// `last_changed_at` is backdated by `avatar_rate_limit` so the first
    /// poll is already allowed to apply a badge.
    pub fn new(
        players_required_total: usize,
        allow_requeue: bool,
        avatar_rate_limit: std::time::Duration,
    ) -> Result<Self, QueueError> {
        if players_required_total == 0 || players_required_total % 2 != 0 {
            return Err(QueueError::Configuration {
                message: format!(
                    "players required must be a positive even number, got {}",
                    players_required_total
                ),
            });
        }
        let backdate = Duration::from_std(avatar_rate_limit).map_err(|e| QueueError::Configuration {
            message: format!("avatar rate limit out of range: {}", e),
        })?;

        Ok(Self {
            team_a: Vec::new(),
            team_b: Vec::new(),
            previous_roster: Vec::new(),
            players_required_total,
            players_per_team: players_required_total / 2,
            allow_requeue,
            last_changed_at: current_timestamp() - backdate,
            last_avatar_level: AVATAR_NEVER_APPLIED,
        })
    }

    /// Add a player to the requested team, or to a random one.
    ///
    /// A full target team rejects the player even when the other team still
    /// has room.
    pub fn join<R: Rng + ?Sized>(
        &mut self,
        player: Player,
        team: Option<Team>,
        rng: &mut R,
    ) -> Result<Team, QueueError> {
        if !self.allow_requeue && self.contains(&player) {
            return Err(QueueError::AlreadyQueued {
                player_id: player.id,
            });
        }

        let team = team.unwrap_or_else(|| if rng.gen_bool(0.5) { Team::A } else { Team::B });
        let players_per_team = self.players_per_team;
        let bucket = self.team_mut(team);
        if bucket.len() >= players_per_team {
            return Err(QueueError::QueueFull {
                player_id: player.id,
            });
        }

        bucket.push(player);
        self.touch();
        Ok(team)
    }

    /// Remove a player from whichever team holds them
    pub fn leave(&mut self, player: &Player) -> Result<(), QueueError> {
        if !self.contains(player) {
            return Err(QueueError::NotQueued {
                player_id: player.id,
            });
        }

        self.team_a.retain(|p| p != player);
        self.team_b.retain(|p| p != player);
        self.touch();
        Ok(())
    }

    pub fn contains(&self, player: &Player) -> bool {
        self.team_a.contains(player) || self.team_b.contains(player)
    }

    pub fn num_queued(&self) -> usize {
        self.team_a.len() + self.team_b.len()
    }

    pub fn num_expected(&self) -> usize {
        self.players_required_total
    }

    pub fn players_per_team(&self) -> usize {
        self.players_per_team
    }

    pub fn is_full(&self) -> bool {
        self.num_queued() >= self.num_expected()
    }

    pub fn team(&self, team: Team) -> &[Player] {
        match team {
            Team::A => &self.team_a,
            Team::B => &self.team_b,
        }
    }

    /// All queued players, team A first, each team in join order
    pub fn queued_players(&self) -> Vec<Player> {
        self.team_a.iter().chain(self.team_b.iter()).cloned().collect()
    }

    pub fn previous_roster(&self) -> &[Player] {
        &self.previous_roster
    }

    /// Try to start a match with the current rosters.
    ///
    /// When either team is empty the queue is reset as a side effect and
    /// `DegenerateStart` is returned. On success the caller is expected to
    /// `reset` once the announcement has been taken.
    pub fn start_match(&mut self) -> Result<MatchAnnouncement, QueueError> {
        if self.team_a.is_empty() || self.team_b.is_empty() {
            self.reset();
            return Err(QueueError::DegenerateStart);
        }

        self.touch();
        Ok(MatchAnnouncement {
            team_a: self.team_a.clone(),
            team_b: self.team_b.clone(),
        })
    }

    /// Archive the current rosters as the previous roster and empty both teams
    pub fn reset(&mut self) {
        let mut roster = std::mem::take(&mut self.team_a);
        roster.append(&mut self.team_b);
        self.previous_roster = roster;
        self.touch();
    }

    /// Shuffle the previous roster in place and split it into two teams.
    ///
    /// The first team receives `ceil(n / 2)` players.
    pub fn scramble_suggestion<R: Rng>(
        &mut self,
        words: &dyn WordSource,
        rng: &mut R,
    ) -> Result<ScrambleSuggestion, QueueError> {
        if self.previous_roster.is_empty() {
            return Err(QueueError::NoHistory);
        }

        self.previous_roster.shuffle(rng);
        let split = self.previous_roster.len().div_ceil(2);
        let (adjective, noun) = words.pick(rng);

        Ok(ScrambleSuggestion {
            shuffle_id: format!("{} {}", adjective, noun).to_lowercase(),
            team_a: self.previous_roster[..split].to_vec(),
            team_b: self.previous_roster[split..].to_vec(),
        })
    }

    pub fn last_changed_at(&self) -> DateTime<Utc> {
        self.last_changed_at
    }

    /// Override the change timestamp
    pub fn set_last_changed_at(&mut self, at: DateTime<Utc>) {
        self.last_changed_at = at;
    }

    pub fn last_avatar_level(&self) -> i32 {
        self.last_avatar_level
    }

    /// Badge value the avatar should currently display
    pub fn badge_level(&self) -> u8 {
        self.num_queued().min(MAX_BADGE_LEVEL as usize) as u8
    }

    /// Record the outcome of an avatar update attempt.
    ///
    /// The change timestamp is refreshed whether or not the upload succeeded.
    pub fn record_avatar_attempt(&mut self, applied: Option<u8>, now: DateTime<Utc>) {
        if let Some(level) = applied {
            self.last_avatar_level = i32::from(level);
        }
        self.last_changed_at = now;
    }

    fn team_mut(&mut self, team: Team) -> &mut Vec<Player> {
        match team {
            Team::A => &mut self.team_a,
            Team::B => &mut self.team_b,
        }
    }

    fn touch(&mut self) {
        self.last_changed_at = current_timestamp();
    }
}
