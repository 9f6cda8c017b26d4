//! Command execution against the guild registry
//!
//! The router turns a parsed command into a queue operation and renders the
//! text reply. User-caused failures become replies; only internal errors
//! propagate.

use crate::commands::parser::{Command, CommandInvocation};
use crate::config::AppConfig;
use crate::error::QueueError;
use crate::metrics::MetricsCollector;
use crate::queue::{lock_queue, GuildRegistry, WordSource};
use crate::types::{Player, TeamNames};
use crate::utils::comma_list;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Settings the router needs from the application configuration
#[derive(Debug, Clone)]
pub struct RouterSettings {
    pub command_prefix: String,
    pub queue_channel_name: String,
    pub team_names: TeamNames,
}

impl From<&AppConfig> for RouterSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            command_prefix: config.bot.command_prefix.clone(),
            queue_channel_name: config.bot.queue_channel_name.clone(),
            team_names: config.queue.team_names.clone(),
        }
    }
}

pub struct CommandRouter {
    registry: Arc<GuildRegistry>,
    words: Arc<dyn WordSource>,
    settings: RouterSettings,
    metrics: Arc<MetricsCollector>,
    rng: Mutex<StdRng>,
}

impl CommandRouter {
    pub fn new(
        registry: Arc<GuildRegistry>,
        words: Arc<dyn WordSource>,
        settings: RouterSettings,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self::with_rng(registry, words, settings, metrics, StdRng::from_entropy())
    }

    /// Create a router with a caller-supplied random source
    pub fn with_rng(
        registry: Arc<GuildRegistry>,
        words: Arc<dyn WordSource>,
        settings: RouterSettings,
        metrics: Arc<MetricsCollector>,
        rng: StdRng,
    ) -> Self {
        Self {
            registry,
            words,
            settings,
            metrics,
            rng: Mutex::new(rng),
        }
    }

    pub fn settings(&self) -> &RouterSettings {
        &self.settings
    }

    /// Handle a chat message. Returns the reply, or `None` when the message
    /// is not a command or is outside the queue channel.
    pub fn handle(&self, invocation: &CommandInvocation) -> Result<Option<String>, QueueError> {
        let Some(command) = Command::parse(&invocation.text, &self.settings.command_prefix) else {
            return Ok(None);
        };

        if command.is_channel_gated() && invocation.channel_name != self.settings.queue_channel_name
        {
            debug!(
                "Ignoring '{}' from {} outside #{} in guild {}",
                command.name(),
                invocation.player.name,
                self.settings.queue_channel_name,
                invocation.guild_id
            );
            return Ok(None);
        }

        self.metrics.record_command(command.name());
        let reply = self.execute(&command, invocation)?;
        Ok(Some(reply))
    }

    fn execute(
        &self,
        command: &Command,
        invocation: &CommandInvocation,
    ) -> Result<String, QueueError> {
        let player = &invocation.player;
        let guild_id = invocation.guild_id;

        match command {
            Command::Ping => Ok("pong".to_string()),
            Command::Help => Ok(self.render_help()),
            Command::Join { team } => {
                let team = match team {
                    Some(arg) => match self.settings.team_names.parse(arg) {
                        Some(team) => Some(team),
                        None => return Ok(self.render_unknown_team(player, arg)),
                    },
                    None => None,
                };

                let queue = self.registry.get_or_create(guild_id)?;
                let mut state = lock_queue(&queue)?;
                let result = {
                    let mut rng = self.rng.lock().map_err(|_| QueueError::lock_poisoned("rng"))?;
                    state.join(player.clone(), team, &mut *rng)
                };

                match result {
                    Ok(team) => {
                        self.metrics.record_join();
                        info!(
                            "{} joined team {} in guild {} ({} / {})",
                            player.name,
                            self.settings.team_names.name(team),
                            guild_id,
                            state.num_queued(),
                            state.num_expected()
                        );
                        Ok(format!(
                            "{} has joined the PUG queue ({} / {})",
                            player.name,
                            state.num_queued(),
                            state.num_expected()
                        ))
                    }
                    Err(error) => self.reject(player, error),
                }
            }
            Command::Leave => {
                let queue = self.registry.get_or_create(guild_id)?;
                let mut state = lock_queue(&queue)?;
                match state.leave(player) {
                    Ok(()) => {
                        info!(
                            "{} left the queue in guild {} ({} / {})",
                            player.name,
                            guild_id,
                            state.num_queued(),
                            state.num_expected()
                        );
                        Ok(format!(
                            "{} has left the PUG queue ({} / {})",
                            player.name,
                            state.num_queued(),
                            state.num_expected()
                        ))
                    }
                    Err(error) => self.reject(player, error),
                }
            }
            Command::Clear => {
                let queue = self.registry.get_or_create(guild_id)?;
                lock_queue(&queue)?.reset();
                info!("{} reset the queue in guild {}", player.name, guild_id);
                Ok(format!("{} has reset the PUG queue", player.name))
            }
            Command::List => {
                let queue = self.registry.get_or_create(guild_id)?;
                let state = lock_queue(&queue)?;
                let mut reply = format!(
                    "{} / {} player(s) currently queued",
                    state.num_queued(),
                    state.num_expected()
                );
                if state.num_queued() > 0 {
                    let players = state.queued_players();
                    reply.push_str(": ");
                    reply.push_str(&comma_list(players.iter().map(|p| p.name.as_str())));
                }
                Ok(reply)
            }
            Command::Scramble => {
                let queue = self.registry.get_or_create(guild_id)?;
                let mut state = lock_queue(&queue)?;
                let result = {
                    let mut rng = self.rng.lock().map_err(|_| QueueError::lock_poisoned("rng"))?;
                    state.scramble_suggestion(self.words.as_ref(), &mut *rng)
                };

                match result {
                    Ok(suggestion) => Ok(suggestion.render(
                        &player.name,
                        &self.settings.team_names,
                        &self.settings.command_prefix,
                    )),
                    Err(error) => self.reject(player, error),
                }
            }
        }
    }

    /// Render a user-facing error; anything else propagates
    fn reject(&self, player: &Player, error: QueueError) -> Result<String, QueueError> {
        if !error.is_user_facing() {
            return Err(error);
        }
        self.metrics.record_rejection(&error);
        debug!("Rejected command from {}: {}", player.name, error);

        let reply = match error {
            QueueError::AlreadyQueued { .. } => format!(
                "{} You are already queued! If you wanted to un-PUG, please use **{}unpug** instead.",
                player.mention, self.settings.command_prefix
            ),
            QueueError::QueueFull { .. } => {
                format!("{} Sorry, this PUG is currently full!", player.mention)
            }
            QueueError::NotQueued { .. } => {
                format!("{} You are not currently in the PUG queue", player.mention)
            }
            QueueError::NoHistory => {
                format!("{} No previous PUG found to scramble", player.mention)
            }
            other => format!("{} {}", player.mention, other),
        };
        Ok(reply)
    }

    fn render_unknown_team(&self, player: &Player, arg: &str) -> String {
        let names = &self.settings.team_names.0;
        format!(
            "{} Unknown team \"{}\". Use 0 or {}, 1 or {}.",
            player.mention, arg, names[0], names[1]
        )
    }

    fn render_help(&self) -> String {
        let prefix = &self.settings.command_prefix;
        let lines: Vec<String> = Command::all()
            .iter()
            .map(|command| format!("**{}{}**: {}", prefix, command.name(), command.brief()))
            .collect();
        format!(
            "PUG commands (queue commands work in #{}):\n{}",
            self.settings.queue_channel_name,
            lines.join("\n")
        )
    }
}
