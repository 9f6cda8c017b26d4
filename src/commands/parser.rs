//! Prefix command parsing

use crate::types::{GuildId, Player};

/// A chat command understood by the bot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Liveness probe
    Ping,
    /// Join the queue, optionally naming a team
    Join { team: Option<String> },
    /// Leave the queue
    Leave,
    /// Empty the guild's queue
    Clear,
    /// List queued players
    List,
    /// Suggest new random teams for the previous match
    Scramble,
    /// Show available commands
    Help,
}

impl Command {
    /// Parse `text` as a command if it starts with `prefix` and names a
    /// known command. Returns `None` for anything else.
    pub fn parse(text: &str, prefix: &str) -> Option<Self> {
        let rest = text.trim().strip_prefix(prefix)?;
        let mut words = rest.split_whitespace();
        let name = words.next()?.to_lowercase();

        let command = match name.as_str() {
            "ping" => Command::Ping,
            "pug" => Command::Join {
                team: words.next().map(str::to_string),
            },
            "unpug" => Command::Leave,
            "clearpuggers" => Command::Clear,
            "puggers" => Command::List,
            "scramble" => Command::Scramble,
            "pughelp" => Command::Help,
            _ => return None,
        };
        Some(command)
    }

    /// Command name, as typed after the prefix
    pub fn name(&self) -> &'static str {
        match self {
            Command::Ping => "ping",
            Command::Join { .. } => "pug",
            Command::Leave => "unpug",
            Command::Clear => "clearpuggers",
            Command::List => "puggers",
            Command::Scramble => "scramble",
            Command::Help => "pughelp",
        }
    }

    /// Whether the command only works inside the queue channel
    pub fn is_channel_gated(&self) -> bool {
        !matches!(self, Command::Ping | Command::Help)
    }

    /// One-line description for the help listing
    pub fn brief(&self) -> &'static str {
        match self {
            Command::Ping => "Test if bot is active",
            Command::Join { .. } => "Join the PUG queue",
            Command::Leave => "Leave the PUG queue",
            Command::Clear => "Empty the server's PUG queue",
            Command::List => "List players currently queueing for PUG",
            Command::Scramble => "Get new random teams suggestion for the latest PUG",
            Command::Help => "Show this help",
        }
    }

    pub fn all() -> [Command; 7] {
        [
            Command::Ping,
            Command::Join { team: None },
            Command::Leave,
            Command::Clear,
            Command::List,
            Command::Scramble,
            Command::Help,
        ]
    }
}

/// A chat message addressed to the bot, as delivered by the platform
#[derive(Debug, Clone)]
pub struct CommandInvocation {
    pub guild_id: GuildId,
    pub channel_name: String,
    pub player: Player,
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_commands() {
        assert_eq!(Command::parse("!ping", "!"), Some(Command::Ping));
        assert_eq!(
            Command::parse("!pug", "!"),
            Some(Command::Join { team: None })
        );
        assert_eq!(
            Command::parse("  !PUG nsf extra ", "!"),
            Some(Command::Join {
                team: Some("nsf".to_string())
            })
        );
        assert_eq!(Command::parse("!unpug", "!"), Some(Command::Leave));
        assert_eq!(Command::parse("!clearpuggers", "!"), Some(Command::Clear));
        assert_eq!(Command::parse("!puggers", "!"), Some(Command::List));
        assert_eq!(Command::parse("!scramble", "!"), Some(Command::Scramble));
        assert_eq!(Command::parse("!pughelp", "!"), Some(Command::Help));
    }

    #[test]
    fn test_parse_rejects_other_messages() {
        assert_eq!(Command::parse("pug", "!"), None);
        assert_eq!(Command::parse("!", "!"), None);
        assert_eq!(Command::parse("!dance", "!"), None);
        assert_eq!(Command::parse(".pug", "!"), None);
        assert_eq!(Command::parse("", "!"), None);
    }

    #[test]
    fn test_multi_character_prefix() {
        assert_eq!(Command::parse("pb!puggers", "pb!"), Some(Command::List));
    }

    #[test]
    fn test_name_round_trips_through_parse() {
        for command in Command::all() {
            let text = format!("!{}", command.name());
            assert_eq!(Command::parse(&text, "!"), Some(command));
        }
    }

    #[test]
    fn test_gating() {
        assert!(!Command::Ping.is_channel_gated());
        assert!(!Command::Help.is_channel_gated());
        assert!(Command::Scramble.is_channel_gated());
        assert!(Command::Join { team: None }.is_channel_gated());
    }
}
