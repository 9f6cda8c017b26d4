//! Word lists for human-readable scramble identifiers

use anyhow::{anyhow, Context, Result};
use rand::seq::SliceRandom;
use rand::RngCore;
use std::path::Path;

/// Supplies an `(adjective, noun)` pair, each picked uniformly at random
pub trait WordSource: Send + Sync {
    fn pick(&self, rng: &mut dyn RngCore) -> (String, String);
}

const ADJECTIVES: &[&str] = &[
    "amber", "brave", "calm", "dusty", "eager", "fancy", "gentle", "hollow", "icy", "jolly",
    "keen", "lucky", "mellow", "nimble", "odd", "proud", "quiet", "rapid", "shiny", "tidy",
    "urban", "vivid", "witty", "young", "zesty", "bold", "crisp", "dizzy", "fuzzy", "grumpy",
];

const NOUNS: &[&str] = &[
    "anchor", "badger", "cactus", "dragon", "engine", "falcon", "ghost", "harbor", "island",
    "jaguar", "kettle", "lantern", "magnet", "needle", "otter", "pepper", "quartz", "rocket",
    "saddle", "tunnel", "umbrella", "violin", "walrus", "yacht", "zephyr", "bucket", "comet",
    "dynamo", "falafel", "goblin",
];

/// In-memory adjective and noun lists
#[derive(Debug, Clone)]
pub struct EmbeddedWordList {
    adjectives: Vec<String>,
    nouns: Vec<String>,
}

impl EmbeddedWordList {
    pub fn new(adjectives: Vec<String>, nouns: Vec<String>) -> Result<Self> {
        if adjectives.is_empty() || nouns.is_empty() {
            return Err(anyhow!("Word lists cannot be empty"));
        }
        Ok(Self { adjectives, nouns })
    }

    /// Load newline-separated word lists; blank lines are skipped
    pub fn from_files(adjectives: impl AsRef<Path>, nouns: impl AsRef<Path>) -> Result<Self> {
        Self::new(read_words(adjectives.as_ref())?, read_words(nouns.as_ref())?)
    }

    pub fn sizes(&self) -> (usize, usize) {
        (self.adjectives.len(), self.nouns.len())
    }
}

impl Default for EmbeddedWordList {
    fn default() -> Self {
        Self {
            adjectives: ADJECTIVES.iter().map(|w| w.to_string()).collect(),
            nouns: NOUNS.iter().map(|w| w.to_string()).collect(),
        }
    }
}

impl WordSource for EmbeddedWordList {
    fn pick(&self, rng: &mut dyn RngCore) -> (String, String) {
        // Both lists are non-empty by construction
        let adjective = self.adjectives.choose(rng).cloned().unwrap_or_default();
        let noun = self.nouns.choose(rng).cloned().unwrap_or_default();
        (adjective, noun)
    }
}

fn read_words(path: &Path) -> Result<Vec<String>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read word list {}", path.display()))?;
    Ok(raw
        .lines()
        .map(|line| line.trim().to_lowercase())
        .filter(|line| !line.is_empty())
        .collect())
}
