//! Engine and protocol limits configuration.

use serde::Deserialize;

/// Engine and protocol limits.
///
/// `max_teams` and `max_ally_teams` describe what the game engine accepts;
/// the rest bound per-session and per-battle resource use.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Highest team count the engine supports (default: 16).
    #[serde(default = "default_max_teams")]
    pub max_teams: u32,
    /// Highest ally team count the engine supports (default: 16).
    #[serde(default = "default_max_ally_teams")]
    pub max_ally_teams: u32,
    /// Bots allowed in a single battle (default: 16).
    #[serde(default = "default_max_bots")]
    pub max_bots_per_battle: usize,
    /// Longest partial line a session may buffer before it is dropped (default: 16384).
    #[serde(default = "default_max_line_length")]
    pub max_line_length: usize,
    /// Nesting depth for commands that dispatch other commands (default: 4).
    #[serde(default = "default_max_recursion")]
    pub max_recursion: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_teams: default_max_teams(),
            max_ally_teams: default_max_ally_teams(),
            max_bots_per_battle: default_max_bots(),
            max_line_length: default_max_line_length(),
            max_recursion: default_max_recursion(),
        }
    }
}

fn default_max_teams() -> u32 {
    16
}

fn default_max_ally_teams() -> u32 {
    16
}

fn default_max_bots() -> usize {
    16
}

fn default_max_line_length() -> usize {
    16384
}

fn default_max_recursion() -> usize {
    4
}
