//! Server and simulation configuration with documented constants
//!
//! All tunable values are collected here with explanations of their purpose
//! and how they interact with each other.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::core::error::Result;

// === GRID / PACING CONSTANTS ===

/// Maximum seats per match (one per cardinal spawn position)
pub const MAX_PLAYERS: usize = 4;

/// Starting and maximum base (structure) health
pub const BASE_MAX_HEALTH: i32 = 1000;

/// Elixir cap in turn-based matches
pub const ELIXIR_CAP_TURN: f32 = 15.0;

/// Elixir cap in continuous matches
///
/// Continuous regen is finer-grained, so the pool is deeper to keep
/// deploy cadence comparable between the two disciplines.
pub const ELIXIR_CAP_CONTINUOUS: f32 = 20.0;

/// Elixir granted to the new current player on each turn transition
pub const ELIXIR_PER_TURN: f32 = 3.0;

/// Elixir granted per regen interval in continuous mode
pub const ELIXIR_PER_REGEN: f32 = 1.0;

/// Elixir every participant starts with
pub const ELIXIR_INITIAL: f32 = 5.0;

/// Cards held in hand at any time
pub const HAND_SIZE: usize = 4;

/// Extra engagement distance units get against bases (range + 1).
///
/// Pinned behavior: the original engine grants one free cell of range
/// against structures. Intentional pacing asymmetry, do not normalize.
pub const BASE_ENGAGE_BONUS: i32 = 1;

/// Cap on simultaneously deployed units per participant
pub const UNITS_PER_PLAYER_CAP: usize = 12;

/// Bounded history length kept in aggregate statistics
pub const STATS_HISTORY_CAP: usize = 100;

// === TIMING ===

/// Turn length before auto-advance in turn-based mode
pub const TURN_DURATION: Duration = Duration::from_secs(30);

/// Simulation tick interval in continuous mode (30 Hz)
pub const TICK_INTERVAL: Duration = Duration::from_millis(33);

/// Elixir regen interval per participant in continuous mode
pub const REGEN_INTERVAL: Duration = Duration::from_secs(2);

/// How often a bot seat takes a decision cycle in continuous mode
pub const BOT_INTERVAL: Duration = Duration::from_millis(1500);

/// Grace window for reconnecting after an ungraceful disconnect
pub const RECONNECT_GRACE: Duration = Duration::from_secs(180);

/// Delay between match end and teardown of the match actor
pub const REAP_DELAY: Duration = Duration::from_secs(10);

// === RATE LIMITING ===

/// Sliding-window length for per-connection rate limiting
pub const RATE_WINDOW: Duration = Duration::from_secs(2);

/// Maximum actions accepted per connection per window
pub const RATE_MAX_ACTIONS: usize = 10;

/// Process-level configuration, overridable from a TOML file and CLI flags
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// TCP port the websocket endpoint listens on
    pub port: u16,
    /// Path of the persisted aggregate statistics document
    pub stats_path: String,
    /// Base URL of the optional learned scorer; empty disables it
    pub scorer_url: String,
    /// Default exploit/explore ratio for bot seats
    pub bot_exploit_ratio: f32,
    /// Default per-cycle action cap for bot seats
    pub bot_action_cap: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8765,
            stats_path: "bot_stats.json".into(),
            scorer_url: String::new(),
            bot_exploit_ratio: 0.7,
            bot_action_cap: 2,
        }
    }
}

impl ServerConfig {
    /// Load configuration from a TOML file, falling back to defaults
    /// for any missing field.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config = toml::from_str(&raw).map_err(|e| {
            crate::core::error::GameError::CorruptPersistedState(format!(
                "config {}: {e}",
                path.display()
            ))
        })?;
        Ok(config)
    }
}
