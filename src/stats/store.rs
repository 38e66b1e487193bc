//! Aggregate bot-performance statistics and persistence
//!
//! One JSON document per process, loaded at start and rewritten at match
//! end. Writes are atomic (temp file + rename); a malformed file on load
//! is backed up with a timestamp suffix and replaced with defaults.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::{Mutex, RwLock};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::core::config::STATS_HISTORY_CAP;
use crate::core::error::{GameError, Result};

/// Win/loss counter pair
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct WinLoss {
    pub wins: u64,
    pub losses: u64,
}

impl WinLoss {
    /// Observed win rate in [0, 1]; an even 0.5 prior with no data
    pub fn win_rate(&self) -> f32 {
        let total = self.wins + self.losses;
        if total == 0 {
            0.5
        } else {
            self.wins as f32 / total as f32
        }
    }
}

/// One finished match, kept in the bounded history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchSummary {
    pub winner: Option<String>,
    pub turns: u64,
    pub bot_won: bool,
    pub strategy: String,
    pub ended_at_unix: u64,
}

/// Process-wide persisted record of bot performance
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AggregateStats {
    pub total_games: u64,
    pub wins: u64,
    pub losses: u64,
    pub per_card: HashMap<String, WinLoss>,
    pub per_strategy: HashMap<String, WinLoss>,
    pub history: VecDeque<MatchSummary>,
}

impl AggregateStats {
    /// Fold one finished match into the counters
    pub fn record_match(&mut self, cards_played: &[String], summary: MatchSummary) {
        self.total_games += 1;
        if summary.bot_won {
            self.wins += 1;
        } else {
            self.losses += 1;
        }
        for card in cards_played {
            let record = self.per_card.entry(card.clone()).or_default();
            if summary.bot_won {
                record.wins += 1;
            } else {
                record.losses += 1;
            }
        }
        let bucket = self.per_strategy.entry(summary.strategy.clone()).or_default();
        if summary.bot_won {
            bucket.wins += 1;
        } else {
            bucket.losses += 1;
        }
        self.history.push_back(summary);
        while self.history.len() > STATS_HISTORY_CAP {
            self.history.pop_front();
        }
    }

    pub fn card_win_rate(&self, card_id: &str) -> f32 {
        self.per_card
            .get(card_id)
            .map(WinLoss::win_rate)
            .unwrap_or(0.5)
    }

    pub fn overall_win_rate(&self) -> f32 {
        WinLoss {
            wins: self.wins,
            losses: self.losses,
        }
        .win_rate()
    }
}

/// Storage behind the statistics table, so the simulation core can be
/// tested against an in-memory implementation.
pub trait StatsStore: Send + Sync {
    fn load(&self) -> Result<AggregateStats>;
    fn save(&self, stats: &AggregateStats) -> Result<()>;
}

/// JSON file storage with atomic writes and corruption recovery
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn backup_corrupt(&self) -> Result<PathBuf> {
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let backup = self.path.with_extension(format!("corrupt.{stamp}"));
        std::fs::rename(&self.path, &backup)?;
        Ok(backup)
    }
}

impl StatsStore for FileStore {
    fn load(&self) -> Result<AggregateStats> {
        if !self.path.exists() {
            return Ok(AggregateStats::default());
        }
        let raw = std::fs::read_to_string(&self.path)?;
        match serde_json::from_str(&raw) {
            Ok(stats) => Ok(stats),
            Err(e) => {
                let backup = self.backup_corrupt()?;
                tracing::warn!(
                    path = %self.path.display(),
                    backup = %backup.display(),
                    error = %e,
                    "statistics file corrupt, backed up and reset to defaults"
                );
                Ok(AggregateStats::default())
            }
        }
    }

    fn save(&self, stats: &AggregateStats) -> Result<()> {
        let tmp = self.path.with_extension("tmp");
        let raw = serde_json::to_string_pretty(stats)?;
        std::fs::write(&tmp, raw)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// In-memory storage for tests
#[derive(Default)]
pub struct MemoryStore {
    slot: Mutex<Option<AggregateStats>>,
}

impl StatsStore for MemoryStore {
    fn load(&self) -> Result<AggregateStats> {
        let slot = self
            .slot
            .lock()
            .map_err(|_| GameError::CorruptPersistedState("stats lock poisoned".into()))?;
        Ok(slot.clone().unwrap_or_default())
    }

    fn save(&self, stats: &AggregateStats) -> Result<()> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| GameError::CorruptPersistedState("stats lock poisoned".into()))?;
        *slot = Some(stats.clone());
        Ok(())
    }
}

/// Shared process-wide handle: read-mostly table, persisted on mutation
pub struct StatsHandle {
    inner: RwLock<AggregateStats>,
    store: Box<dyn StatsStore>,
}

impl StatsHandle {
    /// Load from storage (recovering from corruption) and wrap
    pub fn load(store: Box<dyn StatsStore>) -> Result<Self> {
        let stats = store.load()?;
        Ok(Self {
            inner: RwLock::new(stats),
            store,
        })
    }

    /// Record a finished match and persist the updated table
    pub fn record_match(&self, cards_played: &[String], summary: MatchSummary) {
        let Ok(mut stats) = self.inner.write() else {
            return;
        };
        stats.record_match(cards_played, summary);
        if let Err(e) = self.store.save(&stats) {
            tracing::warn!(error = %e, "failed to persist statistics");
        }
    }

    pub fn snapshot(&self) -> AggregateStats {
        self.inner
            .read()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    pub fn card_win_rate(&self, card_id: &str) -> f32 {
        self.inner
            .read()
            .map(|s| s.card_win_rate(card_id))
            .unwrap_or(0.5)
    }

    pub fn overall_win_rate(&self) -> f32 {
        self.inner
            .read()
            .map(|s| s.overall_win_rate())
            .unwrap_or(0.5)
    }
}
