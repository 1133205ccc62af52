//! Persistence collaborator for finished matches and win counts.
//!
//! The coordinator calls this synchronously on the move-completion
//! path but treats it as best-effort: failures are logged and never
//! disturb the in-memory match state.

use std::collections::HashMap;
use std::sync::Mutex;

use fourline_core::Winner;

use crate::types::BOT_NAME;

/// One leaderboard row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderEntry {
    pub username: String,
    pub wins: u64,
}

/// A persisted finished match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedMatch {
    pub side_a: String,
    pub side_b: String,
    pub winner: u8,
    pub move_log: String,
}

/// Store of completed matches and aggregated win counts.
///
/// `save_match` must be idempotent on a duplicate identical match id
/// (the first write wins). Durable backends live behind this trait.
pub trait MatchStore: Send + Sync {
    fn save_match(
        &self,
        id: &str,
        side_a: &str,
        side_b: &str,
        winner: Winner,
        move_log: &str,
    ) -> anyhow::Result<()>;

    fn record_win(&self, username: &str) -> anyhow::Result<()>;

    /// Aggregated win counts, most wins first, at most 20 rows. The
    /// automated opponent is excluded.
    fn leaderboard(&self) -> Vec<LeaderEntry>;
}

#[derive(Default)]
struct StoreInner {
    matches: HashMap<String, SavedMatch>,
    wins: HashMap<String, u64>,
}

/// In-process implementation backing the default wiring and tests.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<StoreInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    fn locked(&self) -> std::sync::MutexGuard<'_, StoreInner> {
        // A poisoned lock only means another thread panicked mid-write;
        // the map itself is still usable.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The persisted record for a match id, if any.
    pub fn saved(&self, id: &str) -> Option<SavedMatch> {
        self.locked().matches.get(id).cloned()
    }

    /// Current win count for a player.
    pub fn wins(&self, username: &str) -> u64 {
        self.locked().wins.get(username).copied().unwrap_or(0)
    }
}

impl MatchStore for MemoryStore {
    fn save_match(
        &self,
        id: &str,
        side_a: &str,
        side_b: &str,
        winner: Winner,
        move_log: &str,
    ) -> anyhow::Result<()> {
        let mut inner = self.locked();
        inner.matches.entry(id.to_string()).or_insert(SavedMatch {
            side_a: side_a.to_string(),
            side_b: side_b.to_string(),
            winner: winner.as_u8(),
            move_log: move_log.to_string(),
        });
        Ok(())
    }

    fn record_win(&self, username: &str) -> anyhow::Result<()> {
        *self.locked().wins.entry(username.to_string()).or_insert(0) += 1;
        Ok(())
    }

    fn leaderboard(&self) -> Vec<LeaderEntry> {
        let inner = self.locked();
        let mut rows: Vec<LeaderEntry> = inner
            .wins
            .iter()
            .filter(|(name, _)| name.as_str() != BOT_NAME)
            .map(|(name, &wins)| LeaderEntry {
                username: name.clone(),
                wins,
            })
            .collect();
        rows.sort_by(|a, b| b.wins.cmp(&a.wins).then_with(|| a.username.cmp(&b.username)));
        rows.truncate(20);
        rows
    }
}
