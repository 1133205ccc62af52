//! The matchmaking pool.
//!
//! A player waits at most one budget for a human opponent. The pool
//! lock is never held across the wait itself; removal of the caller's
//! entry by another arrival is the signal that a pairing happened.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use fourline_core::MatchState;
use tokio::sync::Mutex;

use crate::types::PlayerName;

struct WaitingEntry {
    joined_at: Instant,
}

/// How a call to [`Matchmaker::wait`] resolved.
#[derive(Debug)]
pub enum WaitOutcome {
    /// Another human was already waiting. The opponent is side A, the
    /// caller side B.
    Paired {
        state: MatchState,
        opponent: PlayerName,
    },

    /// Nobody arrived within the budget; the caller plays the bot
    /// (caller side A, bot side B).
    BotMatch { state: MatchState },

    /// The caller's entry was consumed by a pairing during the wait.
    /// The pairing side registered the match; the caller should look
    /// itself up in the registry before re-entering matchmaking.
    AlreadyMatched,
}

/// Waiting pool, keyed by player identity.
#[derive(Default)]
pub struct Matchmaker {
    waiting: Mutex<HashMap<PlayerName, WaitingEntry>>,
}

impl Matchmaker {
    pub fn new() -> Self {
        Matchmaker::default()
    }

    /// Pair with a waiting player, or park and wait out the budget.
    ///
    /// With several waiters present the earliest `joined_at` entry is
    /// chosen, so pairing order is deterministic.
    pub async fn wait(&self, name: &str, budget: Duration) -> WaitOutcome {
        {
            let mut pool = self.waiting.lock().await;
            let candidate = pool
                .iter()
                .filter(|(other, _)| other.as_str() != name)
                .min_by_key(|(_, entry)| entry.joined_at)
                .map(|(other, _)| other.clone());
            if let Some(other) = candidate {
                pool.remove(&other);
                return WaitOutcome::Paired {
                    state: MatchState::new(),
                    opponent: other,
                };
            }
            pool.insert(
                name.to_string(),
                WaitingEntry {
                    joined_at: Instant::now(),
                },
            );
        }

        tokio::time::sleep(budget).await;

        let mut pool = self.waiting.lock().await;
        if pool.remove(name).is_some() {
            WaitOutcome::BotMatch {
                state: MatchState::new(),
            }
        } else {
            WaitOutcome::AlreadyMatched
        }
    }

    /// Current number of waiting players.
    pub async fn waiting_count(&self) -> usize {
        self.waiting.lock().await.len()
    }
}
