//! The session registry: authoritative store of live matches.
//!
//! One structure owns three maps behind a single lock:
//! - match id -> match state
//! - player -> match id (reverse index)
//! - match id -> ordered participant list (index 0 = side A)
//!
//! All operations are atomic with respect to each other and never
//! block on I/O. Mutating a match goes through [`Registry::update`],
//! which runs a closure under the lock; concurrent move requests on
//! the same match therefore serialize, and the loser of a turn race
//! gets a rule error instead of a double-move.

use std::collections::HashMap;

use fourline_core::{MatchId, MatchState};
use tokio::sync::Mutex;

use crate::types::{PlayerName, BOT_NAME};

#[derive(Default)]
struct Inner {
    matches: HashMap<MatchId, MatchState>,
    player_to_match: HashMap<PlayerName, MatchId>,
    match_players: HashMap<MatchId, Vec<PlayerName>>,
}

/// Thread-safe match store. See the module docs.
#[derive(Default)]
pub struct Registry {
    inner: Mutex<Inner>,
}

impl Registry {
    pub fn new() -> Self {
        Registry::default()
    }

    /// Register a newly created match and establish its participant
    /// bindings. The bot identity gets no reverse binding: it plays in
    /// many matches simultaneously.
    pub async fn insert(&self, state: MatchState, players: Vec<PlayerName>) {
        let mut inner = self.inner.lock().await;
        let id = state.id().to_string();
        for player in &players {
            if player != BOT_NAME {
                inner.player_to_match.insert(player.clone(), id.clone());
            }
        }
        inner.match_players.insert(id.clone(), players);
        inner.matches.insert(id, state);
    }

    /// Snapshot of a match by id.
    pub async fn get(&self, id: &str) -> Option<MatchState> {
        self.inner.lock().await.matches.get(id).cloned()
    }

    /// The match a player is currently bound to, if any.
    pub async fn get_by_player(&self, player: &str) -> Option<(MatchId, MatchState)> {
        let inner = self.inner.lock().await;
        let id = inner.player_to_match.get(player)?;
        let state = inner.matches.get(id)?;
        Some((id.clone(), state.clone()))
    }

    /// Ordered participants of a match (index 0 = side A). Empty when
    /// the match is unknown.
    pub async fn participants(&self, id: &str) -> Vec<PlayerName> {
        self.inner
            .lock()
            .await
            .match_players
            .get(id)
            .cloned()
            .unwrap_or_default()
    }

    /// Run `f` against the match's state under the registry lock.
    /// Returns `None` when the match is unknown.
    pub async fn update<R>(&self, id: &str, f: impl FnOnce(&mut MatchState) -> R) -> Option<R> {
        let mut inner = self.inner.lock().await;
        inner.matches.get_mut(id).map(f)
    }

    /// Delete a match and every binding that points to it.
    pub async fn remove(&self, id: &str) {
        let mut inner = self.inner.lock().await;
        inner.matches.remove(id);
        inner.match_players.remove(id);
        inner.player_to_match.retain(|_, bound| bound.as_str() != id);
    }

    /// Number of live matches.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.matches.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
