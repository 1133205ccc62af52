//! The connection coordinator.
//!
//! Orchestrates everything around a match: join resolution and
//! matchmaking, the move pipeline, snapshot broadcasts, the bot's
//! delayed replies, and disconnect grace handling. Per-structure locks
//! (registry, matchmaker pool, connection table, timer table) are
//! acquired briefly and never across a timed wait.
//!
//! The move pipeline runs once, parameterized by the acting identity,
//! for human and bot moves alike: apply under the registry lock, emit
//! the move event, broadcast the snapshot, then either finalize the
//! match or schedule the bot's reply.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use fourline_core::{bot, MatchId, MatchState, Side, Winner};
use fourline_protocol::ServerReply;

use crate::config::Config;
use crate::events::{EventKind, EventPublisher};
use crate::matchmaker::{Matchmaker, WaitOutcome};
use crate::registry::Registry;
use crate::store::MatchStore;
use crate::types::{ConnTable, OutboundTx, PlayerName, TimerTable, BOT_NAME};

/// Shared handle to the coordinator. Cloning is cheap; every clone
/// refers to the same tables.
#[derive(Clone)]
pub struct Coordinator {
    registry: Arc<Registry>,
    matchmaker: Arc<Matchmaker>,
    store: Arc<dyn MatchStore>,
    events: Arc<dyn EventPublisher>,
    conns: Arc<Mutex<ConnTable>>,
    timers: Arc<Mutex<TimerTable>>,
    config: Config,
}

impl Coordinator {
    pub fn new(
        config: Config,
        store: Arc<dyn MatchStore>,
        events: Arc<dyn EventPublisher>,
    ) -> Self {
        Coordinator {
            registry: Arc::new(Registry::new()),
            matchmaker: Arc::new(Matchmaker::new()),
            store,
            events,
            conns: Arc::new(Mutex::new(ConnTable::new())),
            timers: Arc::new(Mutex::new(TimerTable::new())),
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Total live connections across all matches.
    pub async fn connection_count(&self) -> usize {
        self.conns.lock().await.values().map(|m| m.len()).sum()
    }

    /// Resolve the match a connecting player belongs to.
    ///
    /// A known, unfinished match (by requested id or by the player's
    /// existing binding) is joined directly; otherwise the player goes
    /// through matchmaking. When the player's waiting entry was
    /// consumed by a pairing, the match registered by the other side is
    /// picked up from the registry before matchmaking is re-entered.
    pub async fn resolve_session(
        &self,
        player: &str,
        requested: Option<&str>,
    ) -> (MatchId, MatchState) {
        if let Some(id) = requested {
            if let Some(state) = self.registry.get(id).await {
                if !state.finished() {
                    return (id.to_string(), state);
                }
            }
        }
        if let Some((id, state)) = self.registry.get_by_player(player).await {
            if !state.finished() {
                return (id, state);
            }
        }

        loop {
            match self.matchmaker.wait(player, self.config.match_wait).await {
                WaitOutcome::Paired { state, opponent } => {
                    let id = state.id().to_string();
                    let players = vec![opponent, player.to_string()];
                    self.registry.insert(state.clone(), players.clone()).await;
                    info!(match_id = %id, ?players, "paired players into a match");
                    self.emit_started(&id, &players);
                    return (id, state);
                }
                WaitOutcome::BotMatch { state } => {
                    let id = state.id().to_string();
                    let players = vec![player.to_string(), BOT_NAME.to_string()];
                    self.registry.insert(state.clone(), players.clone()).await;
                    info!(match_id = %id, %player, "assigned the bot after the wait budget");
                    self.emit_started(&id, &players);
                    self.maybe_schedule_bot(&id, &state, &players);
                    return (id, state);
                }
                WaitOutcome::AlreadyMatched => {
                    if let Some((id, state)) = self.registry.get_by_player(player).await {
                        if !state.finished() {
                            return (id, state);
                        }
                    }
                    // The pairing side has not registered yet; wait again.
                }
            }
        }
    }

    /// Register a live connection for (match, player) and cancel any
    /// pending forfeit timer for that pairing.
    pub async fn attach(&self, match_id: &str, player: &str, tx: OutboundTx) {
        {
            let mut conns = self.conns.lock().await;
            conns
                .entry(match_id.to_string())
                .or_default()
                .insert(player.to_string(), tx);
        }
        let mut timers = self.timers.lock().await;
        if let Some(handle) = timers.remove(&(match_id.to_string(), player.to_string())) {
            handle.abort();
            debug!(%match_id, %player, "reconnected within grace, forfeit timer cancelled");
        }
    }

    /// Drop the live connection for (match, player). While the match is
    /// still unfinished this arms the grace timer; if it fires without
    /// a reconnection the match is forfeited to the other participant.
    pub async fn detach(&self, match_id: &str, player: &str) {
        {
            let mut conns = self.conns.lock().await;
            if let Some(players) = conns.get_mut(match_id) {
                players.remove(player);
                if players.is_empty() {
                    conns.remove(match_id);
                }
            }
        }

        let Some(state) = self.registry.get(match_id).await else {
            return;
        };
        if state.finished() {
            return;
        }

        let this = self.clone();
        let key = (match_id.to_string(), player.to_string());
        let timer_key = key.clone();
        let grace = self.config.grace_period;
        debug!(%match_id, %player, "connection lost, grace timer armed");
        let handle = tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            // Run the forfeit in its own task so a reconnect arriving
            // exactly at expiry can only cancel the sleep, never a
            // half-applied forfeit.
            tokio::spawn(async move {
                this.forfeit(&key.0, &key.1).await;
            });
        });

        let mut timers = self.timers.lock().await;
        if let Some(old) = timers.insert(timer_key, handle) {
            old.abort();
        }
    }

    /// The shared move pipeline for human and bot moves.
    ///
    /// Rule errors go only to the acting player's connection; the
    /// match and every other connection are untouched.
    pub async fn play_move(&self, match_id: &str, actor: &str, column: i32) {
        let participants = self.registry.participants(match_id).await;
        if participants.is_empty() {
            self.send_to(match_id, actor, ServerReply::error("match not found"))
                .await;
            return;
        }
        let side = if participants.get(1).map(String::as_str) == Some(actor) {
            Side::B
        } else {
            Side::A
        };

        // Check-turn-and-apply happens atomically under the registry
        // lock; the loser of a concurrent move race gets WrongTurn.
        let result = self
            .registry
            .update(match_id, |state| state.play(column, side))
            .await;
        let outcome = match result {
            None => {
                self.send_to(match_id, actor, ServerReply::error("match not found"))
                    .await;
                return;
            }
            Some(Err(err)) => {
                debug!(%match_id, %actor, column, error = %err, "rejected move");
                self.send_to(match_id, actor, ServerReply::error(err.to_string()))
                    .await;
                return;
            }
            Some(Ok(outcome)) => outcome,
        };

        self.events.emit(
            EventKind::MoveMade,
            json!({
                "game_id": match_id,
                "player": actor,
                "column": column,
                "row": outcome.row,
                "timestamp": Utc::now().to_rfc3339(),
            }),
        );

        let Some(state) = self.registry.get(match_id).await else {
            return;
        };
        self.broadcast(match_id, ServerReply::state(&state)).await;

        if outcome.finished {
            self.finalize(match_id, &state, &participants).await;
        } else {
            self.maybe_schedule_bot(match_id, &state, &participants);
        }
    }

    /// Send a reply to every live connection of a match. Best-effort
    /// fan-out under one lock acquisition so all recipients observe the
    /// same state for a given move.
    pub async fn broadcast(&self, match_id: &str, reply: ServerReply) {
        let conns = self.conns.lock().await;
        if let Some(players) = conns.get(match_id) {
            for tx in players.values() {
                let _ = tx.send(reply.clone());
            }
        }
    }

    /// Send a reply to one connection of a match, if it is live.
    pub async fn send_to(&self, match_id: &str, player: &str, reply: ServerReply) {
        let conns = self.conns.lock().await;
        if let Some(tx) = conns.get(match_id).and_then(|players| players.get(player)) {
            let _ = tx.send(reply);
        }
    }

    /// If the bot occupies side B and it is B's turn, schedule its
    /// reply after the configured delay. The schedule is never
    /// cancelled; the reply task re-reads the match and backs off when
    /// the match finished or vanished in the meantime.
    fn maybe_schedule_bot(&self, match_id: &str, state: &MatchState, participants: &[PlayerName]) {
        if participants.get(1).map(String::as_str) != Some(BOT_NAME) {
            return;
        }
        if state.finished() || state.turn() != Side::B {
            return;
        }
        let this = self.clone();
        let match_id = match_id.to_string();
        let delay = self.config.bot_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(state) = this.registry.get(&match_id).await else {
                return;
            };
            if state.finished() {
                return;
            }
            let column = bot::choose_column(state.board(), Side::B);
            this.play_move(&match_id, BOT_NAME, column).await;
        });
    }

    /// Hand a finished match to the collaborators and drop it from the
    /// registry. Collaborator failures are logged, never propagated.
    async fn finalize(&self, match_id: &str, state: &MatchState, participants: &[PlayerName]) {
        let side_a = participants.first().cloned().unwrap_or_default();
        let side_b = participants.get(1).cloned().unwrap_or_default();

        let move_log = encode_move_log(state);
        if let Err(err) = self
            .store
            .save_match(match_id, &side_a, &side_b, state.winner(), &move_log)
        {
            warn!(%match_id, error = %err, "failed to persist finished match");
        }
        let winner_name = match state.winner() {
            Winner::Side(Side::A) => Some(side_a),
            Winner::Side(Side::B) => Some(side_b),
            Winner::None | Winner::Draw => None,
        };
        if let Some(name) = winner_name {
            if let Err(err) = self.store.record_win(&name) {
                warn!(%match_id, %name, error = %err, "failed to record win");
            }
        }

        self.events.emit(
            EventKind::MatchFinished,
            json!({
                "game_id": match_id,
                "winner": state.winner().as_u8(),
                "players": participants,
                "timestamp": Utc::now().to_rfc3339(),
            }),
        );

        info!(%match_id, winner = state.winner().as_u8(), "match finished");
        self.registry.remove(match_id).await;
    }

    /// Grace expiry: if the player is still gone and the match still
    /// live, the other participant wins by forfeit.
    async fn forfeit(&self, match_id: &str, player: &str) {
        self.timers
            .lock()
            .await
            .remove(&(match_id.to_string(), player.to_string()));

        {
            let conns = self.conns.lock().await;
            let reconnected = conns
                .get(match_id)
                .map(|players| players.contains_key(player))
                .unwrap_or(false);
            if reconnected {
                return;
            }
        }

        let participants = self.registry.participants(match_id).await;
        if participants.is_empty() {
            return;
        }
        let winner = if participants.get(1).map(String::as_str) == Some(player) {
            Side::A
        } else {
            Side::B
        };

        let finished_now = self
            .registry
            .update(match_id, |state| {
                if state.finished() {
                    false
                } else {
                    state.finish(Winner::Side(winner));
                    true
                }
            })
            .await
            .unwrap_or(false);
        if !finished_now {
            return;
        }

        info!(%match_id, %player, "grace period expired, match forfeited");
        let Some(state) = self.registry.get(match_id).await else {
            return;
        };
        self.broadcast(match_id, ServerReply::state(&state)).await;
        self.finalize(match_id, &state, &participants).await;
    }

    fn emit_started(&self, match_id: &str, players: &[PlayerName]) {
        self.events.emit(
            EventKind::MatchStarted,
            json!({
                "game_id": match_id,
                "players": players,
                "timestamp": Utc::now().to_rfc3339(),
            }),
        );
    }
}

/// JSON move list persisted with a finished match.
fn encode_move_log(state: &MatchState) -> String {
    let moves: Vec<_> = state
        .moves()
        .iter()
        .map(|m| {
            json!({
                "player": m.side.as_u8(),
                "column": m.column,
                "row": m.row,
            })
        })
        .collect();
    serde_json::Value::Array(moves).to_string()
}
