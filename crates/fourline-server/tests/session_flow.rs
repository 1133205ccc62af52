//! Coordinator-level scenarios: the move pipeline, bot replies,
//! disconnect grace handling, and collaborator hand-off, driven
//! directly against in-process connections.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::mpsc;

use fourline_core::{MatchState, Side};
use fourline_protocol::{MatchSnapshot, ServerReply};
use fourline_server::config::Config;
use fourline_server::coordinator::Coordinator;
use fourline_server::events::{EventKind, EventPublisher};
use fourline_server::store::{MatchStore, MemoryStore};
use fourline_server::types::{OutboundRx, BOT_NAME};

#[derive(Default)]
struct CollectingPublisher {
    events: Mutex<Vec<(EventKind, Value)>>,
}

impl EventPublisher for CollectingPublisher {
    fn emit(&self, kind: EventKind, payload: Value) {
        self.events.lock().unwrap().push((kind, payload));
    }
}

impl CollectingPublisher {
    fn kinds(&self) -> Vec<EventKind> {
        self.events.lock().unwrap().iter().map(|(k, _)| *k).collect()
    }
}

fn test_config() -> Config {
    Config {
        bind_addr: "127.0.0.1".to_string(),
        port: 0,
        max_clients: 16,
        match_wait: Duration::from_millis(100),
        bot_delay: Duration::from_millis(20),
        grace_period: Duration::from_millis(80),
    }
}

fn test_coordinator() -> (Coordinator, Arc<MemoryStore>, Arc<CollectingPublisher>) {
    let store = Arc::new(MemoryStore::new());
    let events = Arc::new(CollectingPublisher::default());
    let coordinator = Coordinator::new(test_config(), store.clone(), events.clone());
    (coordinator, store, events)
}

/// Register a fresh match with the given participants, returning its id.
async fn start_match(coordinator: &Coordinator, players: &[&str]) -> String {
    let state = MatchState::new();
    let id = state.id().to_string();
    coordinator
        .registry()
        .insert(state, players.iter().map(|p| p.to_string()).collect())
        .await;
    id
}

async fn attach_player(coordinator: &Coordinator, id: &str, name: &str) -> OutboundRx {
    let (tx, rx) = mpsc::unbounded_channel();
    coordinator.attach(id, name, tx).await;
    rx
}

async fn recv_reply(rx: &mut OutboundRx) -> ServerReply {
    tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("timed out waiting for a reply")
        .expect("channel closed")
}

async fn recv_state(rx: &mut OutboundRx) -> MatchSnapshot {
    match recv_reply(rx).await {
        ServerReply::State(snapshot) => snapshot,
        ServerReply::Error(err) => panic!("expected a snapshot, got error {:?}", err.error),
    }
}

/// Drain all buffered replies, returning the last snapshot seen.
fn last_buffered_state(rx: &mut OutboundRx) -> Option<MatchSnapshot> {
    let mut last = None;
    while let Ok(reply) = rx.try_recv() {
        if let ServerReply::State(snapshot) = reply {
            last = Some(snapshot);
        }
    }
    last
}

#[tokio::test]
async fn concurrent_resolution_pairs_two_players_into_one_match() {
    let (coordinator, _store, events) = test_coordinator();

    let alice_task = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move { coordinator.resolve_session("alice", None).await })
    };
    tokio::time::sleep(Duration::from_millis(30)).await;

    let (bob_id, bob_state) = coordinator.resolve_session("bob", None).await;
    let (alice_id, _) = alice_task.await.expect("alice task");

    assert_eq!(alice_id, bob_id);
    assert!(!bob_state.finished());
    // The earlier waiter is side A.
    assert_eq!(
        coordinator.registry().participants(&bob_id).await,
        vec!["alice".to_string(), "bob".to_string()]
    );
    assert_eq!(events.kinds(), vec![EventKind::MatchStarted]);
}

#[tokio::test]
async fn lone_resolution_falls_back_to_the_bot() {
    let (coordinator, _store, _events) = test_coordinator();
    let (id, state) = coordinator.resolve_session("solo", None).await;
    assert!(!state.finished());
    assert_eq!(
        coordinator.registry().participants(&id).await,
        vec!["solo".to_string(), BOT_NAME.to_string()]
    );
}

#[tokio::test]
async fn a_move_is_broadcast_to_every_connection() {
    let (coordinator, _store, events) = test_coordinator();
    let id = start_match(&coordinator, &["alice", "bob"]).await;
    let mut alice = attach_player(&coordinator, &id, "alice").await;
    let mut bob = attach_player(&coordinator, &id, "bob").await;

    coordinator.play_move(&id, "alice", 3).await;

    for rx in [&mut alice, &mut bob] {
        let snapshot = recv_state(rx).await;
        assert_eq!(snapshot.turn, 2);
        assert_eq!(snapshot.board[0][3], 1);
        assert!(!snapshot.finished);
    }
    assert_eq!(events.kinds(), vec![EventKind::MoveMade]);
}

#[tokio::test]
async fn rule_errors_reach_only_the_offender() {
    let (coordinator, _store, _events) = test_coordinator();
    let id = start_match(&coordinator, &["alice", "bob"]).await;
    let mut alice = attach_player(&coordinator, &id, "alice").await;
    let mut bob = attach_player(&coordinator, &id, "bob").await;

    // It is side A's turn; bob (side B) tries to move.
    coordinator.play_move(&id, "bob", 0).await;

    match recv_reply(&mut bob).await {
        ServerReply::Error(err) => assert_eq!(err.error, "not your turn"),
        other => panic!("expected an error reply, got {other:?}"),
    }
    assert!(alice.try_recv().is_err());

    let state = coordinator.registry().get(&id).await.expect("match");
    assert_eq!(state.turn(), Side::A);
    assert!(state.moves().is_empty());
}

#[tokio::test]
async fn out_of_range_column_is_reported_and_changes_nothing() {
    let (coordinator, _store, _events) = test_coordinator();
    let id = start_match(&coordinator, &["alice", "bob"]).await;
    let mut alice = attach_player(&coordinator, &id, "alice").await;

    coordinator.play_move(&id, "alice", 9).await;

    match recv_reply(&mut alice).await {
        ServerReply::Error(err) => assert_eq!(err.error, "invalid column"),
        other => panic!("expected an error reply, got {other:?}"),
    }
    let state = coordinator.registry().get(&id).await.expect("match");
    assert!(state.moves().is_empty());
}

#[tokio::test]
async fn unknown_match_reports_match_not_found() {
    let (coordinator, _store, _events) = test_coordinator();
    let mut alice = attach_player(&coordinator, "g-missing", "alice").await;

    coordinator.play_move("g-missing", "alice", 0).await;

    match recv_reply(&mut alice).await {
        ServerReply::Error(err) => assert_eq!(err.error, "match not found"),
        other => panic!("expected an error reply, got {other:?}"),
    }
}

#[tokio::test]
async fn a_winning_move_persists_and_clears_the_match() {
    let (coordinator, store, events) = test_coordinator();
    let id = start_match(&coordinator, &["alice", "bob"]).await;
    let mut alice = attach_player(&coordinator, &id, "alice").await;
    let mut bob = attach_player(&coordinator, &id, "bob").await;

    // Alice marches across columns 0..3 while bob stacks column 6.
    for (actor, column) in [
        ("alice", 0),
        ("bob", 6),
        ("alice", 1),
        ("bob", 6),
        ("alice", 2),
        ("bob", 6),
        ("alice", 3),
    ] {
        coordinator.play_move(&id, actor, column).await;
    }

    let final_state = last_buffered_state(&mut alice).expect("snapshots for alice");
    assert!(final_state.finished);
    assert_eq!(final_state.winner, 1);
    let final_state_bob = last_buffered_state(&mut bob).expect("snapshots for bob");
    assert_eq!(final_state_bob, final_state);

    // Handed to the collaborators, then removed from the registry.
    let saved = store.saved(&id).expect("saved match");
    assert_eq!(saved.side_a, "alice");
    assert_eq!(saved.side_b, "bob");
    assert_eq!(saved.winner, 1);
    let log: Value = serde_json::from_str(&saved.move_log).expect("move log json");
    assert_eq!(log.as_array().expect("array").len(), 7);
    assert_eq!(store.wins("alice"), 1);
    assert_eq!(store.wins("bob"), 0);
    assert!(coordinator.registry().get(&id).await.is_none());

    let kinds = events.kinds();
    assert_eq!(kinds.iter().filter(|k| **k == EventKind::MoveMade).count(), 7);
    assert_eq!(kinds.last(), Some(&EventKind::MatchFinished));
}

#[tokio::test]
async fn a_drawn_board_records_no_win() {
    let (coordinator, store, _events) = test_coordinator();
    let id = start_match(&coordinator, &["alice", "bob"]).await;
    let _alice = attach_player(&coordinator, &id, "alice").await;

    // Same drawless 42-move sequence as the core rules tests.
    let columns = [
        0, 1, 0, 1, 2, 3, 2, 3, 4, 5, 4, 5, 6, 0, 6, 0, 1, 2, 1, 2, 3,
        4, 3, 4, 5, 6, 5, 6, 0, 1, 0, 1, 2, 3, 2, 3, 4, 5, 4, 5, 6, 6,
    ];
    for (i, column) in columns.into_iter().enumerate() {
        let actor = if i % 2 == 0 { "alice" } else { "bob" };
        coordinator.play_move(&id, actor, column).await;
    }

    let saved = store.saved(&id).expect("saved match");
    assert_eq!(saved.winner, 0);
    assert_eq!(store.wins("alice"), 0);
    assert_eq!(store.wins("bob"), 0);
    assert!(coordinator.registry().get(&id).await.is_none());
}

#[tokio::test]
async fn the_bot_replies_after_its_delay() {
    let (coordinator, _store, _events) = test_coordinator();
    let id = start_match(&coordinator, &["casey", BOT_NAME]).await;
    let mut casey = attach_player(&coordinator, &id, "casey").await;

    coordinator.play_move(&id, "casey", 0).await;

    let after_human = recv_state(&mut casey).await;
    assert_eq!(after_human.turn, 2);

    let after_bot = recv_state(&mut casey).await;
    assert_eq!(after_bot.turn, 1);
    let bot_discs = after_bot
        .board
        .iter()
        .flatten()
        .filter(|&&cell| cell == 2)
        .count();
    assert_eq!(bot_discs, 1);
}

#[tokio::test]
async fn disconnect_past_the_grace_period_forfeits() {
    let (coordinator, store, _events) = test_coordinator();
    let id = start_match(&coordinator, &["alice", "bob"]).await;
    let mut alice = attach_player(&coordinator, &id, "alice").await;
    let _bob = attach_player(&coordinator, &id, "bob").await;

    coordinator.detach(&id, "bob").await;
    tokio::time::sleep(Duration::from_millis(160)).await;

    // The remaining participant wins; the match is persisted and gone.
    let final_state = last_buffered_state(&mut alice).expect("forfeit snapshot");
    assert!(final_state.finished);
    assert_eq!(final_state.winner, 1);
    assert_eq!(store.saved(&id).expect("saved match").winner, 1);
    assert_eq!(store.wins("alice"), 1);
    assert!(coordinator.registry().get(&id).await.is_none());
}

#[tokio::test]
async fn reconnecting_within_grace_cancels_the_forfeit() {
    let (coordinator, store, _events) = test_coordinator();
    let id = start_match(&coordinator, &["alice", "bob"]).await;
    let _alice = attach_player(&coordinator, &id, "alice").await;
    let _bob = attach_player(&coordinator, &id, "bob").await;

    coordinator.play_move(&id, "alice", 2).await;
    coordinator.detach(&id, "bob").await;
    tokio::time::sleep(Duration::from_millis(30)).await;
    let _bob_again = attach_player(&coordinator, &id, "bob").await;
    tokio::time::sleep(Duration::from_millis(120)).await;

    // Well past the first grace deadline: still live, turn intact.
    let state = coordinator.registry().get(&id).await.expect("match");
    assert!(!state.finished());
    assert_eq!(state.turn(), Side::B);
    assert!(store.saved(&id).is_none());
}

#[test]
fn leaderboard_orders_wins_and_excludes_the_bot() {
    let store = MemoryStore::new();
    store.record_win("alice").unwrap();
    store.record_win("alice").unwrap();
    store.record_win(BOT_NAME).unwrap();
    store.record_win("bob").unwrap();

    let rows = store.leaderboard();
    assert_eq!(rows.len(), 2);
    assert_eq!((rows[0].username.as_str(), rows[0].wins), ("alice", 2));
    assert_eq!((rows[1].username.as_str(), rows[1].wins), ("bob", 1));
}

#[test]
fn saving_the_same_match_twice_keeps_the_first_record() {
    use fourline_core::Winner;

    let store = MemoryStore::new();
    store
        .save_match("g-1", "alice", "bob", Winner::Side(Side::A), "[]")
        .unwrap();
    store
        .save_match("g-1", "alice", "bob", Winner::Side(Side::B), "[]")
        .unwrap();
    assert_eq!(store.saved("g-1").expect("saved").winner, 1);
}
