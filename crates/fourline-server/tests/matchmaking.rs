use std::sync::Arc;
use std::time::{Duration, Instant};

use fourline_server::matchmaker::{Matchmaker, WaitOutcome};

#[tokio::test]
async fn second_caller_pairs_with_the_first_waiter() {
    let mm = Arc::new(Matchmaker::new());

    let first = {
        let mm = mm.clone();
        tokio::spawn(async move { mm.wait("pat", Duration::from_millis(250)).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    // The second arrival returns immediately with the parked opponent
    // as side A.
    match mm.wait("quinn", Duration::from_millis(250)).await {
        WaitOutcome::Paired { state, opponent } => {
            assert_eq!(opponent, "pat");
            assert!(!state.finished());
        }
        other => panic!("expected a pairing, got {other:?}"),
    }

    // The first waiter's own call resolves via the pairing path, not
    // via a bot timeout.
    match first.await.expect("waiter task") {
        WaitOutcome::AlreadyMatched => {}
        other => panic!("expected the waiter to resolve via the pairing, got {other:?}"),
    }
    assert_eq!(mm.waiting_count().await, 0);
}

#[tokio::test]
async fn lone_waiter_times_out_into_a_bot_match() {
    let mm = Matchmaker::new();
    let started = Instant::now();

    match mm.wait("solo", Duration::from_millis(80)).await {
        WaitOutcome::BotMatch { state } => assert!(!state.finished()),
        other => panic!("expected a bot match, got {other:?}"),
    }

    assert!(started.elapsed() >= Duration::from_millis(80));
    assert_eq!(mm.waiting_count().await, 0);
}

#[tokio::test]
async fn earliest_waiter_is_paired_first() {
    let mm = Arc::new(Matchmaker::new());

    let early = {
        let mm = mm.clone();
        tokio::spawn(async move { mm.wait("early", Duration::from_millis(400)).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    let late = {
        let mm = mm.clone();
        tokio::spawn(async move { mm.wait("late", Duration::from_millis(400)).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(mm.waiting_count().await, 2);

    match mm.wait("caller", Duration::from_millis(100)).await {
        WaitOutcome::Paired { opponent, .. } => assert_eq!(opponent, "early"),
        other => panic!("expected a pairing with the earliest waiter, got {other:?}"),
    }

    // The later waiter stays parked and eventually gets the bot.
    match late.await.expect("late task") {
        WaitOutcome::BotMatch { .. } => {}
        other => panic!("expected a bot match for the remaining waiter, got {other:?}"),
    }
    match early.await.expect("early task") {
        WaitOutcome::AlreadyMatched => {}
        other => panic!("expected the early waiter to resolve via the pairing, got {other:?}"),
    }
}
