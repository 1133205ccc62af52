//! Analytics event publication.
//!
//! Fire-and-forget: emitting never blocks the caller and never fails
//! visibly. What listens on the other side (message bus, log shipper)
//! is outside this process.

use serde_json::Value;
use tracing::info;

/// The three event kinds the coordinator emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    MatchStarted,
    MoveMade,
    MatchFinished,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::MatchStarted => "match_started",
            EventKind::MoveMade => "move_made",
            EventKind::MatchFinished => "match_finished",
        }
    }
}

/// Sink for analytics events.
pub trait EventPublisher: Send + Sync {
    fn emit(&self, kind: EventKind, payload: Value);
}

/// Publishes events to the tracing log.
pub struct LogPublisher;

impl EventPublisher for LogPublisher {
    fn emit(&self, kind: EventKind, payload: Value) {
        info!(target: "fourline::analytics", event = kind.as_str(), %payload);
    }
}

/// Discards every event.
pub struct NullPublisher;

impl EventPublisher for NullPublisher {
    fn emit(&self, _kind: EventKind, _payload: Value) {}
}
