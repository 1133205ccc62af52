//! Shared types for the match server.
//!
//! This module defines:
//! - the automated opponent's reserved identity
//! - outbound channel aliases between the coordinator and connections
//! - the connection and forfeit-timer table shapes

use std::collections::HashMap;

use fourline_core::MatchId;
use fourline_protocol::ServerReply;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Reserved identity of the automated opponent.
///
/// It may participate in many matches at once and never holds a
/// player-to-match binding or a leaderboard row.
pub const BOT_NAME: &str = "bot";

/// A player identity (the `username` query parameter).
pub type PlayerName = String;

/// Outbound replies from the coordinator to one connection.
pub type OutboundTx = mpsc::UnboundedSender<ServerReply>;
pub type OutboundRx = mpsc::UnboundedReceiver<ServerReply>;

/// Live connections: match -> player -> outbound channel.
///
/// At most one live connection exists per (match, player) pair; a new
/// connection for the same pair replaces the previous sender.
pub type ConnTable = HashMap<MatchId, HashMap<PlayerName, OutboundTx>>;

/// Pending disconnect-forfeit timers keyed by (match, player).
///
/// An entry exists only while that pairing has no live connection and
/// the match is unfinished; reconnecting aborts and removes it.
pub type TimerTable = HashMap<(MatchId, PlayerName), JoinHandle<()>>;
