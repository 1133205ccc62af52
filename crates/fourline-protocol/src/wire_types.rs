//! Wire message shapes.
//!
//! Outbound messages carry the full match snapshot so clients never
//! need incremental patching; an invalid move gets an error object
//! instead. Both shapes are plain JSON objects with no type tag, which
//! is why [`ServerReply`] serializes untagged.

use serde::{Deserialize, Serialize};

use fourline_core::{MatchState, Side, COLS, ROWS};

/// A parsed inbound client request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCommand {
    /// Drop a disc into the given column.
    Drop { column: i32 },
}

/// Raw inbound frame as clients send it. Any frame whose `action` is
/// not a known command is ignored by the server, so every field is
/// optional here and interpretation happens in the codec.
#[derive(Debug, Deserialize)]
pub struct ClientFrame {
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub column: Option<i32>,
}

/// Outbound message: either a snapshot or an error.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ServerReply {
    State(MatchSnapshot),
    Error(ErrorReply),
}

/// Full state of one match as sent to clients.
///
/// Cells, `turn` and `winner` use the numeric encoding `0` empty /
/// none, `1` side A, `2` side B. Row 0 is the bottom row. A drawn
/// match has `finished: true` with `winner: 0`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MatchSnapshot {
    pub id: String,
    pub board: [[u8; COLS]; ROWS],
    pub turn: u8,
    pub finished: bool,
    pub winner: u8,
}

impl From<&MatchState> for MatchSnapshot {
    fn from(state: &MatchState) -> Self {
        let mut board = [[0u8; COLS]; ROWS];
        for (row, cells) in board.iter_mut().enumerate() {
            for (col, cell) in cells.iter_mut().enumerate() {
                *cell = state.board().cell(row, col).map(Side::as_u8).unwrap_or(0);
            }
        }
        MatchSnapshot {
            id: state.id().to_string(),
            board,
            turn: state.turn().as_u8(),
            finished: state.finished(),
            winner: state.winner().as_u8(),
        }
    }
}

/// Error object sent only to the connection whose request failed.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ErrorReply {
    pub error: String,
}

impl ServerReply {
    pub fn state(state: &MatchState) -> Self {
        ServerReply::State(MatchSnapshot::from(state))
    }

    pub fn error(message: impl Into<String>) -> Self {
        ServerReply::Error(ErrorReply {
            error: message.into(),
        })
    }
}
