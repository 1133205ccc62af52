//! fourline-core
//!
//! Pure Connect-Four game logic:
//! - sides and winners
//! - board grid with placement and win detection
//! - per-match state (turn, finished flag, move log)
//! - the heuristic automated opponent

pub mod bot;
pub mod board;
pub mod error;
pub mod match_state;
pub mod side;

pub use board::{Board, COLS, ROWS};
pub use error::RuleError;
pub use match_state::{MatchId, MatchState, MoveRecord, PlayOutcome, Winner};
pub use side::Side;
