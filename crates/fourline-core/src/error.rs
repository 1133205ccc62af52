//! Rule errors for in-match moves.
//!
//! All three are recoverable and local to the offending request: the
//! match stays open and neither the board nor the turn changes. The
//! `Display` strings are exactly what clients receive in error replies.

use thiserror::Error;

/// A rejected move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RuleError {
    /// Column index outside `[0, 6]`.
    #[error("invalid column")]
    InvalidColumn,

    /// The column has no empty cell left.
    #[error("column full")]
    ColumnFull,

    /// Move attempted by the side not currently to move, or after the
    /// match finished.
    #[error("not your turn")]
    WrongTurn,
}
