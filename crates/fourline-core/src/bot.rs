//! The automated opponent.
//!
//! A single-ply lookahead, not a search: O(columns) board copies per
//! call, in strict priority order:
//!
//! 1. take a winning column if one exists,
//! 2. else block a column the other side would win with,
//! 3. else the first open column in center-biased preference order,
//! 4. else column 0 as a defined fallback (unreachable on an
//!    unfinished match).
//!
//! The caller's board is never mutated; trial moves run on a private
//! copy.

use crate::board::{Board, COLS};
use crate::side::Side;

/// Center-biased column preference used when neither side has an
/// immediate win.
const PREFERRED: [i32; COLS] = [3, 2, 4, 1, 5, 0, 6];

/// Pick a column for `own` to play on `board`. The returned column is
/// legal whenever any column is.
pub fn choose_column(board: &Board, own: Side) -> i32 {
    if let Some(col) = winning_column(board, own) {
        return col;
    }
    if let Some(col) = winning_column(board, own.other()) {
        return col;
    }
    for col in PREFERRED {
        if board.lowest_empty_row(col).is_some() {
            return col;
        }
    }
    0
}

/// The leftmost column where placing a disc for `side` completes a
/// line, if any.
fn winning_column(board: &Board, side: Side) -> Option<i32> {
    let mut trial = board.clone();
    for col in 0..COLS as i32 {
        if let Some(row) = trial.lowest_empty_row(col) {
            trial.place(row, col as usize, side);
            let wins = trial.completes_line(row, col as usize, side);
            trial.clear(row, col as usize);
            if wins {
                return Some(col);
            }
        }
    }
    None
}
