//! Per-match state: board, turn, terminal flags, move log.

use uuid::Uuid;

use crate::board::Board;
use crate::error::RuleError;
use crate::side::Side;

/// Opaque unique match identifier.
pub type MatchId = String;

/// Terminal result of a match.
///
/// `None` holds exactly while the match is unfinished. A draw shares
/// the wire value `0` with `None`; the `finished` flag disambiguates.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Winner {
    None,
    Side(Side),
    Draw,
}

impl Winner {
    /// Wire representation (`0` none/draw, `1` side A, `2` side B).
    pub fn as_u8(self) -> u8 {
        match self {
            Winner::None | Winner::Draw => 0,
            Winner::Side(s) => s.as_u8(),
        }
    }
}

/// One accepted move, in play order.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MoveRecord {
    pub side: Side,
    pub column: i32,
    pub row: usize,
}

/// What a call to [`MatchState::play`] did.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PlayOutcome {
    /// Row the disc landed in.
    pub row: usize,
    /// True when this move ended the match.
    pub finished: bool,
    /// Winner after this move (`Winner::None` while still in play).
    pub winner: Winner,
}

/// One in-progress or finished match.
///
/// Invariants:
/// - `winner` is `Winner::None` exactly while `finished` is false.
/// - `finished` never reverts to false.
/// - the turn flips exactly once per accepted move and never changes
///   after the match finishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchState {
    id: MatchId,
    board: Board,
    turn: Side,
    finished: bool,
    winner: Winner,
    moves: Vec<MoveRecord>,
}

impl MatchState {
    /// A fresh match with an empty board. Side A moves first.
    pub fn new() -> Self {
        MatchState {
            id: format!("g-{}", Uuid::new_v4().simple()),
            board: Board::new(),
            turn: Side::A,
            finished: false,
            winner: Winner::None,
            moves: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn turn(&self) -> Side {
        self.turn
    }

    pub fn finished(&self) -> bool {
        self.finished
    }

    pub fn winner(&self) -> Winner {
        self.winner
    }

    /// Accepted moves in play order.
    pub fn moves(&self) -> &[MoveRecord] {
        &self.moves
    }

    /// Validate and apply a move: the disc lands in the lowest empty
    /// row of `column` and the turn flips to the other side. Returns
    /// the landing row.
    ///
    /// Validation order: column range, turn, column capacity. On any
    /// error the board and turn are untouched.
    pub fn drop_disc(&mut self, column: i32, side: Side) -> Result<usize, RuleError> {
        if !(0..crate::board::COLS as i32).contains(&column) {
            return Err(RuleError::InvalidColumn);
        }
        if self.finished || side != self.turn {
            return Err(RuleError::WrongTurn);
        }
        let row = self
            .board
            .lowest_empty_row(column)
            .ok_or(RuleError::ColumnFull)?;
        self.board.place(row, column as usize, side);
        self.moves.push(MoveRecord { side, column, row });
        self.turn = side.other();
        Ok(row)
    }

    /// True iff the disc just placed at (row, col) for `side` completed
    /// a line of four or more.
    pub fn check_win(&self, row: usize, col: usize, side: Side) -> bool {
        self.board.completes_line(row, col, side)
    }

    /// True iff all 42 cells are occupied.
    pub fn is_full(&self) -> bool {
        self.board.is_full()
    }

    /// Mark the match finished with the given winner. Once finished the
    /// state is frozen; later calls are ignored.
    pub fn finish(&mut self, winner: Winner) {
        if !self.finished {
            self.finished = true;
            self.winner = winner;
        }
    }

    /// The complete move procedure shared by human and bot turns:
    /// apply the drop, then detect a win or a drawn full board and
    /// transition to the terminal state.
    pub fn play(&mut self, column: i32, side: Side) -> Result<PlayOutcome, RuleError> {
        let row = self.drop_disc(column, side)?;
        if self.check_win(row, column as usize, side) {
            self.finish(Winner::Side(side));
        } else if self.is_full() {
            self.finish(Winner::Draw);
        }
        Ok(PlayOutcome {
            row,
            finished: self.finished,
            winner: self.winner,
        })
    }
}

impl Default for MatchState {
    fn default() -> Self {
        MatchState::new()
    }
}
