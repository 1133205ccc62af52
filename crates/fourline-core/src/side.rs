//! Side (player A / player B) within a match.

/// One of the two disc colors in a match.
///
/// Side A always moves first. On the wire, A is `1` and B is `2`
/// (`0` is an empty cell).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Side {
    A,
    B,
}

impl Side {
    /// The opposing side.
    pub fn other(self) -> Side {
        match self {
            Side::A => Side::B,
            Side::B => Side::A,
        }
    }

    /// Wire representation (`1` / `2`).
    pub fn as_u8(self) -> u8 {
        match self {
            Side::A => 1,
            Side::B => 2,
        }
    }

    /// Parse from the wire representation. `0` and anything else is `None`.
    pub fn from_u8(v: u8) -> Option<Side> {
        match v {
            1 => Some(Side::A),
            2 => Some(Side::B),
            _ => None,
        }
    }
}
