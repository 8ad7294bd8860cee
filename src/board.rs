//! Board representation: players, phases, and the grid of stacks.
//!
//! Each cell holds a signed stack size in `[-3, 3]`. The sign tells who owns
//! the stack (positive or negative player), the magnitude how many stones it
//! holds, and `0` is empty.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{CELLS, DEPLOYMENT_MOVES, EMPTY, MAX_MAGNITUDE, N};

/// A cell coordinate `(x, y)`; `x` is the column, `y` the row.
pub type Point = (usize, usize);

/// One of the two sides. Positive cell values belong to `Positive`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Player {
    Positive,
    Negative,
}

impl Player {
    /// `+1` for the positive player, `-1` for the negative one.
    #[inline]
    pub fn sign(self) -> i8 {
        match self {
            Player::Positive => 1,
            Player::Negative => -1,
        }
    }

    /// The other player.
    pub fn opponent(self) -> Player {
        match self {
            Player::Positive => Player::Negative,
            Player::Negative => Player::Positive,
        }
    }

    /// The owner of a cell value, or `None` for an empty cell.
    pub fn owner_of(value: i8) -> Option<Player> {
        match value.signum() {
            1 => Some(Player::Positive),
            -1 => Some(Player::Negative),
            _ => None,
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Player::Positive => write!(f, "positive"),
            Player::Negative => write!(f, "negative"),
        }
    }
}

/// Game phase, derived from the turn counter.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Players place fresh stacks of two on empty cells.
    Deployment,
    /// Players grow their own stacks.
    Regular,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoardError {
    #[error("cell ({x}, {y}) holds {value}, outside [-{max}, {max}]", max = MAX_MAGNITUDE)]
    InvalidCell { x: usize, y: usize, value: i8 },
}

/// The full game state: grid, player to move, and turn counter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BoardState {
    pub(crate) cells: [i8; CELLS],
    pub(crate) mover: Player,
    pub(crate) turn_count: u32,
}

impl Default for BoardState {
    fn default() -> Self {
        Self::new()
    }
}

impl BoardState {
    /// An empty board with the positive player to move.
    pub fn new() -> Self {
        Self {
            cells: [EMPTY; CELLS],
            mover: Player::Positive,
            turn_count: 0,
        }
    }

    /// Build a settled board from rows (`rows[y][x]`).
    ///
    /// Every value must lie in `[-3, 3]`.
    pub fn from_rows(
        rows: [[i8; N]; N],
        mover: Player,
        turn_count: u32,
    ) -> Result<Self, BoardError> {
        let mut cells = [EMPTY; CELLS];
        for (y, row) in rows.iter().enumerate() {
            for (x, &value) in row.iter().enumerate() {
                if value.abs() > MAX_MAGNITUDE {
                    return Err(BoardError::InvalidCell { x, y, value });
                }
                cells[idx(x, y)] = value;
            }
        }
        Ok(Self {
            cells,
            mover,
            turn_count,
        })
    }

    /// The value at `(x, y)`, or `None` when off the board.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Option<i8> {
        in_bounds(x, y).then(|| self.cells[idx(x, y)])
    }

    /// The player whose turn it is.
    pub fn mover(&self) -> Player {
        self.mover
    }

    /// Successful moves played so far.
    pub fn turn_count(&self) -> u32 {
        self.turn_count
    }

    /// Deployment for the first turns, regular play after.
    pub fn phase(&self) -> Phase {
        if self.turn_count < DEPLOYMENT_MOVES {
            Phase::Deployment
        } else {
            Phase::Regular
        }
    }

    /// A copy of the grid as rows (`rows[y][x]`), detached from the live board.
    pub fn rows(&self) -> [[i8; N]; N] {
        std::array::from_fn(|y| std::array::from_fn(|x| self.cells[idx(x, y)]))
    }

    /// Cell values in row-major order.
    pub fn cells(&self) -> &[i8; CELLS] {
        &self.cells
    }

    /// Iterate `((x, y), value)` in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (Point, i8)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .map(|(i, &value)| ((i % N, i / N), value))
    }
}

/// Index of `(x, y)` in the row-major cell array.
#[inline]
pub(crate) fn idx(x: usize, y: usize) -> usize {
    y * N + x
}

#[inline]
pub fn in_bounds(x: usize, y: usize) -> bool {
    x < N && y < N
}

/// Parse a coordinate string (e.g. "C5") into a Point.
///
/// The letter selects the column (`A` = x 0) and the number the row
/// (`1` = y 0). Returns `None` for malformed or off-board input.
pub fn parse_coord(s: &str) -> Option<Point> {
    let s = s.trim();
    let mut chars = s.chars();
    let col_char = chars.next()?.to_ascii_uppercase();
    if !col_char.is_ascii_uppercase() {
        return None;
    }
    let x = (col_char as u8 - b'A') as usize;
    let row: usize = chars.as_str().parse().ok()?;
    let y = row.checked_sub(1)?;
    in_bounds(x, y).then_some((x, y))
}

/// Convert a Point to a coordinate string (e.g. "C5").
pub fn str_coord((x, y): Point) -> String {
    let c = (b'A' + x as u8) as char;
    format!("{c}{}", y + 1)
}

impl fmt::Display for BoardState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "   ")?;
        for x in 0..N {
            write!(f, " {}", (b'A' + x as u8) as char)?;
        }
        writeln!(f)?;
        for y in 0..N {
            write!(f, "{:>2} ", y + 1)?;
            for x in 0..N {
                let value = self.cells[idx(x, y)];
                let ch = match value {
                    EMPTY => '.',
                    v if v > 0 => (b'0' + v as u8) as char,
                    v => (b'a' + (v.unsigned_abs() - 1)) as char,
                };
                write!(f, " {ch}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
