//! Move validation and execution.
//!
//! [`apply_move`] is the only path that mutates a [`BoardState`] during play.
//! Legality is checked in a fixed order: bounds, turn, then the phase rule
//! for the target cell. A rejected move leaves the board untouched.

use thiserror::Error;
use tracing::debug;

use crate::board::{idx, in_bounds, BoardState, Phase, Player, Point};
use crate::cascade::{self, CascadeReport};
use crate::constants::{DEPLOYMENT_STONES, EMPTY, N};

/// A request to play at `(x, y)`.
///
/// `player` may be left unset, in which case the move is made for whoever is
/// to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Move {
    pub x: usize,
    pub y: usize,
    pub player: Option<Player>,
}

impl Move {
    /// A move for the player to move.
    pub fn at(x: usize, y: usize) -> Self {
        Self { x, y, player: None }
    }

    /// A move asserting which player makes it.
    pub fn by(player: Player, x: usize, y: usize) -> Self {
        Self {
            x,
            y,
            player: Some(player),
        }
    }
}

impl From<Point> for Move {
    fn from((x, y): Point) -> Self {
        Move::at(x, y)
    }
}

/// Reasons a move is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoveError {
    #[error("Illegal move: ({x}, {y}) is off the board")]
    OutOfBounds { x: usize, y: usize },
    #[error("Illegal move: it is {mover}'s turn, not {requested}'s")]
    NotYourTurn { requested: Player, mover: Player },
    #[error("Illegal move: ({x}, {y}) is already occupied")]
    CellOccupied { x: usize, y: usize },
    #[error("Illegal move: ({x}, {y}) is not a stack of the mover")]
    InvalidTarget { x: usize, y: usize },
}

/// Result of a successful move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveOutcome {
    pub point: Point,
    pub player: Player,
    pub phase: Phase,
    /// Present for regular moves only; deployment never cascades.
    pub cascade: Option<CascadeReport>,
}

/// Check a move against the rules without playing it.
pub fn validate(state: &BoardState, mv: Move) -> Result<Player, MoveError> {
    let Move { x, y, player } = mv;
    if !in_bounds(x, y) {
        return Err(MoveError::OutOfBounds { x, y });
    }

    let mover = state.mover;
    let requested = player.unwrap_or(mover);
    if requested != mover {
        return Err(MoveError::NotYourTurn { requested, mover });
    }

    let value = state.cells[idx(x, y)];
    match state.phase() {
        Phase::Deployment if value != EMPTY => Err(MoveError::CellOccupied { x, y }),
        Phase::Regular if Player::owner_of(value) != Some(mover) => {
            Err(MoveError::InvalidTarget { x, y })
        }
        _ => Ok(mover),
    }
}

/// Play a move, resolving any cascade and passing the turn.
pub fn apply_move(state: &mut BoardState, mv: Move) -> Result<MoveOutcome, MoveError> {
    let mover = validate(state, mv)?;
    let (x, y) = (mv.x, mv.y);
    let phase = state.phase();

    let cascade = match phase {
        Phase::Deployment => {
            state.cells[idx(x, y)] = DEPLOYMENT_STONES * mover.sign();
            None
        }
        Phase::Regular => Some(cascade::resolve(state, x, y, mover)),
    };

    state.mover = mover.opponent();
    state.turn_count += 1;

    debug!(x, y, player = %mover, turn = state.turn_count, ?phase, "move applied");
    Ok(MoveOutcome {
        point: (x, y),
        player: mover,
        phase,
        cascade,
    })
}

/// Whether the player to move may play at `(x, y)`.
#[inline]
pub fn is_legal(state: &BoardState, (x, y): Point) -> bool {
    validate(state, Move::at(x, y)).is_ok()
}

/// All legal targets for the player to move, in row-major order.
pub fn legal_moves(state: &BoardState) -> Vec<Point> {
    let mut moves = Vec::with_capacity(N * N);
    for y in 0..N {
        for x in 0..N {
            if is_legal(state, (x, y)) {
                moves.push((x, y));
            }
        }
    }
    moves
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DEPLOYMENT_MOVES;

    fn regular_board(cells: &[((usize, usize), i8)], mover: Player) -> BoardState {
        let mut rows = [[0i8; N]; N];
        for &((x, y), v) in cells {
            rows[y][x] = v;
        }
        BoardState::from_rows(rows, mover, DEPLOYMENT_MOVES).unwrap()
    }

    #[test]
    fn test_deploy_first_move() {
        let mut board = BoardState::new();
        let outcome = apply_move(&mut board, Move::at(0, 0)).unwrap();
        assert_eq!(board.get(0, 0), Some(2));
        assert_eq!(board.mover(), Player::Negative);
        assert_eq!(board.turn_count(), 1);
        assert_eq!(outcome.phase, Phase::Deployment);
        assert!(outcome.cascade.is_none());
    }

    #[test]
    fn test_deploy_negative_sets_minus_two() {
        let mut board = BoardState::new();
        apply_move(&mut board, Move::at(0, 0)).unwrap();
        apply_move(&mut board, Move::by(Player::Negative, 5, 5)).unwrap();
        assert_eq!(board.get(5, 5), Some(-2));
    }

    #[test]
    fn test_out_of_bounds_checked_first() {
        let mut board = BoardState::new();
        let err = apply_move(&mut board, Move::by(Player::Negative, N, 0)).unwrap_err();
        assert_eq!(err, MoveError::OutOfBounds { x: N, y: 0 });
    }

    #[test]
    fn test_not_your_turn() {
        let mut board = BoardState::new();
        let err = apply_move(&mut board, Move::by(Player::Negative, 1, 1)).unwrap_err();
        assert_eq!(
            err,
            MoveError::NotYourTurn {
                requested: Player::Negative,
                mover: Player::Positive
            }
        );
        assert_eq!(board, BoardState::new());
    }

    #[test]
    fn test_deploy_on_occupied_cell() {
        let mut board = BoardState::new();
        apply_move(&mut board, Move::at(2, 2)).unwrap();
        let err = apply_move(&mut board, Move::at(2, 2)).unwrap_err();
        assert_eq!(err, MoveError::CellOccupied { x: 2, y: 2 });
        assert_eq!(board.turn_count(), 1);
    }

    #[test]
    fn test_regular_move_rejects_empty_and_opponent_cells() {
        let mut board = regular_board(&[((1, 1), 2), ((2, 2), -2)], Player::Positive);
        assert_eq!(
            apply_move(&mut board, Move::at(0, 0)).unwrap_err(),
            MoveError::InvalidTarget { x: 0, y: 0 }
        );
        assert_eq!(
            apply_move(&mut board, Move::at(2, 2)).unwrap_err(),
            MoveError::InvalidTarget { x: 2, y: 2 }
        );
        assert!(apply_move(&mut board, Move::at(1, 1)).is_ok());
        assert_eq!(board.get(1, 1), Some(3));
    }

    #[test]
    fn test_regular_move_detonates() {
        let mut board = regular_board(&[((3, 3), 3), ((3, 2), -1), ((7, 7), -2)], Player::Positive);
        let outcome = apply_move(&mut board, Move::at(3, 3)).unwrap();
        assert_eq!(board.get(3, 3), Some(0));
        assert_eq!(board.get(2, 3), Some(1));
        assert_eq!(board.get(3, 2), Some(2));
        assert_eq!(board.get(4, 3), Some(1));
        assert_eq!(board.get(3, 4), Some(1));
        assert_eq!(outcome.cascade.unwrap().detonations, vec![(3, 3)]);
        assert_eq!(board.mover(), Player::Negative);
        assert_eq!(board.turn_count(), DEPLOYMENT_MOVES + 1);
    }

    #[test]
    fn test_legal_moves_per_phase() {
        let board = BoardState::new();
        assert_eq!(legal_moves(&board).len(), N * N);

        let board = regular_board(&[((4, 1), -1), ((0, 5), 2), ((6, 0), 3)], Player::Positive);
        assert_eq!(legal_moves(&board), vec![(6, 0), (0, 5)]);
    }
}
