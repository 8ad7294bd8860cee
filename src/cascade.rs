//! Overflow chain reactions.
//!
//! Adding a stone to a stack of three makes it detonate: the cell is emptied
//! and each orthogonal neighbor receives one stone from the same player,
//! capturing it first if the opponent owned it. Neighbors that reach the
//! threshold detonate in turn.
//!
//! Resolution uses an explicit stack of pending increments. Neighbors are
//! pushed in reverse so they pop in Left, Up, Right, Down order and each
//! neighbor's own chain completes before its next sibling is touched, which
//! is the depth-first order of the naive recursive formulation.

use thiserror::Error;
use tracing::{debug, error};

use crate::board::{idx, in_bounds, BoardState, Player, Point};
use crate::constants::{DELTA, DETONATION_THRESHOLD, EMPTY};

/// A stack found above the detonation threshold. The cell is reset to empty.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("internal invariant violation: cell ({x}, {y}) reached {value}")]
pub struct InvariantViolation {
    pub x: usize,
    pub y: usize,
    pub value: i8,
}

/// What happened while resolving one increment.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CascadeReport {
    /// Increments applied to in-bounds cells.
    pub increments: u32,
    /// Cells that reached the threshold, in detonation order.
    pub detonations: Vec<Point>,
    /// Opponent stacks converted to the mover.
    pub captures: u32,
    /// Cells that had to be reset because they overshot the threshold.
    pub violations: Vec<InvariantViolation>,
}

/// Add one stone for `mover` at `(x, y)` and resolve every resulting detonation.
pub fn resolve(state: &mut BoardState, x: usize, y: usize, mover: Player) -> CascadeReport {
    let mut report = CascadeReport::default();
    let mut pending: Vec<Point> = vec![(x, y)];

    while let Some((cx, cy)) = pending.pop() {
        if !in_bounds(cx, cy) {
            continue;
        }
        let i = idx(cx, cy);
        report.increments += 1;

        // Capture before incrementing so the stack keeps its size.
        if Player::owner_of(state.cells[i]) == Some(mover.opponent()) {
            state.cells[i] = -state.cells[i];
            report.captures += 1;
        }
        state.cells[i] += mover.sign();

        let amount = state.cells[i].abs();
        if amount < DETONATION_THRESHOLD {
            continue;
        }
        if amount > DETONATION_THRESHOLD {
            let violation = InvariantViolation {
                x: cx,
                y: cy,
                value: state.cells[i],
            };
            error!(%violation, "resetting cell");
            state.cells[i] = EMPTY;
            report.violations.push(violation);
            continue;
        }

        state.cells[i] = EMPTY;
        report.detonations.push((cx, cy));
        for &(dx, dy) in DELTA.iter().rev() {
            // Wrapping keeps off-board neighbors off the board.
            let nx = cx.wrapping_add_signed(dx);
            let ny = cy.wrapping_add_signed(dy);
            pending.push((nx, ny));
        }
    }

    debug!(
        x,
        y,
        increments = report.increments,
        detonations = report.detonations.len(),
        captures = report.captures,
        "cascade resolved"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{MAX_MAGNITUDE, N};

    fn board_with(cells: &[((usize, usize), i8)]) -> BoardState {
        let mut rows = [[0i8; N]; N];
        for &((x, y), v) in cells {
            rows[y][x] = v;
        }
        BoardState::from_rows(rows, Player::Positive, 6).unwrap()
    }

    #[test]
    fn test_increment_below_threshold_settles() {
        let mut board = board_with(&[((2, 2), 2)]);
        let report = resolve(&mut board, 2, 2, Player::Positive);
        assert_eq!(board.get(2, 2), Some(3));
        assert_eq!(report.increments, 1);
        assert!(report.detonations.is_empty());
    }

    #[test]
    fn test_detonation_feeds_four_neighbors() {
        let mut board = board_with(&[((3, 3), 3), ((2, 3), -2), ((3, 4), 1)]);
        let report = resolve(&mut board, 3, 3, Player::Positive);
        assert_eq!(board.get(3, 3), Some(0));
        assert_eq!(board.get(2, 3), Some(3)); // captured then grown
        assert_eq!(board.get(3, 2), Some(1));
        assert_eq!(board.get(4, 3), Some(1));
        assert_eq!(board.get(3, 4), Some(2));
        assert_eq!(report.detonations, vec![(3, 3)]);
        assert_eq!(report.captures, 1);
        assert_eq!(report.increments, 5);
    }

    #[test]
    fn test_corner_detonation_drops_off_board_stones() {
        let mut board = board_with(&[((0, 0), -3)]);
        let report = resolve(&mut board, 0, 0, Player::Negative);
        assert_eq!(board.get(0, 0), Some(0));
        assert_eq!(board.get(1, 0), Some(-1));
        assert_eq!(board.get(0, 1), Some(-1));
        assert_eq!(report.increments, 3);
    }

    #[test]
    fn test_chain_reaction_in_cascade_order() {
        // (1,1) detonates; its left neighbor (0,1) detonates next and feeds (1,1) again
        // before (1,0) is touched.
        let mut board = board_with(&[((1, 1), 3), ((0, 1), 3), ((1, 0), 3)]);
        let report = resolve(&mut board, 1, 1, Player::Positive);
        assert_eq!(report.detonations[0], (1, 1));
        assert_eq!(report.detonations[1], (0, 1));
        assert!(board.cells().iter().all(|v| v.abs() <= MAX_MAGNITUDE));
    }

    #[test]
    fn test_full_board_cascade_terminates() {
        let mut board = BoardState::from_rows([[3i8; N]; N], Player::Positive, 6).unwrap();
        let report = resolve(&mut board, 3, 4, Player::Positive);
        assert!(!report.detonations.is_empty());
        assert!(board.cells().iter().all(|v| v.abs() <= MAX_MAGNITUDE));
        assert!(board.cells().iter().all(|&v| v >= 0));
        assert!(report.violations.is_empty());
    }

    #[test]
    fn test_capture_flips_whole_board() {
        let mut board = BoardState::from_rows([[-3i8; N]; N], Player::Positive, 6).unwrap();
        board.cells[idx(0, 0)] = 3;
        resolve(&mut board, 0, 0, Player::Positive);
        assert!(board.cells().iter().all(|&v| v >= 0));
    }

    #[test]
    fn test_overshoot_is_reset_and_reported() {
        let mut board = BoardState::new();
        board.cells[idx(4, 4)] = 4;
        let report = resolve(&mut board, 4, 4, Player::Positive);
        assert_eq!(board.get(4, 4), Some(0));
        assert_eq!(report.violations, vec![InvariantViolation { x: 4, y: 4, value: 5 }]);
        assert!(report.detonations.is_empty());
    }

    #[test]
    fn test_off_board_increment_is_noop() {
        let mut board = BoardState::new();
        let report = resolve(&mut board, N, 0, Player::Positive);
        assert_eq!(report, CascadeReport::default());
        assert_eq!(board, BoardState::new());
    }
}
