//! Terminal-state detection and scoring.

use crate::board::{BoardState, Player};
use crate::constants::DEPLOYMENT_MOVES;

/// Outcome of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameResult {
    InProgress,
    Won(Player),
}

/// The game ends once deployment is over and one side has no stacks left.
pub fn is_terminal(state: &BoardState) -> bool {
    if state.turn_count() < DEPLOYMENT_MOVES {
        return false;
    }
    let (positive, negative) = stone_totals(state);
    !(positive > 0 && negative > 0)
}

/// Owner of the first occupied cell in row-major order.
///
/// Only meaningful on a terminal board, where at most one owner remains.
pub fn winner(state: &BoardState) -> Option<Player> {
    state.cells().iter().find_map(|&v| Player::owner_of(v))
}

pub fn result(state: &BoardState) -> GameResult {
    match (is_terminal(state), winner(state)) {
        (true, Some(player)) => GameResult::Won(player),
        _ => GameResult::InProgress,
    }
}

/// Stones held by the positive and the negative player.
pub fn stone_totals(state: &BoardState) -> (u32, u32) {
    state.cells().iter().fold((0, 0), |(pos, neg), &v| match v.signum() {
        1 => (pos + v as u32, neg),
        -1 => (pos, neg + v.unsigned_abs() as u32),
        _ => (pos, neg),
    })
}

/// Total stones on the board.
pub fn points(state: &BoardState) -> u32 {
    let (pos, neg) = stone_totals(state);
    pos + neg
}

/// Stone differential from `player`'s side.
pub fn score_differential(state: &BoardState, player: Player) -> i32 {
    let (pos, neg) = stone_totals(state);
    let diff = pos as i32 - neg as i32;
    diff * player.sign() as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::N;

    fn board(cells: &[((usize, usize), i8)], turn: u32) -> BoardState {
        let mut rows = [[0i8; N]; N];
        for &((x, y), v) in cells {
            rows[y][x] = v;
        }
        BoardState::from_rows(rows, Player::Positive, turn).unwrap()
    }

    #[test]
    fn test_never_terminal_during_deployment() {
        for turn in 0..DEPLOYMENT_MOVES {
            let b = board(&[((0, 0), 2)], turn);
            assert!(!is_terminal(&b));
            assert_eq!(result(&b), GameResult::InProgress);
        }
    }

    #[test]
    fn test_terminal_when_one_sign_left() {
        let b = board(&[((0, 0), 2), ((5, 5), 3)], DEPLOYMENT_MOVES);
        assert!(is_terminal(&b));
        assert_eq!(winner(&b), Some(Player::Positive));
        assert_eq!(result(&b), GameResult::Won(Player::Positive));

        let b = board(&[((0, 0), 2), ((5, 5), -3)], DEPLOYMENT_MOVES + 3);
        assert!(!is_terminal(&b));
    }

    #[test]
    fn test_empty_terminal_board_has_no_winner() {
        let b = board(&[], DEPLOYMENT_MOVES);
        assert!(is_terminal(&b));
        assert_eq!(winner(&b), None);
        assert_eq!(result(&b), GameResult::InProgress);
    }

    #[test]
    fn test_scoring() {
        let b = board(&[((0, 0), 2), ((1, 0), 3), ((4, 4), -1)], DEPLOYMENT_MOVES);
        assert_eq!(stone_totals(&b), (5, 1));
        assert_eq!(points(&b), 6);
        assert_eq!(score_differential(&b, Player::Positive), 4);
        assert_eq!(score_differential(&b, Player::Negative), -4);
    }
}
