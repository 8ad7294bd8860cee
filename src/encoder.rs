//! State encoding for the coefficient table.
//!
//! ## Board keys
//! [`BoardKey`] packs a whole board and its mover into four `u64` words,
//! 3 bits per cell (`value + 3`), 21 cells per word. The mover sits in the top
//! bit of the last word. The encoding is lossless, so distinct boards never
//! share a key.
//!
//! ## Neighborhood keys
//! [`NeighborhoodKey`] describes the 3x3 window around a candidate cell as seen
//! by the player to move: values are multiplied by the mover's sign so "mine"
//! is always positive. Off-board positions use code 7 and bit 27 flags the
//! deployment phase. The window is canonicalised over its 8 rotations and
//! reflections, keeping the smallest code, so symmetric situations share one
//! table entry.
//!
//! Window layout (index into the 9-cell array):
//! ```text
//! 0 1 2
//! 3 4 5
//! 6 7 8
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::board::{BoardState, Phase, Player, Point};
use crate::constants::{
    BOARD_KEY_WORDS, CELLS, CELLS_PER_WORD, CELL_BITS, MAX_MAGNITUDE, N, OFF_BOARD_CODE,
};

const CELL_MASK: u64 = (1 << CELL_BITS) - 1;
const MOVER_BIT: u64 = 1 << 63;
const WINDOW: usize = 9;
const DEPLOYMENT_BIT: u32 = 1 << (WINDOW as u32 * CELL_BITS);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("cell {index} has code {code}, which is not a stack size")]
    InvalidCode { index: usize, code: u64 },
    #[error("unused key bits are set")]
    StrayBits,
}

/// Lossless key for a whole board plus the player to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BoardKey(pub [u64; BOARD_KEY_WORDS]);

/// Canonical key for the 3x3 neighborhood of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NeighborhoodKey(pub u32);

/// A decoded neighborhood: mover-relative values, `None` where off the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Neighborhood {
    pub cells: [Option<i8>; WINDOW],
    pub deployment: bool,
}

/// Encode a board and its mover.
pub fn encode_board(state: &BoardState) -> BoardKey {
    let mut words = [0u64; BOARD_KEY_WORDS];
    for (i, &value) in state.cells().iter().enumerate() {
        let code = (value + MAX_MAGNITUDE) as u64;
        words[i / CELLS_PER_WORD] |= code << ((i % CELLS_PER_WORD) as u32 * CELL_BITS);
    }
    if state.mover() == Player::Negative {
        words[BOARD_KEY_WORDS - 1] |= MOVER_BIT;
    }
    BoardKey(words)
}

/// Recover the rows (`rows[y][x]`) and mover from a [`BoardKey`].
pub fn decode_board(key: &BoardKey) -> Result<([[i8; N]; N], Player), DecodeError> {
    let mut words = key.0;
    let mover = if words[BOARD_KEY_WORDS - 1] & MOVER_BIT != 0 {
        words[BOARD_KEY_WORDS - 1] &= !MOVER_BIT;
        Player::Negative
    } else {
        Player::Positive
    };

    let mut rows = [[0i8; N]; N];
    for i in 0..CELLS {
        let shift = (i % CELLS_PER_WORD) as u32 * CELL_BITS;
        let word = &mut words[i / CELLS_PER_WORD];
        let code = (*word >> shift) & CELL_MASK;
        *word &= !(CELL_MASK << shift);
        if code > 2 * MAX_MAGNITUDE as u64 {
            return Err(DecodeError::InvalidCode { index: i, code });
        }
        rows[i / N][i % N] = code as i8 - MAX_MAGNITUDE;
    }
    if words.iter().any(|&w| w != 0) {
        return Err(DecodeError::StrayBits);
    }
    Ok((rows, mover))
}

/// Encode the neighborhood of `(x, y)` from the mover's point of view.
pub fn encode_neighborhood(state: &BoardState, (x, y): Point) -> NeighborhoodKey {
    let sign = state.mover().sign();
    let mut window = [OFF_BOARD_CODE as u8; WINDOW];
    for (i, slot) in window.iter_mut().enumerate() {
        let nx = x.wrapping_add(i % 3).wrapping_sub(1);
        let ny = y.wrapping_add(i / 3).wrapping_sub(1);
        if let Some(value) = state.get(nx, ny) {
            *slot = (value * sign + MAX_MAGNITUDE) as u8;
        }
    }
    let deployment = state.phase() == Phase::Deployment;
    NeighborhoodKey(canonical_code(&window, deployment))
}

/// Recover the canonical window from a [`NeighborhoodKey`].
pub fn decode_neighborhood(key: NeighborhoodKey) -> Result<Neighborhood, DecodeError> {
    let code = key.0;
    if code & !(DEPLOYMENT_BIT | (DEPLOYMENT_BIT - 1)) != 0 {
        return Err(DecodeError::StrayBits);
    }
    let mut cells = [None; WINDOW];
    for (i, cell) in cells.iter_mut().enumerate() {
        let c = (code >> (i as u32 * CELL_BITS)) & CELL_MASK as u32;
        *cell = match c {
            OFF_BOARD_CODE => None,
            c => Some(c as i8 - MAX_MAGNITUDE),
        };
    }
    Ok(Neighborhood {
        cells,
        deployment: code & DEPLOYMENT_BIT != 0,
    })
}

/// Smallest code over all rotations and reflections of the window.
fn canonical_code(window: &[u8; WINDOW], deployment: bool) -> u32 {
    let mut src = *window;
    let mut best = u32::MAX;
    for _ in 0..4 {
        best = best.min(compute_code(&src));
        let mut flipped = src;
        horizflip(&mut flipped);
        best = best.min(compute_code(&flipped));
        rot90(&mut src);
    }
    if deployment { best | DEPLOYMENT_BIT } else { best }
}

fn compute_code(window: &[u8; WINDOW]) -> u32 {
    window
        .iter()
        .enumerate()
        .fold(0, |acc, (i, &c)| acc | (c as u32) << (i as u32 * CELL_BITS))
}

/// Horizontal flip (top row <-> bottom row).
fn horizflip(src: &mut [u8; WINDOW]) {
    src.swap(0, 6);
    src.swap(1, 7);
    src.swap(2, 8);
}

/// 90-degree rotation.
fn rot90(src: &mut [u8; WINDOW]) {
    let t = src[0];
    src[0] = src[2];
    src[2] = src[8];
    src[8] = src[6];
    src[6] = t;

    let t = src[1];
    src[1] = src[5];
    src[5] = src[7];
    src[7] = src[3];
    src[3] = t;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DEPLOYMENT_MOVES;

    fn board(cells: &[((usize, usize), i8)], mover: Player, turn: u32) -> BoardState {
        let mut rows = [[0i8; N]; N];
        for &((x, y), v) in cells {
            rows[y][x] = v;
        }
        BoardState::from_rows(rows, mover, turn).unwrap()
    }

    #[test]
    fn test_board_key_roundtrip() {
        let b = board(&[((0, 0), -3), ((7, 7), 3), ((3, 5), 1)], Player::Negative, 9);
        let key = encode_board(&b);
        let (rows, mover) = decode_board(&key).unwrap();
        assert_eq!(rows, b.rows());
        assert_eq!(mover, Player::Negative);
        let decoded = BoardState::from_rows(rows, mover, 9).unwrap();
        assert_eq!(encode_board(&decoded), key);
    }

    #[test]
    fn test_board_keys_distinguish_single_cell_changes() {
        let base = board(&[((2, 2), 2)], Player::Positive, 7);
        let base_key = encode_board(&base);
        for i in 0..CELLS {
            for value in [-3i8, -1, 1, 3] {
                let mut rows = base.rows();
                if rows[i / N][i % N] == value {
                    continue;
                }
                rows[i / N][i % N] = value;
                let other = BoardState::from_rows(rows, Player::Positive, 7).unwrap();
                assert_ne!(encode_board(&other), base_key, "collision at cell {i}");
            }
        }
        let flipped = board(&[((2, 2), 2)], Player::Negative, 7);
        assert_ne!(encode_board(&flipped), base_key);
    }

    #[test]
    fn test_decode_board_rejects_invalid_code() {
        let mut key = encode_board(&BoardState::new());
        key.0[0] |= 7;
        assert_eq!(
            decode_board(&key),
            Err(DecodeError::InvalidCode { index: 0, code: 7 })
        );

        let mut key = encode_board(&BoardState::new());
        key.0[3] |= 1 << 40;
        assert_eq!(decode_board(&key), Err(DecodeError::StrayBits));
    }

    #[test]
    fn test_neighborhood_is_mover_relative() {
        let pos = board(&[((3, 3), 2), ((4, 3), -1)], Player::Positive, DEPLOYMENT_MOVES);
        let neg = board(&[((3, 3), -2), ((4, 3), 1)], Player::Negative, DEPLOYMENT_MOVES);
        assert_eq!(encode_neighborhood(&pos, (3, 3)), encode_neighborhood(&neg, (3, 3)));
    }

    #[test]
    fn test_neighborhood_symmetries_share_a_key() {
        let right = board(&[((3, 3), 2), ((4, 3), -1)], Player::Positive, DEPLOYMENT_MOVES);
        let up = board(&[((3, 3), 2), ((3, 2), -1)], Player::Positive, DEPLOYMENT_MOVES);
        let diagonal = board(&[((3, 3), 2), ((4, 4), -1)], Player::Positive, DEPLOYMENT_MOVES);
        let k = encode_neighborhood(&right, (3, 3));
        assert_eq!(k, encode_neighborhood(&up, (3, 3)));
        assert_ne!(k, encode_neighborhood(&diagonal, (3, 3)));
    }

    #[test]
    fn test_corner_and_phase_change_the_key() {
        let b = BoardState::new();
        let corner = encode_neighborhood(&b, (0, 0));
        let center = encode_neighborhood(&b, (4, 4));
        assert_ne!(corner, center);
        assert_ne!(corner.0 & DEPLOYMENT_BIT, 0);

        let decoded = decode_neighborhood(corner).unwrap();
        assert!(decoded.deployment);
        assert_eq!(decoded.cells[4], Some(0));
        assert_eq!(decoded.cells.iter().filter(|c| c.is_none()).count(), 5);
    }

    #[test]
    fn test_neighborhood_roundtrip_is_canonical() {
        let b = board(
            &[((1, 1), 3), ((2, 1), -2), ((1, 2), 1)],
            Player::Positive,
            DEPLOYMENT_MOVES,
        );
        let key = encode_neighborhood(&b, (1, 1));
        let decoded = decode_neighborhood(key).unwrap();
        let window: [u8; WINDOW] = std::array::from_fn(|i| match decoded.cells[i] {
            Some(v) => (v + MAX_MAGNITUDE) as u8,
            None => OFF_BOARD_CODE as u8,
        });
        assert_eq!(canonical_code(&window, decoded.deployment), key.0);
        assert!(!decoded.deployment);
        assert_eq!(decoded.cells[4], Some(3));
    }

    #[test]
    fn test_rot90_four_times_is_identity() {
        let mut src: [u8; WINDOW] = [0, 1, 2, 3, 4, 5, 6, 7, 0];
        let orig = src;
        for _ in 0..4 {
            rot90(&mut src);
        }
        assert_eq!(src, orig);
    }
}
