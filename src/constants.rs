//! Constants for board dimensions, game rules, and AI parameters.
//!
//! The board is a fixed `N x N` grid addressed as `(x, y)` with `x` the column
//! and `y` the row. Cells are stored row-major.
//!
//! The detonation threshold and the deployment stack size are fixed rules of
//! the game, not tuning knobs.

// =============================================================================
// Board Geometry
// =============================================================================

/// Board size (NxN).
pub const N: usize = 8;

/// Number of cells on the board.
pub const CELLS: usize = N * N;

// =============================================================================
// Game Rules
// =============================================================================

/// Number of opening turns in which players place fresh stacks (three each).
pub const DEPLOYMENT_MOVES: u32 = 6;

/// Magnitude of every stack placed during deployment.
pub const DEPLOYMENT_STONES: i8 = 2;

/// Magnitude at which a stack detonates.
pub const DETONATION_THRESHOLD: i8 = 4;

/// Largest magnitude a settled cell may hold.
pub const MAX_MAGNITUDE: i8 = DETONATION_THRESHOLD - 1;

/// Largest number of stones the board can hold when settled.
pub const MAX_STONES: u32 = (CELLS as u32) * (MAX_MAGNITUDE as u32);

/// Empty cell value.
pub const EMPTY: i8 = 0;

// =============================================================================
// Neighbor Offsets
// =============================================================================

/// Offsets `(dx, dy)` to the orthogonal neighbors, in cascade order.
/// Order: Left, Up, Right, Down
pub const DELTA: [(isize, isize); 4] = [
    (-1, 0), // Left
    (0, -1), // Up
    (1, 0),  // Right
    (0, 1),  // Down
];

// =============================================================================
// State Encoding
// =============================================================================

/// Bits used to encode one cell in a key.
pub const CELL_BITS: u32 = 3;

/// Cell code for a neighborhood position that falls off the board.
pub const OFF_BOARD_CODE: u32 = 7;

/// Cells packed into each word of a [`BoardKey`](crate::encoder::BoardKey).
pub const CELLS_PER_WORD: usize = 21;

/// Words in a [`BoardKey`](crate::encoder::BoardKey).
pub const BOARD_KEY_WORDS: usize = CELLS.div_ceil(CELLS_PER_WORD);

// =============================================================================
// Heuristic Network
// =============================================================================

/// Aggregate features appended after the per-cell inputs.
pub const AGGREGATE_FEATURES: usize = 6;

/// Network input width: one input per cell plus the aggregates.
pub const ANN_INPUTS: usize = CELLS + AGGREGATE_FEATURES;

/// Hidden layer width.
pub const ANN_HIDDEN: usize = 12;

/// Total parameter count (weights and biases of both layers).
pub const ANN_PARAMETERS: usize = (ANN_INPUTS + 1) * ANN_HIDDEN + ANN_HIDDEN + 1;

/// Range of the uniform initialization of fresh network weights.
pub const ANN_INIT_RANGE: f64 = 0.5;

/// Score given to a position the evaluating player has already won.
pub const WIN_SCORE: f64 = 1.0e6;

// =============================================================================
// Differential Evolution Parameters
// =============================================================================

/// Number of weight vectors in the population.
pub const DE_POPULATION: usize = 8;

/// Differential weight.
pub const DE_F: f64 = 0.5;

/// Crossover probability.
pub const DE_CR: f64 = 0.9;

// =============================================================================
// Training
// =============================================================================

/// Default number of self-play games for the `train` command.
pub const TRAIN_GAMES: usize = 100;

/// Safety limit on turns in a self-play game.
pub const MAX_GAME_LEN: u32 = 2_000;
