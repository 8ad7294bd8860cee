//! Computer move selection.
//!
//! Three difficulty tiers share one entry point, [`AiStrategist::select_move`]:
//!
//! - [`Tier::Easy`] - uniform random choice among legal targets
//! - [`Tier::Normal`] - highest coefficient-table weight of the target's
//!   neighborhood; unknown neighborhoods weigh 0
//! - [`Tier::Hard`] - plays every candidate on a scratch board, cascade
//!   included, and keeps the best heuristic score
//!
//! Ties go to the first candidate in row-major order. The strategist never
//! touches the live board; the caller applies the returned point.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::thread::JoinHandle;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, trace};

use crate::board::{BoardState, Player, Point};
use crate::coefficients::CoefficientStore;
use crate::encoder::encode_neighborhood;
use crate::engine::{apply_move, legal_moves, Move};
use crate::heuristic::HeuristicEvaluator;

/// AI difficulty.
#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    #[default]
    Easy,
    Normal,
    Hard,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Easy => write!(f, "easy"),
            Tier::Normal => write!(f, "normal"),
            Tier::Hard => write!(f, "hard"),
        }
    }
}

impl FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "easy" => Ok(Tier::Easy),
            "normal" => Ok(Tier::Normal),
            "hard" => Ok(Tier::Hard),
            other => Err(format!("unknown tier: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AiError {
    #[error("no legal move for {0}")]
    Stalemate(Player),
}

/// Selects moves for the computer player.
pub struct AiStrategist {
    store: Arc<CoefficientStore>,
    evaluator: Arc<HeuristicEvaluator>,
    rng: fastrand::Rng,
    /// Hard tier plays the vector under trial instead of the champion.
    training: bool,
}

impl AiStrategist {
    /// Create a new strategist with an entropy-seeded RNG.
    pub fn new(store: Arc<CoefficientStore>, evaluator: Arc<HeuristicEvaluator>) -> Self {
        Self {
            store,
            evaluator,
            rng: fastrand::Rng::new(),
            training: false,
        }
    }

    /// A strategist whose random choices are reproducible.
    pub fn with_seed(
        store: Arc<CoefficientStore>,
        evaluator: Arc<HeuristicEvaluator>,
        seed: u64,
    ) -> Self {
        Self {
            store,
            evaluator,
            rng: fastrand::Rng::with_seed(seed),
            training: false,
        }
    }

    pub fn store(&self) -> &Arc<CoefficientStore> {
        &self.store
    }

    pub fn evaluator(&self) -> &Arc<HeuristicEvaluator> {
        &self.evaluator
    }

    /// Switch the hard tier between the champion and the vector under trial.
    pub fn set_training(&mut self, training: bool) {
        self.training = training;
    }

    pub fn is_training(&self) -> bool {
        self.training
    }

    /// Pick a legal target for the player to move.
    pub fn select_move(&mut self, state: &BoardState, tier: Tier) -> Result<Point, AiError> {
        let candidates = legal_moves(state);
        if candidates.is_empty() {
            return Err(AiError::Stalemate(state.mover()));
        }

        let choice = match tier {
            Tier::Easy => candidates[self.rng.usize(..candidates.len())],
            Tier::Normal => self.select_lookup(state, &candidates),
            Tier::Hard => self.select_heuristic(state, &candidates),
        };
        debug!(%tier, x = choice.0, y = choice.1, candidates = candidates.len(), "AI chose move");
        Ok(choice)
    }

    /// Run [`select_move`](Self::select_move) on a worker thread over a copy of `state`.
    pub fn spawn_select(
        &mut self,
        state: BoardState,
        tier: Tier,
    ) -> JoinHandle<Result<Point, AiError>> {
        let mut worker = AiStrategist::with_seed(
            Arc::clone(&self.store),
            Arc::clone(&self.evaluator),
            self.rng.u64(..),
        );
        worker.training = self.training;
        std::thread::spawn(move || worker.select_move(&state, tier))
    }

    fn select_lookup(&self, state: &BoardState, candidates: &[Point]) -> Point {
        let table = self.store.reader();
        first_best(candidates, |pt| {
            let key = encode_neighborhood(state, pt);
            table.weight(key) as f64
        })
    }

    fn select_heuristic(&self, state: &BoardState, candidates: &[Point]) -> Point {
        let mover = state.mover();
        let scorer = if self.training {
            self.evaluator.training_scorer()
        } else {
            self.evaluator.scorer()
        };
        first_best(candidates, |(x, y)| {
            let mut scratch = state.clone();
            match apply_move(&mut scratch, Move::by(mover, x, y)) {
                Ok(_) => {
                    let score = scorer.evaluate(&scratch, mover);
                    trace!(x, y, score, "candidate scored");
                    score
                }
                Err(_) => f64::NEG_INFINITY,
            }
        })
    }
}

/// Highest-scoring candidate; earlier candidates win ties. `candidates` must be non-empty.
fn first_best(candidates: &[Point], mut score: impl FnMut(Point) -> f64) -> Point {
    let mut best = candidates[0];
    let mut best_score = score(best);
    for &pt in &candidates[1..] {
        let s = score(pt);
        if s > best_score {
            best = pt;
            best_score = s;
        }
    }
    best
}
