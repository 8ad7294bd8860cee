//! Learned position evaluation for the hard AI.
//!
//! The evaluator is a three-layer feed-forward network: one input per cell
//! (the stack as seen by the evaluating player, scaled to `[-1, 1]`), six
//! aggregate inputs, a `tanh` hidden layer, and a single `tanh` output.
//!
//! ## Training
//! Weights evolve by differential evolution (DE/rand/1/bin) across games. The
//! model keeps a small population of weight vectors. Every game is played by
//! one vector and its result is reported through
//! [`HeuristicEvaluator::record_fitness`]:
//!
//! 1. Until every individual has a fitness, games are played by the next
//!    unscored individual and the result becomes its fitness.
//! 2. Afterwards each game is played by a trial vector built from three other
//!    individuals and crossed with a target. The trial replaces the target
//!    when its fitness is at least as good. The target then advances.
//!
//! Play only takes the read lock. Fitness updates take the write lock and so
//! never overlap an evaluation.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::{RwLock, RwLockReadGuard};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::board::{BoardState, Player};
use crate::constants::{
    ANN_HIDDEN, ANN_INIT_RANGE, ANN_INPUTS, ANN_PARAMETERS, CELLS, DE_CR, DE_F, DE_POPULATION,
    MAX_MAGNITUDE, MAX_STONES, WIN_SCORE,
};
use crate::status;

const MODEL_VERSION: u32 = 1;

/// DE/rand/1 needs the target plus three distinct donors.
const MIN_POPULATION: usize = 4;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("heuristic model I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("heuristic model is malformed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("weight vector {index} has {found} parameters, expected {expected}")]
    Shape {
        index: usize,
        expected: usize,
        found: usize,
    },
    #[error("population of {0} is too small, need at least {min}", min = MIN_POPULATION)]
    Population(usize),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FitnessError {
    #[error("fitness {0} is not a finite number")]
    NonFinite(f64),
}

/// One weight vector and the fitness it earned, if it has played.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Individual {
    pub weights: Vec<f64>,
    pub fitness: Option<f64>,
}

/// The persisted parameter set: population plus DE bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeuristicModel {
    version: u32,
    population: Vec<Individual>,
    /// Individual being scored, or the DE target when `trial` is set.
    cursor: usize,
    trial: Option<Vec<f64>>,
    generation: u64,
    #[serde(skip)]
    rng: fastrand::Rng,
}

impl HeuristicModel {
    /// A fresh, unscored population.
    pub fn with_seed(seed: u64) -> Self {
        let mut rng = fastrand::Rng::with_seed(seed);
        let population = (0..DE_POPULATION)
            .map(|_| Individual {
                weights: (0..ANN_PARAMETERS)
                    .map(|_| (rng.f64() * 2.0 - 1.0) * ANN_INIT_RANGE)
                    .collect(),
                fitness: None,
            })
            .collect();
        Self {
            version: MODEL_VERSION,
            population,
            cursor: 0,
            trial: None,
            generation: 0,
            rng,
        }
    }

    fn validate(&self) -> Result<(), ModelError> {
        if self.population.len() < MIN_POPULATION {
            return Err(ModelError::Population(self.population.len()));
        }
        let vectors = self
            .population
            .iter()
            .map(|ind| &ind.weights)
            .chain(self.trial.as_ref());
        for (index, weights) in vectors.enumerate() {
            if weights.len() != ANN_PARAMETERS {
                return Err(ModelError::Shape {
                    index,
                    expected: ANN_PARAMETERS,
                    found: weights.len(),
                });
            }
        }
        Ok(())
    }

    /// Weights used for the next game.
    pub fn active_weights(&self) -> &[f64] {
        match &self.trial {
            Some(trial) => trial,
            None => &self.population[self.cursor].weights,
        }
    }

    /// Weights for play outside training: the champion's, or the active
    /// vector while nothing has been scored.
    pub fn playing_weights(&self) -> &[f64] {
        match self.champion() {
            Some(ind) => &ind.weights,
            None => self.active_weights(),
        }
    }

    /// Best scored individual.
    pub fn champion(&self) -> Option<&Individual> {
        self.population
            .iter()
            .filter(|ind| ind.fitness.is_some())
            .max_by(|a, b| a.fitness.partial_cmp(&b.fitness).unwrap_or(std::cmp::Ordering::Equal))
    }

    pub fn population(&self) -> &[Individual] {
        &self.population
    }

    /// Completed passes of DE over the population.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Assign `fitness` to the vector that just played and pick the next one.
    pub fn record(&mut self, fitness: f64) -> Result<(), FitnessError> {
        if !fitness.is_finite() {
            return Err(FitnessError::NonFinite(fitness));
        }
        let len = self.population.len();
        match self.trial.take() {
            Some(trial) => {
                let target = &mut self.population[self.cursor];
                let replaced = target.fitness.is_none_or(|f| fitness >= f);
                if replaced {
                    *target = Individual {
                        weights: trial,
                        fitness: Some(fitness),
                    };
                }
                debug!(slot = self.cursor, fitness, replaced, "trial scored");
                self.cursor = (self.cursor + 1) % len;
                if self.cursor == 0 {
                    self.generation += 1;
                }
            }
            None => {
                self.population[self.cursor].fitness = Some(fitness);
                debug!(individual = self.cursor, fitness, "individual scored");
                self.cursor = (self.cursor + 1) % len;
            }
        }
        self.prepare_next();
        Ok(())
    }

    /// Point at the next unscored individual, or build a trial once all are scored.
    fn prepare_next(&mut self) {
        if self.trial.is_some() {
            return;
        }
        let len = self.population.len();
        let unscored = (0..len)
            .map(|k| (self.cursor + k) % len)
            .find(|&i| self.population[i].fitness.is_none());
        match unscored {
            Some(i) => self.cursor = i,
            None => self.trial = Some(self.mutant(self.cursor)),
        }
    }

    /// DE/rand/1/bin trial vector for `target`.
    fn mutant(&mut self, target: usize) -> Vec<f64> {
        let len = self.population.len();
        let mut donors = [0usize; 3];
        for k in 0..3 {
            donors[k] = loop {
                let i = self.rng.usize(..len);
                if i != target && !donors[..k].contains(&i) {
                    break i;
                }
            };
        }
        let [a, b, c] = donors.map(|i| &self.population[i].weights);
        let base = &self.population[target].weights;
        let forced = self.rng.usize(..ANN_PARAMETERS);
        (0..ANN_PARAMETERS)
            .map(|j| {
                if j == forced || self.rng.f64() < DE_CR {
                    a[j] + DE_F * (b[j] - c[j])
                } else {
                    base[j]
                }
            })
            .collect()
    }
}

/// Fitness of a finished game for `player`: stone differential over board capacity.
pub fn fitness_from_board(state: &BoardState, player: Player) -> f64 {
    status::score_differential(state, player) as f64 / MAX_STONES as f64
}

/// Network inputs for `state` from `perspective`'s side.
pub fn features(state: &BoardState, perspective: Player) -> [f64; ANN_INPUTS] {
    let sign = perspective.sign();
    let scale = MAX_MAGNITUDE as f64;
    let mut inputs = [0.0; ANN_INPUTS];
    let (mut own_stones, mut opp_stones) = (0.0, 0.0);
    let (mut own_cells, mut opp_cells) = (0.0, 0.0);
    let (mut own_ready, mut opp_ready) = (0.0, 0.0);

    for (i, &value) in state.cells().iter().enumerate() {
        let relative = value * sign;
        inputs[i] = relative as f64 / scale;
        let magnitude = relative.abs() as f64;
        if relative > 0 {
            own_stones += magnitude;
            own_cells += 1.0;
            if relative == MAX_MAGNITUDE {
                own_ready += 1.0;
            }
        } else if relative < 0 {
            opp_stones += magnitude;
            opp_cells += 1.0;
            if -relative == MAX_MAGNITUDE {
                opp_ready += 1.0;
            }
        }
    }

    let stones = MAX_STONES as f64;
    let cells = CELLS as f64;
    inputs[CELLS..].copy_from_slice(&[
        own_stones / stones,
        opp_stones / stones,
        own_cells / cells,
        opp_cells / cells,
        own_ready / cells,
        opp_ready / cells,
    ]);
    inputs
}

/// Forward pass. `weights` holds, per hidden unit, its input weights followed
/// by its bias, then the output weights followed by the output bias.
fn forward(weights: &[f64], inputs: &[f64; ANN_INPUTS]) -> f64 {
    let stride = ANN_INPUTS + 1;
    let output = &weights[ANN_HIDDEN * stride..];
    let mut sum = output[ANN_HIDDEN];
    for h in 0..ANN_HIDDEN {
        let unit = &weights[h * stride..(h + 1) * stride];
        let activation: f64 = unit[..ANN_INPUTS]
            .iter()
            .zip(inputs)
            .map(|(w, x)| w * x)
            .sum::<f64>()
            + unit[ANN_INPUTS];
        sum += output[h] * activation.tanh();
    }
    sum.tanh()
}

/// Process-wide evaluator shared by AI searches.
#[derive(Debug)]
pub struct HeuristicEvaluator {
    model: RwLock<HeuristicModel>,
}

/// Read access for scoring many positions under one lock.
pub struct Scorer<'a> {
    model: RwLockReadGuard<'a, HeuristicModel>,
    training: bool,
}

impl HeuristicEvaluator {
    pub fn new(model: HeuristicModel) -> Result<Self, ModelError> {
        model.validate()?;
        Ok(Self {
            model: RwLock::new(model),
        })
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            model: RwLock::new(HeuristicModel::with_seed(seed)),
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let mut model: HeuristicModel = serde_json::from_reader(BufReader::new(file))?;
        model.validate()?;
        model.cursor %= model.population.len();
        model.prepare_next();
        info!(path = %path.display(), generation = model.generation, "heuristic model loaded");
        Self::new(model)
    }

    /// Load the model at `path`, or seed a fresh one when the file does not exist.
    pub fn load_or_seed(path: impl AsRef<Path>, seed: u64) -> Result<Self, ModelError> {
        match Self::load(path.as_ref()) {
            Err(ModelError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.as_ref().display(), "no heuristic model, seeding a fresh one");
                Ok(Self::with_seed(seed))
            }
            other => other,
        }
    }

    /// Write the whole model to `path` via a temporary sibling file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ModelError> {
        let path = path.as_ref();
        let tmp = path.with_extension("tmp");
        let written = (|| -> Result<(), ModelError> {
            let mut out = BufWriter::new(File::create(&tmp)?);
            serde_json::to_writer(&mut out, &*self.model.read())?;
            out.flush()?;
            drop(out);
            std::fs::rename(&tmp, path)?;
            Ok(())
        })();
        if let Err(e) = written {
            let _ = std::fs::remove_file(&tmp);
            return Err(e);
        }
        info!(path = %path.display(), "heuristic model saved");
        Ok(())
    }

    /// Scorer using the champion's weights.
    pub fn scorer(&self) -> Scorer<'_> {
        Scorer {
            model: self.model.read(),
            training: false,
        }
    }

    /// Scorer using the vector under trial, whose game result feeds
    /// [`record_fitness`](Self::record_fitness).
    pub fn training_scorer(&self) -> Scorer<'_> {
        Scorer {
            model: self.model.read(),
            training: true,
        }
    }

    /// Score `state` with the champion's weights.
    pub fn evaluate(&self, state: &BoardState, perspective: Player) -> f64 {
        self.scorer().evaluate(state, perspective)
    }

    /// Copy of the current parameters.
    pub fn snapshot(&self) -> HeuristicModel {
        self.model.read().clone()
    }

    /// Feed the result of a finished game back into training.
    pub fn record_fitness(&self, outcome: f64) -> Result<(), FitnessError> {
        self.model.write().record(outcome)
    }

    /// Record fitness on a worker thread. Failures are logged and dropped.
    pub fn spawn_record_fitness(self: &Arc<Self>, outcome: f64) -> JoinHandle<()> {
        let evaluator = Arc::clone(self);
        std::thread::spawn(move || {
            if let Err(e) = evaluator.record_fitness(outcome) {
                warn!(error = %e, "fitness not recorded");
            }
        })
    }
}

impl Scorer<'_> {
    /// Score `state` for `perspective`; higher is better for that player.
    ///
    /// Decided games score `WIN_SCORE` or its negation regardless of weights.
    pub fn evaluate(&self, state: &BoardState, perspective: Player) -> f64 {
        if status::is_terminal(state) {
            return match status::winner(state) {
                Some(p) if p == perspective => WIN_SCORE,
                Some(_) => -WIN_SCORE,
                None => 0.0,
            };
        }
        let weights = if self.training {
            self.model.active_weights()
        } else {
            self.model.playing_weights()
        };
        forward(weights, &features(state, perspective))
    }
}
