//! A single game from first deployment to elimination.
//!
//! The session owns the board and decides who drives each side: a human
//! through [`GameSession::play`], or the computer at a given tier. After a
//! human move the session lets computer-controlled sides reply until a human
//! is to move again or the game ends.
//!
//! When the game ends the session builds a [`GameSummary`] and, if learning
//! is enabled, credits the game's moves to the coefficient table and reports
//! fitness for a sole hard-tier computer side on a worker thread.

use std::thread::JoinHandle;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::ai::{AiError, AiStrategist, Tier};
use crate::board::{BoardState, Player, Point};
use crate::coefficients::Sample;
use crate::constants::MAX_GAME_LEN;
use crate::encoder::encode_neighborhood;
use crate::engine::{apply_move, Move, MoveError, MoveOutcome};
use crate::heuristic::fitness_from_board;
use crate::status::{self, GameResult};

/// Who drives one side of the board.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Controller {
    Human,
    Computer(Tier),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Move(#[from] MoveError),
    #[error(transparent)]
    Ai(#[from] AiError),
    #[error("the game is over")]
    GameOver,
    #[error("{0} is played by the computer")]
    NotHumanTurn(Player),
}

/// Final figures of a finished game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameSummary {
    pub winner: Option<Player>,
    /// Stones left on the board.
    pub points: u32,
    /// Successful human moves.
    pub moves: u32,
    /// High-score value: `points - moves`.
    pub score: i64,
    pub turns: u32,
}

/// Everything that happened after one human move.
#[derive(Debug, Clone)]
pub struct TurnReport {
    pub human: MoveOutcome,
    pub replies: Vec<MoveOutcome>,
    pub result: GameResult,
}

pub struct GameSession {
    board: BoardState,
    controllers: [Controller; 2],
    strategist: AiStrategist,
    learning: bool,
    moves: u32,
    samples: Vec<Sample>,
    summary: Option<GameSummary>,
    fitness_update: Option<JoinHandle<()>>,
}

impl GameSession {
    /// Create a session; `learning` also decides whether the hard tier plays
    /// the trial weights or the champion.
    pub fn new(
        positive: Controller,
        negative: Controller,
        mut strategist: AiStrategist,
        learning: bool,
    ) -> Self {
        strategist.set_training(learning);
        Self {
            board: BoardState::new(),
            controllers: [positive, negative],
            strategist,
            learning,
            moves: 0,
            samples: Vec::new(),
            summary: None,
            fitness_update: None,
        }
    }

    /// Human (positive, moving first) against the computer (negative).
    pub fn versus_computer(tier: Tier, strategist: AiStrategist, learning: bool) -> Self {
        Self::new(Controller::Human, Controller::Computer(tier), strategist, learning)
    }

    /// Two humans sharing one board.
    pub fn hot_seat(strategist: AiStrategist) -> Self {
        Self::new(Controller::Human, Controller::Human, strategist, false)
    }

    /// Start a new game with the same controllers.
    pub fn reset(&mut self) {
        self.wait_for_training();
        self.board = BoardState::new();
        self.moves = 0;
        self.samples.clear();
        self.summary = None;
    }

    pub fn board(&self) -> &BoardState {
        &self.board
    }

    /// Copy of the board for rendering; changes to it never reach the game.
    pub fn snapshot(&self) -> BoardState {
        self.board.clone()
    }

    pub fn controller(&self, player: Player) -> Controller {
        self.controllers[side(player)]
    }

    pub fn set_controller(&mut self, player: Player, controller: Controller) {
        self.controllers[side(player)] = controller;
    }

    pub fn strategist(&self) -> &AiStrategist {
        &self.strategist
    }

    pub fn result(&self) -> GameResult {
        status::result(&self.board)
    }

    pub fn summary(&self) -> Option<&GameSummary> {
        self.summary.as_ref()
    }

    pub fn is_over(&self) -> bool {
        self.summary.is_some()
    }

    /// Play a human move at `(x, y)`, then let the computer reply.
    pub fn play(&mut self, x: usize, y: usize) -> Result<TurnReport, SessionError> {
        if self.is_over() {
            return Err(SessionError::GameOver);
        }
        let mover = self.board.mover();
        if self.controller(mover) != Controller::Human {
            return Err(SessionError::NotHumanTurn(mover));
        }

        let human = self.apply(Move::by(mover, x, y))?;
        self.moves += 1;
        if status::is_terminal(&self.board) {
            self.finish();
        }
        let replies = self.run_computer();
        Ok(TurnReport {
            human,
            replies,
            result: self.result(),
        })
    }

    /// Let the computer move for the player to move at `tier`, whoever controls that side.
    pub fn computer_move(&mut self, tier: Tier) -> Result<MoveOutcome, SessionError> {
        if self.is_over() {
            return Err(SessionError::GameOver);
        }
        let (x, y): Point = self.strategist.select_move(&self.board, tier)?;
        let outcome = self.apply(Move::at(x, y))?;
        if status::is_terminal(&self.board) {
            self.finish();
        }
        Ok(outcome)
    }

    /// Play computer moves while the side to move is computer-controlled.
    ///
    /// Stops early when the AI fails (logged) or the turn limit is reached.
    pub fn run_computer(&mut self) -> Vec<MoveOutcome> {
        let mut replies = Vec::new();
        while !self.is_over() && self.board.turn_count() < MAX_GAME_LEN {
            let Controller::Computer(tier) = self.controller(self.board.mover()) else {
                break;
            };
            match self.computer_move(tier) {
                Ok(outcome) => replies.push(outcome),
                Err(e) => {
                    warn!(error = %e, "computer move failed");
                    break;
                }
            }
        }
        replies
    }

    fn apply(&mut self, mv: Move) -> Result<MoveOutcome, SessionError> {
        let key = self.learning.then(|| encode_neighborhood(&self.board, (mv.x, mv.y)));
        let player = self.board.mover();
        let outcome = apply_move(&mut self.board, mv)?;
        if let Some(key) = key {
            self.samples.push(Sample { key, player });
        }
        Ok(outcome)
    }

    fn finish(&mut self) {
        let winner = status::winner(&self.board);
        let points = status::points(&self.board);
        let summary = GameSummary {
            winner,
            points,
            moves: self.moves,
            score: points as i64 - self.moves as i64,
            turns: self.board.turn_count(),
        };
        info!(
            winner = ?summary.winner,
            points,
            moves = summary.moves,
            score = summary.score,
            turns = summary.turns,
            "game over"
        );
        self.summary = Some(summary);

        if !self.learning {
            return;
        }
        if let Some(winner) = winner {
            let applied = self.strategist.store().writer().learn(&self.samples, winner);
            debug!(applied, "game credited to coefficient table");
        }
        if let Some(player) = self.sole_hard_side() {
            let fitness = fitness_from_board(&self.board, player);
            // Best effort: the worker logs and drops failures.
            self.fitness_update = Some(self.strategist.evaluator().spawn_record_fitness(fitness));
        }
    }

    /// Block until the last game's fitness update, if any, has been applied.
    pub fn wait_for_training(&mut self) {
        if let Some(handle) = self.fitness_update.take() {
            if handle.join().is_err() {
                warn!("fitness update thread panicked");
            }
        }
    }

    /// The only side played by the hard tier, if exactly one is.
    fn sole_hard_side(&self) -> Option<Player> {
        let hard = |p: Player| self.controller(p) == Controller::Computer(Tier::Hard);
        match (hard(Player::Positive), hard(Player::Negative)) {
            (true, false) => Some(Player::Positive),
            (false, true) => Some(Player::Negative),
            _ => None,
        }
    }
}

fn side(player: Player) -> usize {
    match player {
        Player::Positive => 0,
        Player::Negative => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coefficients::CoefficientStore;
    use crate::heuristic::HeuristicEvaluator;
    use std::sync::Arc;

    fn strategist() -> AiStrategist {
        AiStrategist::with_seed(
            Arc::new(CoefficientStore::new()),
            Arc::new(HeuristicEvaluator::with_seed(3)),
            17,
        )
    }

    #[test]
    fn test_hot_seat_alternates() {
        let mut session = GameSession::hot_seat(strategist());
        let report = session.play(0, 0).unwrap();
        assert!(report.replies.is_empty());
        assert_eq!(session.board().get(0, 0), Some(2));
        session.play(7, 7).unwrap();
        assert_eq!(session.board().get(7, 7), Some(-2));
        assert_eq!(session.board().turn_count(), 2);
    }

    #[test]
    fn test_computer_replies_after_human() {
        let mut session = GameSession::versus_computer(Tier::Normal, strategist(), false);
        let report = session.play(3, 3).unwrap();
        assert_eq!(report.replies.len(), 1);
        assert_eq!(report.replies[0].player, Player::Negative);
        assert_eq!(report.replies[0].point, (0, 0));
        assert_eq!(session.board().mover(), Player::Positive);
    }

    #[test]
    fn test_rejected_move_keeps_turn() {
        let mut session = GameSession::versus_computer(Tier::Easy, strategist(), false);
        session.play(3, 3).unwrap();
        let err = session.play(3, 3).unwrap_err();
        assert!(matches!(err, SessionError::Move(MoveError::CellOccupied { x: 3, y: 3 })));
        assert_eq!(session.board().turn_count(), 2);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let mut session = GameSession::hot_seat(strategist());
        session.play(1, 1).unwrap();
        let mut snap = session.snapshot();
        snap.cells[0] = 3;
        assert_eq!(session.board().get(0, 0), Some(0));
    }

    #[test]
    fn test_self_play_reaches_game_over() {
        let mut session = GameSession::new(
            Controller::Computer(Tier::Easy),
            Controller::Computer(Tier::Normal),
            strategist(),
            true,
        );
        session.run_computer();
        let summary = *session.summary().expect("game finished");
        assert!(summary.winner.is_some());
        assert_eq!(summary.moves, 0);
        assert_eq!(summary.score, summary.points as i64);
        assert!(!session.strategist().store().is_empty());
        assert!(matches!(session.computer_move(Tier::Easy), Err(SessionError::GameOver)));
    }

    #[test]
    fn test_learning_selects_hard_tier_weights() {
        let playing = GameSession::versus_computer(Tier::Hard, strategist(), false);
        assert!(!playing.strategist().is_training());
        let learning = GameSession::versus_computer(Tier::Hard, strategist(), true);
        assert!(learning.strategist().is_training());
    }

    #[test]
    fn test_human_cannot_move_for_computer() {
        let mut session = GameSession::new(
            Controller::Computer(Tier::Easy),
            Controller::Human,
            strategist(),
            false,
        );
        assert!(matches!(
            session.play(0, 0),
            Err(SessionError::NotHumanTurn(Player::Positive))
        ));
    }
}
