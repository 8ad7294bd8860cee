//! Overflow-Rust: a stone-overflow board game engine with a three-tier AI.
//!
//! Two players take turns on an 8x8 board. After a short deployment phase,
//! each move adds a stone to one of the mover's own stacks; a stack that
//! reaches four detonates into its neighbours, capturing enemy stacks, and
//! the blast can chain across the board. The last colour standing wins.
//!
//! ## Modules
//!
//! - [`constants`] - Board dimensions, rule thresholds, and AI parameters
//! - [`board`] - Board state, players, and coordinates
//! - [`cascade`] - Detonation chain resolution
//! - [`engine`] - Move validation and application
//! - [`status`] - Terminal detection, winner, and scoring
//! - [`encoder`] - Board and neighbourhood keys
//! - [`coefficients`] - Learned move weights for the normal tier
//! - [`heuristic`] - Neural evaluator trained by differential evolution
//! - [`ai`] - Move selection for the easy, normal, and hard tiers
//! - [`session`] - One game with human or computer controllers
//! - [`training`] - Computer self-play
//! - [`protocol`] - Text command protocol
//! - [`config`] - TOML configuration
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use overflow_rust::ai::{AiStrategist, Tier};
//! use overflow_rust::coefficients::CoefficientStore;
//! use overflow_rust::heuristic::HeuristicEvaluator;
//! use overflow_rust::session::GameSession;
//!
//! let strategist = AiStrategist::new(
//!     Arc::new(CoefficientStore::new()),
//!     Arc::new(HeuristicEvaluator::with_seed(1)),
//! );
//! let mut game = GameSession::versus_computer(Tier::Normal, strategist, false);
//!
//! // Deploy a stack of two at D4; the computer answers.
//! let report = game.play(3, 3).unwrap();
//! assert_eq!(report.replies.len(), 1);
//! println!("{}", game.board());
//! ```

pub mod ai;
pub mod board;
pub mod cascade;
pub mod coefficients;
pub mod config;
pub mod constants;
pub mod encoder;
pub mod engine;
pub mod heuristic;
pub mod protocol;
pub mod session;
pub mod status;
pub mod training;
