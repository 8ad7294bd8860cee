//! Self-play training.
//!
//! Plays computer-vs-computer games through a learning [`GameSession`]: every
//! finished game is credited to the coefficient table, and when exactly one
//! side uses the hard tier its result becomes a fitness sample for the
//! heuristic model. Each fitness update is applied before the next game starts
//! so consecutive games use the updated weights.

use tracing::info;

use crate::ai::{AiStrategist, Tier};
use crate::board::Player;
use crate::session::{Controller, GameSession};

/// Totals over a training run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TrainingSummary {
    pub games: usize,
    pub positive_wins: usize,
    pub negative_wins: usize,
    /// Games stopped by the turn limit or an AI failure.
    pub unfinished: usize,
    pub table_entries: usize,
}

/// Play `games` games of `positive` against `negative`.
pub fn self_play(
    strategist: AiStrategist,
    positive: Tier,
    negative: Tier,
    games: usize,
) -> TrainingSummary {
    let mut session = GameSession::new(
        Controller::Computer(positive),
        Controller::Computer(negative),
        strategist,
        true,
    );
    let mut summary = TrainingSummary::default();

    for game in 0..games {
        session.reset();
        session.run_computer();
        summary.games += 1;
        match session.summary().and_then(|s| s.winner) {
            Some(Player::Positive) => summary.positive_wins += 1,
            Some(Player::Negative) => summary.negative_wins += 1,
            None => {
                info!(game, turns = session.board().turn_count(), "game stopped unfinished");
                summary.unfinished += 1;
            }
        }
    }
    session.wait_for_training();

    summary.table_entries = session.strategist().store().len();
    info!(
        games = summary.games,
        positive_wins = summary.positive_wins,
        negative_wins = summary.negative_wins,
        unfinished = summary.unfinished,
        table_entries = summary.table_entries,
        "self-play finished"
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coefficients::CoefficientStore;
    use crate::heuristic::HeuristicEvaluator;
    use std::sync::Arc;

    #[test]
    fn test_self_play_fills_table_and_scores_population() {
        let store = Arc::new(CoefficientStore::new());
        let evaluator = Arc::new(HeuristicEvaluator::with_seed(21));
        let strategist = AiStrategist::with_seed(Arc::clone(&store), Arc::clone(&evaluator), 8);

        let summary = self_play(strategist, Tier::Hard, Tier::Easy, 3);
        assert_eq!(summary.games, 3);
        assert_eq!(summary.positive_wins + summary.negative_wins + summary.unfinished, 3);
        assert_eq!(summary.table_entries, store.len());
        assert!(!store.is_empty());

        let finished = summary.positive_wins + summary.negative_wins;
        let scored = evaluator
            .snapshot()
            .population()
            .iter()
            .filter(|ind| ind.fitness.is_some())
            .count();
        assert_eq!(scored, finished);
    }
}
