//! Overflow-Rust: stone-overflow game engine.
//!
//! ## Usage
//!
//! - `overflow-rust` - Play over the text protocol on stdin/stdout
//! - `overflow-rust train --games 500 --against easy` - Computer self-play
//! - `overflow-rust demo` - Watch one computer-vs-computer game

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use overflow_rust::ai::{AiStrategist, Tier};
use overflow_rust::board::str_coord;
use overflow_rust::coefficients::CoefficientStore;
use overflow_rust::config::{Config, Opponent};
use overflow_rust::constants::TRAIN_GAMES;
use overflow_rust::heuristic::HeuristicEvaluator;
use overflow_rust::protocol::ProtocolEngine;
use overflow_rust::session::{Controller, GameSession};
use overflow_rust::training;

/// Overflow-Rust: stone-overflow game engine with a three-tier AI
#[derive(Parser)]
#[command(name = "overflow-rust")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// AI difficulty
    #[arg(long, global = true, value_enum)]
    tier: Option<Tier>,

    /// Seed for reproducible AI choices
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Coefficient table file
    #[arg(long, global = true)]
    coefficients: Option<PathBuf>,

    /// Heuristic model file
    #[arg(long, global = true)]
    model: Option<PathBuf>,

    /// Train the coefficient table and model from finished games
    #[arg(long, global = true)]
    learning: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Play over the text protocol (default)
    Play {
        /// Who plays the negative side
        #[arg(long, value_enum)]
        opponent: Option<Opponent>,
    },
    /// Let the computer play itself and learn from the results
    Train {
        /// Number of games
        #[arg(long, default_value_t = TRAIN_GAMES)]
        games: usize,
        /// Tier of the negative side; the positive side uses `--tier`
        #[arg(long, value_enum, default_value_t = Tier::Easy)]
        against: Tier,
    },
    /// Print one computer-vs-computer game move by move
    Demo,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let (store, evaluator) = load_tables(&config)?;
    let strategist = match config.seed {
        Some(seed) => AiStrategist::with_seed(Arc::clone(&store), Arc::clone(&evaluator), seed),
        None => AiStrategist::new(Arc::clone(&store), Arc::clone(&evaluator)),
    };

    match cli.command {
        Some(Commands::Play { opponent }) => {
            run_protocol(&config, opponent.unwrap_or(config.opponent), strategist)?
        }
        None => run_protocol(&config, config.opponent, strategist)?,
        Some(Commands::Train { games, against }) => {
            let summary = training::self_play(strategist, config.tier, against, games);
            println!(
                "{} games: positive {} / negative {} / unfinished {}, {} table entries",
                summary.games,
                summary.positive_wins,
                summary.negative_wins,
                summary.unfinished,
                summary.table_entries
            );
        }
        Some(Commands::Demo) => run_demo(config.tier, strategist),
    }

    save_tables(&config, &store, &evaluator)
}

/// Config file values with command-line flags layered on top.
fn resolve_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;
    if let Some(tier) = cli.tier {
        config.tier = tier;
    }
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }
    if cli.coefficients.is_some() {
        config.coefficients = cli.coefficients.clone();
    }
    if cli.model.is_some() {
        config.model = cli.model.clone();
    }
    if cli.learning || matches!(cli.command, Some(Commands::Train { .. })) {
        config.learning = true;
    }
    Ok(config)
}

fn load_tables(config: &Config) -> Result<(Arc<CoefficientStore>, Arc<HeuristicEvaluator>)> {
    let store = match &config.coefficients {
        Some(path) => CoefficientStore::load_or_default(path)
            .with_context(|| format!("failed to load coefficients from {}", path.display()))?,
        None => CoefficientStore::new(),
    };
    let seed = config.seed.unwrap_or_else(|| fastrand::u64(..));
    let evaluator = match &config.model {
        Some(path) => HeuristicEvaluator::load_or_seed(path, seed)
            .with_context(|| format!("failed to load model from {}", path.display()))?,
        None => HeuristicEvaluator::with_seed(seed),
    };
    info!(entries = store.len(), "tables ready");
    Ok((Arc::new(store), Arc::new(evaluator)))
}

fn save_tables(
    config: &Config,
    store: &CoefficientStore,
    evaluator: &HeuristicEvaluator,
) -> Result<()> {
    if !config.learning {
        return Ok(());
    }
    if let Some(path) = &config.coefficients {
        store
            .save(path)
            .with_context(|| format!("failed to save coefficients to {}", path.display()))?;
    }
    if let Some(path) = &config.model {
        evaluator
            .save(path)
            .with_context(|| format!("failed to save model to {}", path.display()))?;
    }
    Ok(())
}

fn run_protocol(config: &Config, opponent: Opponent, strategist: AiStrategist) -> Result<()> {
    let session = match opponent {
        Opponent::Computer => {
            GameSession::versus_computer(config.tier, strategist, config.learning)
        }
        Opponent::Human => GameSession::hot_seat(strategist),
    };
    let mut engine = ProtocolEngine::new(session, config.tier);
    engine.run().context("protocol I/O failed")?;
    engine.into_session().wait_for_training();
    Ok(())
}

fn run_demo(tier: Tier, strategist: AiStrategist) {
    println!("Overflow-Rust: {tier} vs easy\n");

    let mut session = GameSession::new(
        Controller::Computer(tier),
        Controller::Computer(Tier::Easy),
        strategist,
        false,
    );
    for outcome in session.run_computer() {
        let detonations = outcome.cascade.map_or(0, |c| c.detonations.len());
        println!(
            "{} plays {} ({detonations} detonations)",
            outcome.player,
            str_coord(outcome.point)
        );
    }
    println!("\n{}", session.board());
    match session.summary() {
        Some(summary) => println!(
            "Winner: {} after {} turns",
            summary.winner.map_or_else(|| "nobody".to_string(), |p| p.to_string()),
            summary.turns
        ),
        None => println!("No winner after {} turns", session.board().turn_count()),
    }
}
