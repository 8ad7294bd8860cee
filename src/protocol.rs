//! Line-oriented text protocol for driving a game from a terminal or a GUI.
//!
//! The framing follows GTP: each command may start with a numeric id, and
//! each response is `=[id] text` on success or `?[id] message` on failure,
//! followed by a blank line.
//!
//! ## Supported Commands
//!
//! - `name` - Return engine name
//! - `version` - Return engine version
//! - `protocol_version` - Return protocol version (1)
//! - `list_commands` - List all supported commands
//! - `known_command <cmd>` - Check if a command is supported
//! - `quit` - Exit the program
//! - `clear_board` - Start a new game
//! - `tier <easy|normal|hard>` - Set the computer's difficulty
//! - `play <vertex>` - Play a human move (e.g. `C5`); the computer replies
//!   with any moves it makes
//! - `genmove` - Let the computer move for the player to move; computer
//!   sides then reply as after `play`
//! - `showboard` - Print the board
//! - `status` - Print mover, turn, and result
//!
//! ## Example
//!
//! ```ignore
//! use overflow_rust::protocol::ProtocolEngine;
//! let mut engine = ProtocolEngine::new(session, Tier::Normal);
//! engine.run()?;
//! ```

use std::io::{self, BufRead, Write};

use tracing::debug;

use crate::ai::Tier;
use crate::board::{parse_coord, str_coord, Player};
use crate::session::{Controller, GameSession};
use crate::status::GameResult;

/// The list of known commands.
const KNOWN_COMMANDS: &[&str] = &[
    "clear_board",
    "genmove",
    "known_command",
    "list_commands",
    "name",
    "play",
    "protocol_version",
    "quit",
    "showboard",
    "status",
    "tier",
    "version",
];

/// Protocol front end over a [`GameSession`].
pub struct ProtocolEngine {
    session: GameSession,
    /// Tier for `genmove` and for a computer-controlled side.
    tier: Tier,
}

impl ProtocolEngine {
    /// Create a new engine; `tier` drives `genmove`.
    pub fn new(session: GameSession, tier: Tier) -> Self {
        Self { session, tier }
    }

    pub fn session(&self) -> &GameSession {
        &self.session
    }

    /// Consume the engine, returning the session.
    pub fn into_session(self) -> GameSession {
        self.session
    }

    /// Run the command loop on stdin/stdout until `quit` or end of input.
    pub fn run(&mut self) -> io::Result<()> {
        let stdin = io::stdin();
        let stdout = io::stdout();
        self.run_with(stdin.lock(), stdout.lock())
    }

    /// Run the command loop over arbitrary streams.
    pub fn run_with(&mut self, input: impl BufRead, mut output: impl Write) -> io::Result<()> {
        for line in input.lines() {
            let line = line?;

            // Skip empty lines and comments
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (id, command_line) = Self::parse_id(line);
            let parts: Vec<&str> = command_line.split_whitespace().collect();
            let Some((command, args)) = parts.split_first() else {
                continue;
            };
            let command = command.to_lowercase();

            let (success, message) = self.execute(&command, args);
            let prefix = if success { '=' } else { '?' };
            let id_str = id.map(|i| i.to_string()).unwrap_or_default();

            writeln!(output, "{prefix}{id_str} {message}\n")?;
            output.flush()?;

            if command == "quit" {
                break;
            }
        }
        Ok(())
    }

    /// Parse an optional numeric command ID from the beginning of the line.
    fn parse_id(line: &str) -> (Option<u32>, &str) {
        let trimmed = line.trim();
        let end = trimmed
            .char_indices()
            .find(|(_, c)| !c.is_ascii_digit())
            .map(|(i, _)| i)
            .unwrap_or(trimmed.len());
        if end == 0 {
            return (None, trimmed);
        }
        match trimmed[..end].parse::<u32>() {
            Ok(id) => (Some(id), trimmed[end..].trim()),
            Err(_) => (None, trimmed),
        }
    }

    /// Execute a command and return (success, response).
    fn execute(&mut self, command: &str, args: &[&str]) -> (bool, String) {
        debug!(command, ?args, "protocol command");
        match command {
            "name" => (true, env!("CARGO_PKG_NAME").to_string()),

            "version" => (true, env!("CARGO_PKG_VERSION").to_string()),

            "protocol_version" => (true, "1".to_string()),

            "list_commands" => (true, KNOWN_COMMANDS.join("\n")),

            "known_command" => match args.first() {
                Some(cmd) => {
                    let known = KNOWN_COMMANDS.contains(&cmd.to_lowercase().as_str());
                    (true, known.to_string())
                }
                None => (false, "missing argument".to_string()),
            },

            "quit" => (true, String::new()),

            "clear_board" => {
                self.session.reset();
                (true, String::new())
            }

            "tier" => match args.first().map(|a| a.parse::<Tier>()) {
                Some(Ok(tier)) => {
                    self.tier = tier;
                    for player in [Player::Positive, Player::Negative] {
                        if let Controller::Computer(_) = self.session.controller(player) {
                            self.session.set_controller(player, Controller::Computer(tier));
                        }
                    }
                    (true, String::new())
                }
                Some(Err(e)) => (false, e),
                None => (false, "missing argument".to_string()),
            },

            "play" => {
                let Some(vertex) = args.first() else {
                    return (false, "missing argument".to_string());
                };
                let Some((x, y)) = parse_coord(vertex) else {
                    return (false, format!("invalid vertex: {vertex}"));
                };
                match self.session.play(x, y) {
                    Ok(report) => {
                        let replies: Vec<String> =
                            report.replies.iter().map(|o| str_coord(o.point)).collect();
                        (true, replies.join(" "))
                    }
                    Err(e) => (false, e.to_string()),
                }
            }

            "genmove" => match self.session.computer_move(self.tier) {
                Ok(outcome) => {
                    let mut points = vec![str_coord(outcome.point)];
                    points.extend(self.session.run_computer().iter().map(|o| str_coord(o.point)));
                    (true, points.join(" "))
                }
                Err(e) => (false, e.to_string()),
            },

            "showboard" => (true, format!("\n{}", self.session.board())),

            "status" => {
                let board = self.session.board();
                let result = match self.session.result() {
                    GameResult::InProgress => "in progress".to_string(),
                    GameResult::Won(player) => format!("{player} won"),
                };
                let mut message = format!(
                    "mover {} turn {} {result}",
                    board.mover(),
                    board.turn_count()
                );
                if let Some(summary) = self.session.summary() {
                    message.push_str(&format!(" score {}", summary.score));
                }
                (true, message)
            }

            _ => (false, format!("unknown command: {command}")),
        }
    }
}
