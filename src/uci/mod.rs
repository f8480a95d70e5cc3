//! UCI protocol front-end and command loop.
//!
//! Parses UCI commands from stdin, maintains the current position, routes
//! `go` requests into the iterative-deepening search and emits
//! protocol-compliant output. Errors never cross this boundary: malformed
//! lines are ignored or answered with an `info string` note and the engine
//! keeps serving.

use std::io::{self, BufRead, Write};
use std::path::Path;
use std::time::Duration;

use crate::board::make_move::{apply_move, Undo};
use crate::board::position::Position;
use crate::eval::material::MaterialPst;
use crate::eval::nnue::{Network, NnueEvaluator};
use crate::eval::Evaluator;
use crate::search::alpha_beta::SearchContext;
use crate::search::iterative::{iterative_deepening, SearchLimits};
use crate::utils::long_algebraic::{long_algebraic_to_move, move_to_long_algebraic};

const UCI_ENGINE_NAME: &str = "Rowan Chess";
const UCI_ENGINE_AUTHOR: &str = "the Rowan Chess developers";

const DEFAULT_HASH_MB: usize = 64;

pub fn run_stdio_loop() -> io::Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut uci = UciState::new();

    for line in stdin.lock().lines() {
        let line = line?;
        let should_quit = uci.handle_command(&line, &mut stdout)?;
        stdout.flush()?;
        if should_quit {
            break;
        }
    }

    Ok(())
}

pub struct UciState {
    position: Position,
    ctx: SearchContext,
    evaluator: Box<dyn Evaluator>,
    debug_mode: bool,
}

impl UciState {
    pub fn new() -> Self {
        let mut ctx = SearchContext::new();
        ctx.set_hash_mb(DEFAULT_HASH_MB);
        UciState {
            position: Position::new_game(),
            ctx,
            evaluator: Box::new(MaterialPst),
            debug_mode: false,
        }
    }

    /// Handle one protocol line. Returns true on `quit`.
    pub fn handle_command(&mut self, line: &str, out: &mut impl Write) -> io::Result<bool> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(false);
        }

        let mut parts = trimmed.split_whitespace();
        let command = parts.next().unwrap_or_default();

        match command {
            "uci" => {
                writeln!(out, "id name {}", UCI_ENGINE_NAME)?;
                writeln!(out, "id author {}", UCI_ENGINE_AUTHOR)?;
                writeln!(out, "option name Hash type spin default 64 min 1 max 4096")?;
                writeln!(out, "option name EvalFile type string default <empty>")?;
                writeln!(out, "uciok")?;
            }
            "isready" => {
                writeln!(out, "readyok")?;
            }
            "ucinewgame" => {
                self.position = Position::new_game();
                self.ctx.new_game();
            }
            "setoption" => {
                if let Err(err) = self.handle_setoption(trimmed) {
                    writeln!(out, "info string setoption error: {err}")?;
                }
            }
            "position" => {
                if let Err(err) = self.handle_position(trimmed) {
                    writeln!(out, "info string position error: {err}")?;
                }
            }
            "go" => {
                self.handle_go(trimmed, out)?;
            }
            "stop" => {
                // The search runs to completion between protocol reads;
                // there is nothing in flight to interrupt.
            }
            "debug" => {
                let mode = parts.next().unwrap_or_default();
                self.debug_mode = mode.eq_ignore_ascii_case("on");
            }
            "quit" => {
                return Ok(true);
            }
            _ => {
                // Unknown commands are ignored for UCI compatibility.
            }
        }

        Ok(false)
    }

    fn handle_setoption(&mut self, line: &str) -> Result<(), String> {
        let mut tokens = line.split_whitespace();
        let _ = tokens.next(); // setoption

        let mut name_tokens = Vec::<&str>::new();
        let mut value_tokens = Vec::<&str>::new();
        let mut mode = "";

        for token in tokens {
            match token {
                "name" => mode = "name",
                "value" => mode = "value",
                _ if mode == "name" => name_tokens.push(token),
                _ if mode == "value" => value_tokens.push(token),
                _ => {}
            }
        }

        let name = name_tokens.join(" ");
        let value = value_tokens.join(" ");

        if name.eq_ignore_ascii_case("Hash") {
            let size_mb = value
                .parse::<usize>()
                .map_err(|_| format!("invalid Hash value '{value}'"))?;
            self.ctx.set_hash_mb(size_mb.clamp(1, 4096));
        } else if name.eq_ignore_ascii_case("EvalFile") {
            if value.is_empty() || value == "<empty>" {
                self.evaluator = Box::new(MaterialPst);
            } else {
                let network = Network::load(Path::new(&value))?;
                self.evaluator = Box::new(NnueEvaluator::new(network));
            }
        } else {
            return Err(format!("unknown option '{name}'"));
        }

        Ok(())
    }

    fn handle_position(&mut self, line: &str) -> Result<(), String> {
        let mut tokens = line.split_whitespace().peekable();
        let _ = tokens.next(); // "position"

        let base = match tokens.next() {
            Some("startpos") => Position::new_game(),
            Some("fen") => {
                let mut fen_parts = Vec::<&str>::new();
                while let Some(&next) = tokens.peek() {
                    if next == "moves" {
                        break;
                    }
                    fen_parts.push(tokens.next().unwrap_or_default());
                }
                if fen_parts.is_empty() {
                    return Err("missing FEN after 'position fen'".to_owned());
                }
                // A bad FEN leaves the previous position untouched.
                Position::from_fen(&fen_parts.join(" "))?
            }
            Some(other) => return Err(format!("unsupported position token '{other}'")),
            None => return Err("incomplete position command".to_owned()),
        };

        self.position = base;

        if tokens.peek().copied() == Some("moves") {
            let _ = tokens.next();
            let mut undo = Undo::default();
            for lan in tokens {
                // An unplayable move stops the list; everything applied so
                // far is kept.
                let mv = long_algebraic_to_move(&mut self.position, lan)
                    .map_err(|err| format!("stopped applying moves: {err}"))?;
                apply_move(&mut self.position, mv, &mut undo);
            }
        }

        Ok(())
    }

    fn handle_go(&mut self, line: &str, out: &mut impl Write) -> io::Result<()> {
        let limits = parse_go_limits(line);

        let report = iterative_deepening(
            &mut self.position,
            self.evaluator.as_mut(),
            &mut self.ctx,
            &limits,
        );

        for info in &report.info_lines {
            writeln!(out, "{info}")?;
        }

        match report.best_move {
            Some(best) => writeln!(out, "bestmove {}", move_to_long_algebraic(best))?,
            None => writeln!(out, "bestmove 0000")?,
        }

        Ok(())
    }
}

impl Default for UciState {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract the supported limits from a `go` line. Clock fields are
/// tolerated but only `depth` and `movetime` steer the search; `infinite`
/// without a depth falls back to the default depth because the search is
/// synchronous.
fn parse_go_limits(line: &str) -> SearchLimits {
    let mut limits = SearchLimits::default();
    let tokens: Vec<&str> = line.split_whitespace().collect();

    let mut index = 0usize;
    while index < tokens.len() {
        match tokens[index] {
            "depth" => {
                index += 1;
                limits.depth = tokens.get(index).and_then(|text| text.parse::<u32>().ok());
            }
            "movetime" => {
                index += 1;
                limits.movetime = tokens
                    .get(index)
                    .and_then(|text| text.parse::<u64>().ok())
                    .map(Duration::from_millis);
            }
            _ => {}
        }
        index += 1;
    }

    limits
}

#[cfg(test)]
mod tests {
    use super::{parse_go_limits, UciState};
    use crate::board::types::Color;
    use std::time::Duration;

    fn run(state: &mut UciState, line: &str) -> String {
        let mut out = Vec::<u8>::new();
        state
            .handle_command(line, &mut out)
            .expect("command I/O should not fail");
        String::from_utf8(out).expect("engine output should be UTF-8")
    }

    #[test]
    fn uci_handshake_identifies_the_engine() {
        let mut state = UciState::new();
        let output = run(&mut state, "uci");
        assert!(output.contains("id name Rowan Chess"));
        assert!(output.contains("option name Hash"));
        assert!(output.trim_end().ends_with("uciok"));

        assert_eq!(run(&mut state, "isready").trim_end(), "readyok");
    }

    #[test]
    fn position_startpos_with_moves_updates_state() {
        let mut state = UciState::new();
        let output = run(&mut state, "position startpos moves e2e4 e7e5 g1f3");
        assert!(output.is_empty());
        assert_eq!(state.position.side_to_move, Color::Black);
        assert!(state
            .position
            .to_fen()
            .starts_with("rnbqkbnr/pppp1ppp/8/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R b KQkq"));
    }

    #[test]
    fn malformed_fen_keeps_the_previous_position() {
        let mut state = UciState::new();
        run(&mut state, "position startpos moves e2e4");
        let before = state.position.clone();

        let output = run(&mut state, "position fen not/a/fen w - - 0 1");
        assert!(output.contains("info string position error"));
        assert_eq!(state.position, before);
    }

    #[test]
    fn unknown_move_keeps_the_applied_prefix() {
        let mut state = UciState::new();
        let output = run(&mut state, "position startpos moves e2e4 e7e9 d7d5");
        assert!(output.contains("info string position error"));
        // e2e4 applied, nothing after the bad move.
        assert_eq!(state.position.side_to_move, Color::Black);
        assert!(state
            .position
            .to_fen()
            .starts_with("rnbqkbnr/pppppppp/8/8/4P3/8"));
    }

    #[test]
    fn go_emits_info_lines_and_a_bestmove() {
        let mut state = UciState::new();
        run(&mut state, "position startpos");
        let output = run(&mut state, "go depth 2");

        assert!(output.contains("info depth 1 "));
        assert!(output.contains("info depth 2 "));
        let last = output.lines().last().expect("output has lines");
        assert!(last.starts_with("bestmove "));
        assert_ne!(last, "bestmove 0000");
    }

    #[test]
    fn go_on_a_mated_position_answers_null_move() {
        let mut state = UciState::new();
        run(&mut state, "position fen 7k/5KQ1/8/8/8/8/8/8 b - - 0 1");
        let output = run(&mut state, "go depth 2");
        assert!(output.contains("bestmove 0000"));
    }

    #[test]
    fn setoption_resizes_hash_and_rejects_unknown_options() {
        let mut state = UciState::new();
        assert!(run(&mut state, "setoption name Hash value 16").is_empty());
        assert!(run(&mut state, "setoption name Hash value bogus")
            .contains("info string setoption error"));
        assert!(run(&mut state, "setoption name Nonsense value 1")
            .contains("unknown option"));
    }

    #[test]
    fn ucinewgame_resets_the_position() {
        let mut state = UciState::new();
        run(&mut state, "position startpos moves e2e4");
        run(&mut state, "ucinewgame");
        assert_eq!(state.position, crate::board::position::Position::new_game());
    }

    #[test]
    fn quit_terminates_and_unknown_commands_do_not() {
        let mut state = UciState::new();
        let mut out = Vec::<u8>::new();
        assert!(!state
            .handle_command("xyzzy", &mut out)
            .expect("command should not fail"));
        assert!(state
            .handle_command("quit", &mut out)
            .expect("command should not fail"));
    }

    #[test]
    fn go_limits_parse_depth_and_movetime() {
        let limits = parse_go_limits("go depth 7 movetime 1500");
        assert_eq!(limits.depth, Some(7));
        assert_eq!(limits.movetime, Some(Duration::from_millis(1500)));

        let limits = parse_go_limits("go wtime 60000 btime 60000");
        assert_eq!(limits.depth, None);
        assert_eq!(limits.movetime, None);
    }
}
