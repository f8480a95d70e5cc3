//! Iterative-deepening driver.
//!
//! Runs the alpha-beta search at depths 1, 2, ... up to the requested
//! depth or until the wall-clock budget expires, keeping the
//! transposition table, killer and history tables threaded across
//! iterations. The previous iteration's best move is searched first at the
//! root. An iteration cut short by the clock is discarded wholesale; the
//! answer always comes from the deepest completed iteration.

use std::time::{Duration, Instant};

use crate::board::make_move::{apply_move, undo_move, Undo};
use crate::board::moves::Move;
use crate::board::position::Position;
use crate::eval::material::PIECE_VALUES;
use crate::eval::Evaluator;
use crate::movegen::generator::{generate_legal, in_check, MoveList};
use crate::search::alpha_beta::{negamax, PvLine, SearchContext};
use crate::search::{is_mate_score, mate_in_moves, INF, MATE_SCORE, MAX_PLY};
use crate::utils::long_algebraic::move_to_long_algebraic;

/// Depth searched when `go` carries no limit at all.
pub const DEFAULT_DEPTH: u32 = 6;

#[derive(Debug, Clone, Copy, Default)]
pub struct SearchLimits {
    pub depth: Option<u32>,
    pub movetime: Option<Duration>,
}

#[derive(Debug, Clone, Default)]
pub struct SearchReport {
    pub best_move: Option<Move>,
    /// Score of `best_move` from the side to move's point of view.
    pub score: i32,
    /// Deepest fully completed iteration.
    pub depth: u32,
    pub nodes: u64,
    pub elapsed: Duration,
    pub pv: Vec<Move>,
    /// One UCI `info` line per completed iteration.
    pub info_lines: Vec<String>,
}

pub fn iterative_deepening(
    position: &mut Position,
    evaluator: &mut dyn Evaluator,
    ctx: &mut SearchContext,
    limits: &SearchLimits,
) -> SearchReport {
    let started = Instant::now();
    let deadline = limits.movetime.map(|budget| started + budget);
    ctx.begin_search(deadline);
    evaluator.reset(position);

    let max_depth = limits
        .depth
        .unwrap_or(DEFAULT_DEPTH)
        .clamp(1, (MAX_PLY - 1) as u32);

    let mut report = SearchReport::default();

    let mut root_list = MoveList::new();
    generate_legal(position, &mut root_list);
    let mut root_moves: Vec<Move> = root_list.iter().copied().collect();

    if root_moves.is_empty() {
        report.score = if in_check(position, position.side_to_move) {
            -MATE_SCORE
        } else {
            0
        };
        report.elapsed = started.elapsed();
        return report;
    }

    let mut buffers = std::mem::take(&mut ctx.buffers);
    let mut previous_best: Option<Move> = None;

    for depth in 1..=max_depth {
        // The budget is polled between iterations; inside the tree the
        // node-sampled check in `SearchContext` takes over.
        if deadline.is_some_and(|limit| Instant::now() >= limit) {
            break;
        }

        order_root_moves(&mut root_moves, position, previous_best);

        let mut iteration_best: Option<(Move, i32)> = None;
        let mut iteration_pv = PvLine::new();
        let mut child_pv = PvLine::new();
        let mut alpha = -INF;
        let mut undo = Undo::default();
        let mut aborted = false;

        for &mv in &root_moves {
            apply_move(position, mv, &mut undo);
            evaluator.push(position, mv, &undo);
            let result = negamax(
                position,
                evaluator,
                ctx,
                &mut buffers,
                depth - 1,
                -INF,
                -alpha,
                1,
                true,
                &mut child_pv,
            );
            evaluator.pop();
            undo_move(position, mv, &undo);

            let Some(score) = result.map(|value| -value) else {
                aborted = true;
                break;
            };

            if iteration_best.map_or(true, |(_, best)| score > best) {
                iteration_best = Some((mv, score));
                iteration_pv.assign(mv, &child_pv);
            }
            if score > alpha {
                alpha = score;
            }
        }

        if aborted {
            break;
        }

        let (best_move, score) = iteration_best.expect("root move list is non-empty");
        report.best_move = Some(best_move);
        report.score = score;
        report.depth = depth;
        report.nodes = ctx.nodes;
        report.pv = iteration_pv.moves[..iteration_pv.len].to_vec();
        report.elapsed = started.elapsed();
        report.info_lines.push(format_info_line(&report));
        previous_best = Some(best_move);
    }

    ctx.buffers = buffers;
    report.elapsed = started.elapsed();
    report
}

/// Root ordering: the previous iteration's best move first, then captures
/// by most-valuable-victim / least-valuable-attacker.
fn order_root_moves(moves: &mut [Move], position: &Position, previous_best: Option<Move>) {
    moves.sort_by_cached_key(|&mv| {
        if previous_best.is_some_and(|best| mv.same_action(best)) {
            return -INF;
        }
        match position.piece_at(mv.to) {
            Some(victim) => {
                let victim_value = PIECE_VALUES[(victim % 6) as usize];
                let attacker_value = PIECE_VALUES[(mv.piece % 6) as usize];
                -(victim_value * 10 - attacker_value)
            }
            None => 0,
        }
    });
}

fn format_info_line(report: &SearchReport) -> String {
    let millis = report.elapsed.as_millis() as u64;
    let nps = if millis == 0 {
        0
    } else {
        report.nodes.saturating_mul(1000) / millis
    };
    let score_text = if is_mate_score(report.score) {
        format!("mate {}", mate_in_moves(report.score))
    } else {
        format!("cp {}", report.score)
    };
    let pv_text = report
        .pv
        .iter()
        .map(|&mv| move_to_long_algebraic(mv))
        .collect::<Vec<_>>()
        .join(" ");

    format!(
        "info depth {} score {} nodes {} nps {} time {} pv {}",
        report.depth, score_text, report.nodes, nps, millis, pv_text
    )
}
