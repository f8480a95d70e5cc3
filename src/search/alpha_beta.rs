//! Negamax alpha-beta search.
//!
//! Side-relative scores: positive is good for the side to move. An interior
//! node probes the transposition table, tries a null move, then walks the
//! ordered move list with legality filtering and late-move reductions.
//! Per-ply move buffers are threaded down the recursion as a slice that is
//! split one level at a time, so no node ever allocates.
//!
//! Every search function returns `Option<i32>`; `None` means the time
//! budget expired mid-search and the whole iteration's result must be
//! discarded by the driver.

use std::time::Instant;

use crate::bitboard::{file_of, lsb};
use crate::board::make_move::{apply_move, undo_move, Undo};
use crate::board::moves::Move;
use crate::board::position::Position;
use crate::board::types::Color;
use crate::board::zobrist;
use crate::eval::material::PIECE_VALUES;
use crate::eval::Evaluator;
use crate::movegen::generator::{generate_pseudo_legal, in_check, MoveList};
use crate::search::transposition::TranspositionTable;
use crate::search::{INF, MATE_SCORE, MAX_PLY};

const TT_MOVE_ORDER_BONUS: i32 = 10_000;
const KILLER_ORDER_BONUS: i32 = 9_500;
const HISTORY_CAP: i32 = 100_000;

/// Null-move pruning applies from this depth and reduces by two extra
/// plies (the child searches `depth - 3`).
const NULL_MOVE_MIN_DEPTH: u32 = 3;

/// Persistent search state: the transposition table, killer and history
/// tables, the per-ply move buffers and the cooperative time control.
/// Lives for a whole game; `ucinewgame` resets it.
pub struct SearchContext {
    pub tt: TranspositionTable,
    pub(crate) buffers: Vec<MoveList>,
    killers: [[Move; 2]; MAX_PLY],
    history: [[i32; 64]; 64],
    pub nodes: u64,
    deadline: Option<Instant>,
    stopped: bool,
}

impl SearchContext {
    pub fn new() -> Self {
        SearchContext {
            tt: TranspositionTable::new(),
            buffers: vec![MoveList::new(); MAX_PLY],
            killers: [[Move::NULL; 2]; MAX_PLY],
            history: [[0; 64]; 64],
            nodes: 0,
            deadline: None,
            stopped: false,
        }
    }

    /// Drop all memory of previous games.
    pub fn new_game(&mut self) {
        self.tt.clear();
        self.killers = [[Move::NULL; 2]; MAX_PLY];
        self.history = [[0; 64]; 64];
        self.nodes = 0;
    }

    /// Resize the transposition table (UCI `Hash` option). Clears it.
    pub fn set_hash_mb(&mut self, size_mb: usize) {
        self.tt = TranspositionTable::with_mb(size_mb);
    }

    /// Arm the wall-clock budget for one `go`. Killers, history and the
    /// transposition table deliberately survive between searches.
    pub fn begin_search(&mut self, deadline: Option<Instant>) {
        self.deadline = deadline;
        self.stopped = false;
        self.nodes = 0;
    }

    /// Cooperative cancellation, sampled every 1024 nodes so the clock is
    /// not read at every node.
    #[inline]
    pub fn should_stop(&mut self) -> bool {
        if self.stopped {
            return true;
        }
        if self.nodes & 1023 == 0 {
            if let Some(deadline) = self.deadline {
                if Instant::now() >= deadline {
                    self.stopped = true;
                }
            }
        }
        self.stopped
    }

    #[inline]
    fn killers_at(&self, ply: usize) -> [Move; 2] {
        self.killers[ply]
    }

    /// Promote a cutoff move into killer slot 0, demoting the previous
    /// occupant unless it is the same move.
    fn record_killer(&mut self, ply: usize, mv: Move) {
        if self.killers[ply][0].same_action(mv) {
            return;
        }
        self.killers[ply][1] = self.killers[ply][0];
        self.killers[ply][0] = mv;
    }

    fn record_history(&mut self, mv: Move, depth: u32) {
        let bonus = (depth * depth) as i32;
        let entry = &mut self.history[mv.from as usize][mv.to as usize];
        *entry = (*entry + bonus).min(HISTORY_CAP);
    }

    #[inline]
    fn history_score(&self, mv: Move) -> i32 {
        self.history[mv.from as usize][mv.to as usize]
    }
}

impl Default for SearchContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Principal variation collected on the way back up: this node's best move
/// prefixed to the child's line.
#[derive(Clone)]
pub struct PvLine {
    pub moves: [Move; MAX_PLY],
    pub len: usize,
}

impl PvLine {
    pub fn new() -> Self {
        PvLine {
            moves: [Move::NULL; MAX_PLY],
            len: 0,
        }
    }

    #[inline]
    pub(crate) fn assign(&mut self, mv: Move, child: &PvLine) {
        self.moves[0] = mv;
        let child_len = child.len.min(MAX_PLY - 1);
        self.moves[1..=child_len].copy_from_slice(&child.moves[..child_len]);
        self.len = child_len + 1;
    }
}

impl Default for PvLine {
    fn default() -> Self {
        Self::new()
    }
}

/// Alpha-beta negamax over the remaining `depth`. `buffers` holds one move
/// list per remaining ply; `allow_null` is false directly after a null
/// move so two never chain.
#[allow(clippy::too_many_arguments)]
pub fn negamax(
    position: &mut Position,
    evaluator: &mut dyn Evaluator,
    ctx: &mut SearchContext,
    buffers: &mut [MoveList],
    depth: u32,
    mut alpha: i32,
    mut beta: i32,
    ply: usize,
    allow_null: bool,
    pv: &mut PvLine,
) -> Option<i32> {
    if ctx.should_stop() {
        return None;
    }
    ctx.nodes += 1;

    if depth == 0 || ply >= MAX_PLY - 1 {
        pv.len = 0;
        return Some(position.side_to_move.sign() * evaluator.evaluate(position));
    }

    let probe = ctx.tt.probe(position.hash, depth, &mut alpha, &mut beta, ply);
    if let Some(score) = probe.score {
        pv.len = 0;
        if let Some(hint) = probe.hint {
            pv.moves[0] = hint;
            pv.len = 1;
        }
        return Some(score);
    }
    let tt_move = probe.hint;

    // Bound classification at the store below is relative to the window
    // actually searched, after any table-driven tightening.
    let original_alpha = alpha;
    let original_beta = beta;

    let side = position.side_to_move;
    let node_in_check = in_check(position, side);

    let (current, child_buffers) = buffers.split_at_mut(1);
    let moves = &mut current[0];
    let mut child_pv = PvLine::new();

    // Null-move pruning: hand the opponent a free move and search a
    // reduced zero-width window. Skipped in check and in pawn-only
    // endgames, where zugzwang makes the pass unsound.
    if allow_null
        && depth >= NULL_MOVE_MIN_DEPTH
        && !node_in_check
        && has_non_pawn_material(position, side)
    {
        let null_undo = make_null_move(position);
        let result = negamax(
            position,
            evaluator,
            ctx,
            child_buffers,
            depth - NULL_MOVE_MIN_DEPTH,
            -beta,
            -beta + 1,
            ply + 1,
            false,
            &mut child_pv,
        );
        unmake_null_move(position, &null_undo);

        let score = -result?;
        if score >= beta {
            return Some(score);
        }
    }

    generate_pseudo_legal(position, side, moves);
    order_moves(
        moves.as_mut_slice(),
        position,
        tt_move,
        ctx.killers_at(ply),
        &ctx.history,
    );

    let mut best = -INF;
    let mut best_move: Option<Move> = None;
    let mut legal_moves = 0u32;
    let mut undo = Undo::default();

    for index in 0..moves.len() {
        let mv = moves.as_slice()[index];

        apply_move(position, mv, &mut undo);
        if in_check(position, side) {
            undo_move(position, mv, &undo);
            continue;
        }
        evaluator.push(position, mv, &undo);
        legal_moves += 1;

        let quiet = undo.captured.is_none() && !mv.is_promotion();

        // Late-move reduction: after two legal moves have been searched at
        // a quiet, out-of-check node with depth to spare, probe one ply
        // shallower first and only re-search at full depth when the probe
        // beats alpha.
        let reduce = depth > 3 && quiet && !node_in_check && legal_moves > 2;
        let first_depth = if reduce { depth - 2 } else { depth - 1 };

        let mut result = negamax(
            position,
            evaluator,
            ctx,
            child_buffers,
            first_depth,
            -beta,
            -alpha,
            ply + 1,
            true,
            &mut child_pv,
        )
        .map(|score| -score);

        if reduce && result.is_some_and(|score| score > alpha) {
            result = negamax(
                position,
                evaluator,
                ctx,
                child_buffers,
                depth - 1,
                -beta,
                -alpha,
                ply + 1,
                true,
                &mut child_pv,
            )
            .map(|score| -score);
        }

        evaluator.pop();
        undo_move(position, mv, &undo);

        let Some(score) = result else {
            return None;
        };

        if score > best {
            best = score;
            best_move = Some(mv);
            pv.assign(mv, &child_pv);
        }
        if score > alpha {
            alpha = score;
        }
        if alpha >= beta {
            if quiet {
                ctx.record_killer(ply, mv);
                ctx.record_history(mv, depth);
            }
            break;
        }
    }

    if legal_moves == 0 {
        pv.len = 0;
        // Checkmate scores shrink with ply so nearer mates dominate.
        return Some(if node_in_check {
            -MATE_SCORE + ply as i32
        } else {
            0
        });
    }

    ctx.tt.store(
        position.hash,
        depth,
        best,
        original_alpha,
        original_beta,
        best_move,
        ply,
    );

    Some(best)
}

/// Move-ordering key, highest first: transposition move, killer moves,
/// captures by most-valuable-victim / least-valuable-attacker, then quiet
/// history.
fn order_moves(
    moves: &mut [Move],
    position: &Position,
    tt_move: Option<Move>,
    killers: [Move; 2],
    history: &[[i32; 64]; 64],
) {
    moves.sort_by_cached_key(|&mv| -order_score(mv, position, tt_move, killers, history));
}

fn order_score(
    mv: Move,
    position: &Position,
    tt_move: Option<Move>,
    killers: [Move; 2],
    history: &[[i32; 64]; 64],
) -> i32 {
    if tt_move.is_some_and(|hint| mv.same_action(hint)) {
        return TT_MOVE_ORDER_BONUS;
    }
    if killers.iter().any(|killer| killer.same_action(mv)) {
        return KILLER_ORDER_BONUS;
    }
    if let Some(victim) = position.piece_at(mv.to) {
        let victim_value = PIECE_VALUES[(victim % 6) as usize];
        let attacker_value = PIECE_VALUES[(mv.piece % 6) as usize];
        return victim_value * 10 - attacker_value;
    }
    history[mv.from as usize][mv.to as usize]
}

#[inline]
fn has_non_pawn_material(position: &Position, side: Color) -> bool {
    let base = 6 * side.index();
    position.piece_bb[base + 1..base + 5]
        .iter()
        .any(|&bb| bb != 0)
}

struct NullUndo {
    hash: u64,
    ep_bb: [u64; 2],
}

/// A "pass" move: flip the side to move (with its hash key) and retire any
/// en-passant target, which would otherwise leak into the opponent's turn.
fn make_null_move(position: &mut Position) -> NullUndo {
    let undo = NullUndo {
        hash: position.hash,
        ep_bb: position.ep_bb,
    };

    let ep = position.ep_bb[0] | position.ep_bb[1];
    if ep != 0 {
        position.hash ^= zobrist::en_passant_file_key(file_of(lsb(ep)));
    }
    position.ep_bb = [0, 0];
    position.side_to_move = position.side_to_move.opposite();
    position.hash ^= zobrist::side_key();

    undo
}

fn unmake_null_move(position: &mut Position, undo: &NullUndo) {
    position.side_to_move = position.side_to_move.opposite();
    position.ep_bb = undo.ep_bb;
    position.hash = undo.hash;
}
