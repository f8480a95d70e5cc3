//! Transposition table: a direct-mapped, always-replace cache of search
//! results keyed by Zobrist hash.
//!
//! Each slot stores the searched depth, the score with its bound kind and
//! the best move found, which doubles as a move-ordering hint even when the
//! stored depth is too shallow to cut off. A slot whose hash does not match
//! the probe is a miss, never a partial answer.

use crate::board::moves::Move;
use crate::search::{MATE_THRESHOLD, MAX_PLY};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Exact,
    Lower,
    Upper,
}

#[derive(Debug, Clone, Copy)]
pub struct TTEntry {
    pub hash: u64,
    pub depth: u32,
    pub score: i32,
    pub bound: Bound,
    pub best_move: Move,
}

/// Outcome of a probe: a usable score (window-closing or exact) and/or the
/// stored best move as an ordering hint.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProbeOutcome {
    pub score: Option<i32>,
    pub hint: Option<Move>,
}

#[derive(Debug, Clone)]
pub struct TranspositionTable {
    entries: Vec<Option<TTEntry>>,
    mask: usize,
}

pub const DEFAULT_ENTRIES: usize = 1 << 20;

impl TranspositionTable {
    /// `entry_count` is rounded up to a power of two.
    pub fn with_entries(entry_count: usize) -> Self {
        let entry_count = entry_count.next_power_of_two().max(2);
        TranspositionTable {
            entries: vec![None; entry_count],
            mask: entry_count - 1,
        }
    }

    pub fn with_mb(size_mb: usize) -> Self {
        let bytes = size_mb.max(1) * 1024 * 1024;
        let slot_size = std::mem::size_of::<Option<TTEntry>>().max(1);
        Self::with_entries((bytes / slot_size).max(2))
    }

    pub fn new() -> Self {
        Self::with_entries(DEFAULT_ENTRIES)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.fill(None);
    }

    #[inline]
    fn index(&self, hash: u64) -> usize {
        hash as usize & self.mask
    }

    /// Probe at a node with the remaining `depth` and the current window.
    /// A sufficiently deep entry may answer outright (Exact, or a bound
    /// that closes the window) or tighten `alpha`/`beta` in place. The
    /// stored move is returned as a hint on any hash match.
    pub fn probe(
        &self,
        hash: u64,
        depth: u32,
        alpha: &mut i32,
        beta: &mut i32,
        ply: usize,
    ) -> ProbeOutcome {
        let mut outcome = ProbeOutcome::default();

        let Some(entry) = &self.entries[self.index(hash)] else {
            return outcome;
        };
        if entry.hash != hash {
            return outcome;
        }

        if !entry.best_move.is_null() {
            outcome.hint = Some(entry.best_move);
        }

        if entry.depth >= depth {
            let score = score_from_storage(entry.score, ply);
            match entry.bound {
                Bound::Exact => {
                    outcome.score = Some(score);
                    return outcome;
                }
                Bound::Lower => *alpha = (*alpha).max(score),
                Bound::Upper => *beta = (*beta).min(score),
            }
            if *alpha >= *beta {
                outcome.score = Some(score);
            }
        }

        outcome
    }

    /// Store a finished node. The bound is derived from where the score
    /// landed relative to the original window: at or below the original
    /// alpha it is an upper bound, at or above the original beta a lower
    /// bound, otherwise exact.
    pub fn store(
        &mut self,
        hash: u64,
        depth: u32,
        score: i32,
        original_alpha: i32,
        original_beta: i32,
        best_move: Option<Move>,
        ply: usize,
    ) {
        let bound = if score <= original_alpha {
            Bound::Upper
        } else if score >= original_beta {
            Bound::Lower
        } else {
            Bound::Exact
        };

        let index = self.index(hash);
        self.entries[index] = Some(TTEntry {
            hash,
            depth,
            score: score_for_storage(score, ply),
            bound,
            best_move: best_move.unwrap_or(Move::NULL),
        });
    }
}

impl Default for TranspositionTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Mate scores are ply-relative inside the search. Normalize them to
/// root-distance before storing so an entry stays valid when reached at a
/// different ply, and back again on probe.
#[inline]
fn score_for_storage(score: i32, ply: usize) -> i32 {
    if score >= MATE_THRESHOLD {
        score + ply as i32
    } else if score <= -MATE_THRESHOLD {
        score - ply as i32
    } else {
        score
    }
}

#[inline]
fn score_from_storage(score: i32, ply: usize) -> i32 {
    if score >= MATE_THRESHOLD {
        score - ply as i32
    } else if score <= -MATE_THRESHOLD {
        score + ply as i32
    } else {
        score
    }
}

// Storage normalization must stay well inside the mate band.
const _: () = assert!(MATE_THRESHOLD > MAX_PLY as i32);

#[cfg(test)]
mod tests {
    use super::{score_for_storage, score_from_storage, Bound, TranspositionTable};
    use crate::board::moves::Move;
    use crate::board::types::WHITE_KNIGHT;
    use crate::search::{INF, MATE_SCORE};

    fn probe_plain(tt: &TranspositionTable, hash: u64, depth: u32) -> super::ProbeOutcome {
        let mut alpha = -INF;
        let mut beta = INF;
        tt.probe(hash, depth, &mut alpha, &mut beta, 0)
    }

    #[test]
    fn store_then_probe_round_trips_an_exact_entry() {
        let mut tt = TranspositionTable::with_entries(1 << 10);
        let mv = Move::new(WHITE_KNIGHT, 1, 18);
        tt.store(0xABCD, 5, 42, -INF, INF, Some(mv), 0);

        let outcome = probe_plain(&tt, 0xABCD, 5);
        assert_eq!(outcome.score, Some(42));
        assert_eq!(outcome.hint, Some(mv));
    }

    #[test]
    fn shallow_entries_only_supply_the_move_hint() {
        let mut tt = TranspositionTable::with_entries(1 << 10);
        let mv = Move::new(WHITE_KNIGHT, 1, 18);
        tt.store(7, 3, 10, -INF, INF, Some(mv), 0);

        let outcome = probe_plain(&tt, 7, 6);
        assert_eq!(outcome.score, None);
        assert_eq!(outcome.hint, Some(mv));
    }

    #[test]
    fn bounds_tighten_the_window_and_close_it_when_crossed() {
        let mut tt = TranspositionTable::with_entries(1 << 10);
        // score >= original beta: lower bound of 80.
        tt.store(11, 4, 80, -100, 50, None, 0);

        let mut alpha = -30;
        let mut beta = 100;
        let outcome = tt.probe(11, 4, &mut alpha, &mut beta, 0);
        assert_eq!(outcome.score, None);
        assert_eq!(alpha, 80, "lower bound raises alpha");

        let mut alpha = -30;
        let mut beta = 60;
        let outcome = tt.probe(11, 4, &mut alpha, &mut beta, 0);
        assert_eq!(outcome.score, Some(80), "alpha >= beta returns the score");
    }

    #[test]
    fn upper_bound_is_stored_when_score_fails_low() {
        let mut tt = TranspositionTable::with_entries(1 << 10);
        tt.store(13, 4, -20, 0, 50, None, 0);

        let mut alpha = -INF;
        let mut beta = INF;
        tt.probe(13, 4, &mut alpha, &mut beta, 0);
        assert_eq!(beta, -20, "upper bound lowers beta");
        assert_eq!(alpha, -INF);
    }

    #[test]
    fn hash_collision_in_the_same_slot_is_a_miss() {
        let mut tt = TranspositionTable::with_entries(1 << 4);
        tt.store(0x10, 6, 99, -INF, INF, None, 0);
        // Same slot (same low bits), different hash.
        let outcome = probe_plain(&tt, 0x10 + (1 << 40), 1);
        assert_eq!(outcome.score, None);
        assert_eq!(outcome.hint, None);
    }

    #[test]
    fn always_replace_overwrites_the_slot() {
        let mut tt = TranspositionTable::with_entries(1 << 4);
        tt.store(0x20, 9, 1, -INF, INF, None, 0);
        tt.store(0x20 + (1 << 30), 1, 2, -INF, INF, None, 0);
        assert_eq!(probe_plain(&tt, 0x20, 1).score, None, "old entry evicted");
        assert_eq!(probe_plain(&tt, 0x20 + (1 << 30), 1).score, Some(2));
    }

    #[test]
    fn mate_scores_normalize_through_storage() {
        let ply = 7usize;
        let winning = MATE_SCORE - 12;
        let losing = -MATE_SCORE + 9;
        assert_eq!(score_from_storage(score_for_storage(winning, ply), ply), winning);
        assert_eq!(score_from_storage(score_for_storage(losing, ply), ply), losing);

        // An entry stored from ply 3 probed at ply 5 moves the mate two
        // plies further away.
        let stored = score_for_storage(MATE_SCORE - 4, 3);
        assert_eq!(score_from_storage(stored, 5), MATE_SCORE - 6);
    }

    #[test]
    fn bound_kinds_follow_the_window_convention() {
        let mut tt = TranspositionTable::with_entries(1 << 4);
        tt.store(1, 1, 5, 10, 20, None, 0);
        let entry = probe_entry(&tt, 1);
        assert_eq!(entry, Bound::Upper);

        tt.store(2, 1, 25, 10, 20, None, 0);
        assert_eq!(probe_entry(&tt, 2), Bound::Lower);

        tt.store(3, 1, 15, 10, 20, None, 0);
        assert_eq!(probe_entry(&tt, 3), Bound::Exact);
    }

    fn probe_entry(tt: &TranspositionTable, hash: u64) -> Bound {
        tt.entries[hash as usize & tt.mask]
            .as_ref()
            .expect("entry should exist")
            .bound
    }
}
