//! Perft: exhaustive legal-move tree counting.
//!
//! The node totals for the standard verification positions are fixed
//! constants agreed on by every correct move generator; the tests here
//! reproduce them exactly.

use crate::board::make_move::{apply_move, undo_move, Undo};
use crate::board::position::Position;
use crate::movegen::generator::{generate_pseudo_legal, in_check, MoveList};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PerftCounts {
    pub nodes: u64,
    pub captures: u64,
    pub en_passant: u64,
    pub castles: u64,
    pub promotions: u64,
}

impl PerftCounts {
    fn merge(&mut self, rhs: PerftCounts) {
        self.nodes += rhs.nodes;
        self.captures += rhs.captures;
        self.en_passant += rhs.en_passant;
        self.castles += rhs.castles;
        self.promotions += rhs.promotions;
    }
}

/// Count leaf nodes (and leaf tactical events) of the legal move tree.
pub fn perft(position: &mut Position, depth: u8) -> PerftCounts {
    if depth == 0 {
        return PerftCounts {
            nodes: 1,
            ..PerftCounts::default()
        };
    }

    let mut total = PerftCounts::default();
    let side = position.side_to_move;
    let mut moves = MoveList::new();
    generate_pseudo_legal(position, side, &mut moves);

    let mut undo = Undo::default();
    for &mv in moves.iter() {
        apply_move(position, mv, &mut undo);

        if !in_check(position, side) {
            if depth == 1 {
                total.merge(PerftCounts {
                    nodes: 1,
                    captures: u64::from(undo.captured.is_some()),
                    en_passant: u64::from(undo.ep_capture),
                    castles: u64::from(mv.castles),
                    promotions: u64::from(mv.is_promotion()),
                });
            } else {
                total.merge(perft(position, depth - 1));
            }
        }

        undo_move(position, mv, &undo);
    }

    total
}
