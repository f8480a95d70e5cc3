//! Board state representation.
//!
//! `Position` is the one long-lived model the whole engine mutates in
//! place: twelve piece bitboards, the two en-passant boards, castling
//! rights, a mailbox kept consistent with the bitboards, the redundant
//! occupancy union and the incrementally maintained Zobrist hash.

use crate::bitboard::{pop_lsb, popcount};
use crate::board::types::{CastlingRights, Color, Square, NUM_PIECES, NUM_SQUARES};
use crate::board::zobrist;
use crate::utils::fen::{generate_fen, parse_fen};

pub const STARTING_POSITION_FEN: &str =
    "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    /// One board per piece index (`kind + 6·color`). Pairwise disjoint;
    /// their union equals `occupancy`.
    pub piece_bb: [u64; NUM_PIECES],
    /// En-passant target squares per color. The board at `c` carries at most
    /// one bit: the square behind a pawn of color `c` that just double
    /// pushed. At most one of the two boards is nonzero.
    pub ep_bb: [u64; 2],
    pub castle: CastlingRights,
    pub side_to_move: Color,
    /// Square -> piece index, `None` when empty. Redundant with `piece_bb`.
    pub mailbox: [Option<u8>; NUM_SQUARES],
    /// Union of all twelve piece boards.
    pub occupancy: u64,
    /// Zobrist hash over pieces, castling rights, ep file and side to move.
    pub hash: u64,

    pub halfmove_clock: u16,
    pub fullmove_number: u16,
}

impl Position {
    pub fn empty() -> Self {
        Position {
            piece_bb: [0; NUM_PIECES],
            ep_bb: [0; 2],
            castle: 0,
            side_to_move: Color::White,
            mailbox: [None; NUM_SQUARES],
            occupancy: 0,
            hash: 0,
            halfmove_clock: 0,
            fullmove_number: 1,
        }
    }

    #[inline]
    pub fn new_game() -> Self {
        parse_fen(STARTING_POSITION_FEN).expect("starting FEN should always parse")
    }

    #[inline]
    pub fn from_fen(fen: &str) -> Result<Self, String> {
        parse_fen(fen)
    }

    #[inline]
    pub fn to_fen(&self) -> String {
        generate_fen(self)
    }

    #[inline]
    pub fn piece_at(&self, square: Square) -> Option<u8> {
        self.mailbox[square as usize]
    }

    #[inline]
    pub fn king_square(&self, color: Color) -> Square {
        let king_bb = self.piece_bb[5 + 6 * color.index()];
        debug_assert!(king_bb != 0, "position has no {color:?} king");
        king_bb.trailing_zeros() as Square
    }

    /// Rebuild `occupancy`, `mailbox` and `hash` from the piece boards.
    /// Used after bulk setup (FEN); incremental updates keep them in sync
    /// during play.
    pub fn rebuild_derived_state(&mut self) {
        self.occupancy = self.piece_bb.iter().fold(0u64, |acc, bb| acc | bb);

        self.mailbox = [None; NUM_SQUARES];
        for piece in 0..NUM_PIECES as u8 {
            let mut bb = self.piece_bb[piece as usize];
            while bb != 0 {
                let square = pop_lsb(&mut bb);
                self.mailbox[square as usize] = Some(piece);
            }
        }

        self.hash = zobrist::compute_hash(self);
    }

    /// Structural invariants of the representation. Exercised by tests and
    /// debug assertions; release builds never call this on the hot path.
    pub fn is_consistent(&self) -> bool {
        let mut union = 0u64;
        for (i, &bb) in self.piece_bb.iter().enumerate() {
            for other in &self.piece_bb[i + 1..] {
                if bb & other != 0 {
                    return false;
                }
            }
            union |= bb;
        }
        if union != self.occupancy {
            return false;
        }

        for square in 0..NUM_SQUARES {
            let from_boards = (0..NUM_PIECES as u8)
                .find(|&piece| self.piece_bb[piece as usize] & (1u64 << square) != 0);
            if from_boards != self.mailbox[square] {
                return false;
            }
        }

        if popcount(self.ep_bb[0]) + popcount(self.ep_bb[1]) > 1 {
            return false;
        }

        self.hash == zobrist::compute_hash(self)
    }
}
