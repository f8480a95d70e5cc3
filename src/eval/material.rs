//! Handcrafted evaluation: material plus piece-square tables.
//!
//! Tables follow the simplified evaluation function from
//! chessprogramming.org. White reads a table directly by square; Black
//! mirrors with `63 - square`. Once the combined non-king material of both
//! sides drops below the endgame threshold the king switches to a
//! centralization table.

use crate::bitboard::pop_lsb;
use crate::board::position::Position;
use crate::board::types::Color;
use crate::eval::Evaluator;

pub const PIECE_VALUES: [i32; 6] = [100, 320, 330, 500, 900, 20_000];

/// Combined (material + PST) total of both sides below which the endgame
/// king table applies.
const ENDGAME_MATERIAL_THRESHOLD: i32 = 1_400;

#[rustfmt::skip]
const PAWN_TABLE: [i32; 64] = [
     0,  0,  0,   0,   0,  0,  0,  0,
     5, 10, 10, -20, -20, 10, 10,  5,
     5, -5,-10,   0,   0,-10, -5,  5,
     0,  0,  0,  20,  20,  0,  0,  0,
     5,  5, 10,  25,  25, 10,  5,  5,
    10, 10, 20,  30,  30, 20, 10, 10,
    50, 50, 50,  50,  50, 50, 50, 50,
     0,  0,  0,   0,   0,  0,  0,  0,
];

#[rustfmt::skip]
const KNIGHT_TABLE: [i32; 64] = [
    -50,-40,-30,-30,-30,-30,-40,-50,
    -40,-20,  0,  5,  5,  0,-20,-40,
    -30,  5, 10, 15, 15, 10,  5,-30,
    -30,  0, 15, 20, 20, 15,  0,-30,
    -30,  5, 15, 20, 20, 15,  5,-30,
    -30,  0, 10, 15, 15, 10,  0,-30,
    -40,-20,  0,  0,  0,  0,-20,-40,
    -50,-40,-30,-30,-30,-30,-40,-50,
];

#[rustfmt::skip]
const BISHOP_TABLE: [i32; 64] = [
    -20,-10,-10,-10,-10,-10,-10,-20,
    -10,  5,  0,  0,  0,  0,  5,-10,
    -10, 10, 10, 10, 10, 10, 10,-10,
    -10,  0, 10, 10, 10, 10,  0,-10,
    -10,  5,  5, 10, 10,  5,  5,-10,
    -10,  0,  5, 10, 10,  5,  0,-10,
    -10,  0,  0,  0,  0,  0,  0,-10,
    -20,-10,-10,-10,-10,-10,-10,-20,
];

#[rustfmt::skip]
const ROOK_TABLE: [i32; 64] = [
     0,  0,  0,  5,  5,  0,  0,  0,
    -5,  0,  0,  0,  0,  0,  0, -5,
    -5,  0,  0,  0,  0,  0,  0, -5,
    -5,  0,  0,  0,  0,  0,  0, -5,
    -5,  0,  0,  0,  0,  0,  0, -5,
    -5,  0,  0,  0,  0,  0,  0, -5,
     5, 10, 10, 10, 10, 10, 10,  5,
     0,  0,  0,  0,  0,  0,  0,  0,
];

#[rustfmt::skip]
const QUEEN_TABLE: [i32; 64] = [
    -20,-10,-10, -5, -5,-10,-10,-20,
    -10,  0,  5,  0,  0,  0,  0,-10,
    -10,  5,  5,  5,  5,  5,  0,-10,
      0,  0,  5,  5,  5,  5,  0, -5,
     -5,  0,  5,  5,  5,  5,  0, -5,
    -10,  0,  5,  5,  5,  5,  0, -5,
    -10,  0,  0,  0,  0,  0,  0,-10,
    -20,-10,-10, -5, -5,-10,-10,-20,
];

#[rustfmt::skip]
const KING_TABLE: [i32; 64] = [
     20, 30, 10,  0,  0, 10, 30, 20,
     20, 20,  0,  0,  0,  0, 20, 20,
    -10,-20,-20,-20,-20,-20,-20,-10,
    -20,-30,-30,-40,-40,-30,-30,-20,
    -30,-40,-40,-50,-50,-40,-40,-30,
    -30,-40,-40,-50,-50,-40,-40,-30,
    -30,-40,-40,-50,-50,-40,-40,-30,
    -30,-40,-40,-50,-50,-40,-40,-30,
];

#[rustfmt::skip]
const ENDGAME_KING_TABLE: [i32; 64] = [
    -50,-30,-30,-30,-30,-30,-30,-50,
    -30,-30,  0,  0,  0,  0,-30,-30,
    -30,-10, 20, 30, 30, 20,-10,-30,
    -30,-10, 30, 40, 40, 30,-10,-30,
    -30,-10, 30, 40, 40, 30,-10,-30,
    -30,-10, 20, 30, 30, 20,-10,-30,
    -30,-20,-10,  0,  0,-10,-20,-30,
    -50,-40,-30,-20,-20,-30,-40,-50,
];

const PIECE_TABLES: [&[i32; 64]; 5] = [
    &PAWN_TABLE,
    &KNIGHT_TABLE,
    &BISHOP_TABLE,
    &ROOK_TABLE,
    &QUEEN_TABLE,
];

/// Material + piece-square evaluator.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaterialPst;

impl MaterialPst {
    fn side_score_without_king(position: &Position, color: Color) -> i32 {
        let base = 6 * color.index();
        let mut score = 0i32;

        for kind in 0..5 {
            let table = PIECE_TABLES[kind];
            let mut bb = position.piece_bb[base + kind];
            while bb != 0 {
                let square = pop_lsb(&mut bb) as usize;
                score += PIECE_VALUES[kind];
                score += match color {
                    Color::White => table[square],
                    Color::Black => table[63 - square],
                };
            }
        }

        score
    }
}

impl Evaluator for MaterialPst {
    fn evaluate(&self, position: &Position) -> i32 {
        let mut white = Self::side_score_without_king(position, Color::White);
        let mut black = Self::side_score_without_king(position, Color::Black);

        let king_table = if white + black < ENDGAME_MATERIAL_THRESHOLD {
            &ENDGAME_KING_TABLE
        } else {
            &KING_TABLE
        };

        let white_king = position.king_square(Color::White) as usize;
        let black_king = position.king_square(Color::Black) as usize;
        white += king_table[white_king];
        black += king_table[63 - black_king];

        white - black
    }
}
