//! Long algebraic move notation (`e2e4`, `a7a8q`) as used by UCI.

use crate::board::moves::Move;
use crate::board::position::Position;
use crate::board::types::{piece_kind, PieceKind};
use crate::movegen::generator::{generate_legal, MoveList};
use crate::utils::algebraic::algebraic_to_square;

/// Format a move in long algebraic notation.
pub fn move_to_long_algebraic(mv: Move) -> String {
    let mut out = String::with_capacity(5);
    out.push(char::from(b'a' + mv.from % 8));
    out.push(char::from(b'1' + mv.from / 8));
    out.push(char::from(b'a' + mv.to % 8));
    out.push(char::from(b'1' + mv.to / 8));

    if mv.is_promotion() {
        out.push(match piece_kind(mv.promotion) {
            PieceKind::Knight => 'n',
            PieceKind::Bishop => 'b',
            PieceKind::Rook => 'r',
            _ => 'q',
        });
    }

    out
}

/// Resolve long algebraic notation against the legal moves of the
/// position, so castling, en-passant and double-push flags come from the
/// generator rather than being re-derived here.
pub fn long_algebraic_to_move(position: &mut Position, lan: &str) -> Result<Move, String> {
    let bytes = lan.as_bytes();
    if bytes.len() != 4 && bytes.len() != 5 {
        return Err(format!("Invalid long algebraic move: {lan}"));
    }

    let from = algebraic_to_square(&lan[0..2])?;
    let to = algebraic_to_square(&lan[2..4])?;
    let promotion_kind = if bytes.len() == 5 {
        Some(match bytes[4].to_ascii_lowercase() {
            b'n' => PieceKind::Knight,
            b'b' => PieceKind::Bishop,
            b'r' => PieceKind::Rook,
            b'q' => PieceKind::Queen,
            other => {
                return Err(format!(
                    "Invalid promotion piece character: {}",
                    other as char
                ))
            }
        })
    } else {
        None
    };

    let mut legal = MoveList::new();
    generate_legal(position, &mut legal);

    legal
        .iter()
        .copied()
        .find(|mv| {
            mv.from == from
                && mv.to == to
                && match promotion_kind {
                    Some(kind) => mv.is_promotion() && piece_kind(mv.promotion) == kind,
                    None => !mv.is_promotion(),
                }
        })
        .ok_or_else(|| format!("Move {lan} is not legal here"))
}

#[cfg(test)]
mod tests {
    use super::{long_algebraic_to_move, move_to_long_algebraic};
    use crate::board::position::Position;

    #[test]
    fn round_trips_a_simple_double_push() {
        let mut position = Position::new_game();
        let mv = long_algebraic_to_move(&mut position, "e2e4").expect("move should resolve");
        assert!(mv.creates_ep);
        assert_eq!(move_to_long_algebraic(mv), "e2e4");
    }

    #[test]
    fn round_trips_a_promotion() {
        let mut position =
            Position::from_fen("8/P7/8/8/8/8/8/k6K w - - 0 1").expect("FEN should parse");
        let mv = long_algebraic_to_move(&mut position, "a7a8q").expect("move should resolve");
        assert!(mv.is_promotion());
        assert_eq!(move_to_long_algebraic(mv), "a7a8q");

        assert!(long_algebraic_to_move(&mut position, "a7a8").is_err());
    }

    #[test]
    fn resolves_castling_and_en_passant_flags_from_the_generator() {
        let mut castle_position =
            Position::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").expect("FEN parse");
        let castle = long_algebraic_to_move(&mut castle_position, "e1g1").expect("castle resolves");
        assert!(castle.castles);

        let mut ep_position =
            Position::from_fen("4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 1").expect("FEN parse");
        let ep = long_algebraic_to_move(&mut ep_position, "e5d6").expect("ep capture resolves");
        assert!(!ep.castles);
        assert_eq!(ep.to, 43);
    }

    #[test]
    fn rejects_illegal_and_malformed_moves() {
        let mut position = Position::new_game();
        assert!(long_algebraic_to_move(&mut position, "e2e5").is_err());
        assert!(long_algebraic_to_move(&mut position, "e7e5").is_err());
        assert!(long_algebraic_to_move(&mut position, "e2").is_err());
        assert!(long_algebraic_to_move(&mut position, "e2e4x").is_err());
    }
}
