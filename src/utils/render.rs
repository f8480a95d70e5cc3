//! Terminal-oriented Unicode board renderer for debugging and tests.

use crate::board::position::Position;
use crate::board::types::Color;

/// Render the board to a Unicode string, rank 8 at the top.
pub fn render_position(position: &Position) -> String {
    let mut out = String::new();

    out.push_str("  a b c d e f g h\n");

    for rank in (0..8u8).rev() {
        out.push(char::from(b'1' + rank));
        out.push(' ');

        for file in 0..8u8 {
            let square = rank * 8 + file;
            match position.piece_at(square) {
                Some(piece) => out.push(piece_to_unicode(piece)),
                None => out.push('·'),
            }
            if file < 7 {
                out.push(' ');
            }
        }

        out.push(' ');
        out.push(char::from(b'1' + rank));
        out.push('\n');
    }

    out.push_str("  a b c d e f g h\n");
    out.push_str(match position.side_to_move {
        Color::White => "white to move",
        Color::Black => "black to move",
    });

    out
}

fn piece_to_unicode(piece: u8) -> char {
    match piece {
        0 => '♙',
        1 => '♘',
        2 => '♗',
        3 => '♖',
        4 => '♕',
        5 => '♔',
        6 => '♟',
        7 => '♞',
        8 => '♝',
        9 => '♜',
        10 => '♛',
        _ => '♚',
    }
}

#[cfg(test)]
mod tests {
    use super::render_position;
    use crate::board::position::Position;

    #[test]
    fn renders_startpos_with_all_pieces() {
        let rendered = render_position(&Position::new_game());
        assert_eq!(rendered.matches('♙').count(), 8);
        assert_eq!(rendered.matches('♟').count(), 8);
        assert!(rendered.ends_with("white to move"));
    }
}
