//! Forsyth-Edwards Notation parsing and generation.
//!
//! Builds a fully derived `Position` (bitboards, mailbox, occupancy, hash)
//! from a FEN string and writes the six-field form back out. The clock
//! fields are optional on input; the first four fields are mandatory.

use crate::bitboard::square_bb;
use crate::board::position::Position;
use crate::board::types::{
    piece_index, Color, PieceKind, Square, CASTLE_BLACK_LONG, CASTLE_BLACK_SHORT,
    CASTLE_WHITE_LONG, CASTLE_WHITE_SHORT,
};
use crate::utils::algebraic::{algebraic_to_square, square_to_algebraic};

pub fn parse_fen(fen: &str) -> Result<Position, String> {
    let mut parts = fen.split_whitespace();

    let board_part = parts.next().ok_or("Missing board layout in FEN")?;
    let side_part = parts.next().ok_or("Missing side-to-move in FEN")?;
    let castling_part = parts.next().ok_or("Missing castling rights in FEN")?;
    let en_passant_part = parts.next().ok_or("Missing en-passant square in FEN")?;
    let halfmove_part = parts.next();
    let fullmove_part = parts.next();

    if parts.next().is_some() {
        return Err("FEN has extra trailing fields".to_owned());
    }

    let mut position = Position::empty();

    parse_board(board_part, &mut position)?;
    position.side_to_move = parse_side_to_move(side_part)?;
    position.castle = parse_castling(castling_part)?;

    if en_passant_part != "-" {
        let square = algebraic_to_square(en_passant_part)?;
        // The target belongs to the side that just double pushed.
        let pusher = position.side_to_move.opposite();
        position.ep_bb[pusher.index()] = square_bb(square);
    }

    position.halfmove_clock = match halfmove_part {
        Some(text) => text
            .parse::<u16>()
            .map_err(|_| format!("Invalid halfmove clock: {text}"))?,
        None => 0,
    };
    position.fullmove_number = match fullmove_part {
        Some(text) => text
            .parse::<u16>()
            .map_err(|_| format!("Invalid fullmove number: {text}"))?,
        None => 1,
    };

    position.rebuild_derived_state();
    Ok(position)
}

fn parse_board(board_part: &str, position: &mut Position) -> Result<(), String> {
    let ranks: Vec<&str> = board_part.split('/').collect();
    if ranks.len() != 8 {
        return Err("Board layout must contain 8 ranks".to_owned());
    }

    for (fen_rank_index, rank_text) in ranks.iter().enumerate() {
        let board_rank = 7 - fen_rank_index as u8;
        let mut file = 0u8;

        for ch in rank_text.chars() {
            if let Some(empty_count) = ch.to_digit(10) {
                if !(1..=8).contains(&empty_count) {
                    return Err(format!("Invalid empty-square count '{ch}'"));
                }
                file += empty_count as u8;
                continue;
            }

            let piece = piece_from_fen_char(ch)
                .ok_or_else(|| format!("Invalid piece character '{ch}' in board layout"))?;

            if file >= 8 {
                return Err("Board rank has too many files".to_owned());
            }

            let square = board_rank * 8 + file;
            position.piece_bb[piece as usize] |= square_bb(square);
            file += 1;
        }

        if file != 8 {
            return Err("Board rank does not sum to 8 files".to_owned());
        }
    }

    Ok(())
}

fn parse_side_to_move(side_part: &str) -> Result<Color, String> {
    match side_part {
        "w" => Ok(Color::White),
        "b" => Ok(Color::Black),
        _ => Err(format!("Invalid side-to-move field: {side_part}")),
    }
}

fn parse_castling(castling_part: &str) -> Result<u8, String> {
    if castling_part == "-" {
        return Ok(0);
    }

    let mut rights = 0u8;
    for ch in castling_part.chars() {
        match ch {
            'K' => rights |= CASTLE_WHITE_SHORT,
            'Q' => rights |= CASTLE_WHITE_LONG,
            'k' => rights |= CASTLE_BLACK_SHORT,
            'q' => rights |= CASTLE_BLACK_LONG,
            _ => return Err(format!("Invalid castling rights character: {ch}")),
        }
    }
    Ok(rights)
}

fn piece_from_fen_char(ch: char) -> Option<u8> {
    let color = if ch.is_ascii_uppercase() {
        Color::White
    } else if ch.is_ascii_lowercase() {
        Color::Black
    } else {
        return None;
    };

    let kind = match ch.to_ascii_lowercase() {
        'p' => PieceKind::Pawn,
        'n' => PieceKind::Knight,
        'b' => PieceKind::Bishop,
        'r' => PieceKind::Rook,
        'q' => PieceKind::Queen,
        'k' => PieceKind::King,
        _ => return None,
    };

    Some(piece_index(color, kind))
}

pub fn generate_fen(position: &Position) -> String {
    let board = generate_board_field(position);
    let side_to_move = match position.side_to_move {
        Color::White => "w",
        Color::Black => "b",
    };
    let castling = generate_castling_field(position.castle);
    let en_passant = generate_en_passant_field(position);

    format!(
        "{} {} {} {} {} {}",
        board,
        side_to_move,
        castling,
        en_passant,
        position.halfmove_clock,
        position.fullmove_number
    )
}

fn generate_board_field(position: &Position) -> String {
    let mut out = String::new();

    for rank in (0..8u8).rev() {
        let mut empty_count = 0u8;

        for file in 0..8u8 {
            let square = rank * 8 + file;
            if let Some(piece) = position.piece_at(square) {
                if empty_count > 0 {
                    out.push(char::from(b'0' + empty_count));
                    empty_count = 0;
                }
                out.push(piece_to_fen_char(piece));
            } else {
                empty_count += 1;
            }
        }

        if empty_count > 0 {
            out.push(char::from(b'0' + empty_count));
        }
        if rank > 0 {
            out.push('/');
        }
    }

    out
}

pub fn piece_to_fen_char(piece: u8) -> char {
    let base = match piece % 6 {
        0 => 'p',
        1 => 'n',
        2 => 'b',
        3 => 'r',
        4 => 'q',
        _ => 'k',
    };
    if piece < 6 {
        base.to_ascii_uppercase()
    } else {
        base
    }
}

fn generate_castling_field(rights: u8) -> String {
    let mut out = String::new();

    if rights & CASTLE_WHITE_SHORT != 0 {
        out.push('K');
    }
    if rights & CASTLE_WHITE_LONG != 0 {
        out.push('Q');
    }
    if rights & CASTLE_BLACK_SHORT != 0 {
        out.push('k');
    }
    if rights & CASTLE_BLACK_LONG != 0 {
        out.push('q');
    }

    if out.is_empty() {
        out.push('-');
    }
    out
}

fn generate_en_passant_field(position: &Position) -> String {
    let ep = position.ep_bb[0] | position.ep_bb[1];
    if ep == 0 {
        return "-".to_owned();
    }

    let square = ep.trailing_zeros() as Square;
    square_to_algebraic(square).unwrap_or_else(|_| "-".to_owned())
}
