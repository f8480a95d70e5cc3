//! Magic-bitboard attack tables for the sliding pieces.
//!
//! For every square a 64-bit multiplier maps each subset of the square's
//! blocker mask to a unique slot in a per-square attack table:
//!
//! `attacks = table[sq * 4096 + ((occ & mask) * magic) >> (64 - bits)]`
//!
//! The multipliers are searched at startup from sparse random candidates
//! (three draws ANDed together); the whole build runs once behind a
//! `OnceLock` and takes well under 100 ms.

use std::sync::OnceLock;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::bitboard::popcount;
use crate::board::types::Square;

/// Per-square table stride: 2^12 covers the widest mask (a corner rook).
pub const MAGIC_TABLE_SIZE: usize = 4096;

const BISHOP_DIRECTIONS: [(i32, i32); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];
const ROOK_DIRECTIONS: [(i32, i32); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

/// Maximum candidate multipliers tried per square before giving up. The
/// search is probabilistic but converges within a few hundred attempts in
/// practice; exhausting this bound means the generator itself is broken.
const MAX_MAGIC_ATTEMPTS: u32 = 100_000_000;

struct SliderTables {
    bishop_masks: [u64; 64],
    bishop_bits: [u32; 64],
    bishop_magics: [u64; 64],
    bishop_attacks: Vec<u64>,
    rook_masks: [u64; 64],
    rook_bits: [u32; 64],
    rook_magics: [u64; 64],
    rook_attacks: Vec<u64>,
}

static TABLES: OnceLock<SliderTables> = OnceLock::new();

#[inline]
fn tables() -> &'static SliderTables {
    TABLES.get_or_init(build_tables)
}

/// Squares a bishop on `square` attacks given the board occupancy,
/// stopping at the first blocker inclusive.
#[inline]
pub fn bishop_attacks(square: Square, occupancy: u64) -> u64 {
    let t = tables();
    let sq = square as usize;
    let blockers = occupancy & t.bishop_masks[sq];
    let index = (blockers.wrapping_mul(t.bishop_magics[sq]) >> (64 - t.bishop_bits[sq])) as usize;
    t.bishop_attacks[sq * MAGIC_TABLE_SIZE + index]
}

/// Squares a rook on `square` attacks given the board occupancy.
#[inline]
pub fn rook_attacks(square: Square, occupancy: u64) -> u64 {
    let t = tables();
    let sq = square as usize;
    let blockers = occupancy & t.rook_masks[sq];
    let index = (blockers.wrapping_mul(t.rook_magics[sq]) >> (64 - t.rook_bits[sq])) as usize;
    t.rook_attacks[sq * MAGIC_TABLE_SIZE + index]
}

#[inline]
pub fn queen_attacks(square: Square, occupancy: u64) -> u64 {
    bishop_attacks(square, occupancy) | rook_attacks(square, occupancy)
}

fn build_tables() -> SliderTables {
    // A fixed seed keeps the chosen magics (and so the table layout)
    // reproducible between runs.
    let mut rng = StdRng::seed_from_u64(0xB1A5_ED5E_ED00_0001);

    let mut t = SliderTables {
        bishop_masks: [0; 64],
        bishop_bits: [0; 64],
        bishop_magics: [0; 64],
        bishop_attacks: vec![0u64; 64 * MAGIC_TABLE_SIZE],
        rook_masks: [0; 64],
        rook_bits: [0; 64],
        rook_magics: [0; 64],
        rook_attacks: vec![0u64; 64 * MAGIC_TABLE_SIZE],
    };

    for square in 0..64u8 {
        let sq = square as usize;

        let mask = sliding_mask(square, &BISHOP_DIRECTIONS);
        t.bishop_masks[sq] = mask;
        t.bishop_bits[sq] = popcount(mask);
        t.bishop_magics[sq] = find_magic(
            &mut rng,
            square,
            mask,
            &BISHOP_DIRECTIONS,
            &mut t.bishop_attacks[sq * MAGIC_TABLE_SIZE..(sq + 1) * MAGIC_TABLE_SIZE],
        );

        let mask = sliding_mask(square, &ROOK_DIRECTIONS);
        t.rook_masks[sq] = mask;
        t.rook_bits[sq] = popcount(mask);
        t.rook_magics[sq] = find_magic(
            &mut rng,
            square,
            mask,
            &ROOK_DIRECTIONS,
            &mut t.rook_attacks[sq * MAGIC_TABLE_SIZE..(sq + 1) * MAGIC_TABLE_SIZE],
        );
    }

    t
}

/// Interior blocker mask: every square a slider could be blocked on,
/// excluding the board edge in each travel direction.
fn sliding_mask(square: Square, directions: &[(i32, i32)]) -> u64 {
    let mut mask = 0u64;

    for &(df, dr) in directions {
        let mut file = (square % 8) as i32 + df;
        let mut rank = (square / 8) as i32 + dr;
        // Include a square only while stepping once more stays on board.
        while (0..8).contains(&(file + df)) && (0..8).contains(&(rank + dr)) {
            mask |= 1u64 << (rank * 8 + file);
            file += df;
            rank += dr;
        }
    }

    mask
}

/// Reference ray walk: attacked squares given blockers, first blocker
/// included.
fn sliding_attack(square: Square, blockers: u64, directions: &[(i32, i32)]) -> u64 {
    let mut attacks = 0u64;

    for &(df, dr) in directions {
        let mut file = (square % 8) as i32 + df;
        let mut rank = (square / 8) as i32 + dr;
        while (0..8).contains(&file) && (0..8).contains(&rank) {
            let bit = 1u64 << (rank * 8 + file);
            attacks |= bit;
            if blockers & bit != 0 {
                break;
            }
            file += df;
            rank += dr;
        }
    }

    attacks
}

/// Enumerate every subset of the mask's set bits.
fn blocker_subsets(mask: u64) -> Vec<u64> {
    let mut bit_positions = Vec::new();
    let mut remaining = mask;
    while remaining != 0 {
        bit_positions.push(crate::bitboard::pop_lsb(&mut remaining));
    }

    let count = 1usize << bit_positions.len();
    let mut subsets = Vec::with_capacity(count);
    for selector in 0..count {
        let mut subset = 0u64;
        for (bit, &position) in bit_positions.iter().enumerate() {
            if selector & (1 << bit) != 0 {
                subset |= 1u64 << position;
            }
        }
        subsets.push(subset);
    }

    subsets
}

/// Search a multiplier that maps every blocker subset to a distinct slot
/// (or to a slot already holding the identical attack set), filling the
/// square's attack table as a side effect.
///
/// Slot value 0 marks "unused": a slider always attacks at least one
/// square, so no real attack set collides with the sentinel.
fn find_magic(
    rng: &mut StdRng,
    square: Square,
    mask: u64,
    directions: &[(i32, i32)],
    table: &mut [u64],
) -> u64 {
    let subsets = blocker_subsets(mask);
    let reference: Vec<u64> = subsets
        .iter()
        .map(|&blockers| sliding_attack(square, blockers, directions))
        .collect();
    let bits = popcount(mask);

    for _ in 0..MAX_MAGIC_ATTEMPTS {
        let candidate: u64 = rng.random::<u64>() & rng.random::<u64>() & rng.random::<u64>();

        table.fill(0);
        let mut valid = true;
        for (subset, attack) in subsets.iter().zip(reference.iter()) {
            let index = (subset.wrapping_mul(candidate) >> (64 - bits)) as usize;
            if table[index] == 0 {
                table[index] = *attack;
            } else if table[index] != *attack {
                valid = false;
                break;
            }
        }

        if valid {
            return candidate;
        }
    }

    // Startup-only failure path; the probability of reaching it is
    // negligible and there is no sensible way to continue without tables.
    panic!("no magic multiplier found for square {square} after {MAX_MAGIC_ATTEMPTS} attempts");
}

#[cfg(test)]
mod tests {
    use super::{
        bishop_attacks, blocker_subsets, queen_attacks, rook_attacks, sliding_attack,
        sliding_mask, BISHOP_DIRECTIONS, ROOK_DIRECTIONS,
    };
    use crate::utils::algebraic::algebraic_to_square;

    fn sq(text: &str) -> u8 {
        algebraic_to_square(text).expect("test square should parse")
    }

    fn bb(squares: &[&str]) -> u64 {
        squares.iter().fold(0u64, |acc, s| acc | (1u64 << sq(s)))
    }

    #[test]
    fn masks_exclude_board_edges() {
        // Rook on a1: a2..a7 and b1..g1, never a8 or h1.
        let mask = sliding_mask(sq("a1"), &ROOK_DIRECTIONS);
        assert_eq!(mask.count_ones(), 12);
        assert_eq!(
            mask,
            bb(&["a2", "a3", "a4", "a5", "a6", "a7", "b1", "c1", "d1", "e1", "f1", "g1"])
        );

        // Bishop on d4 stops short of the rim in all four directions.
        let mask = sliding_mask(sq("d4"), &BISHOP_DIRECTIONS);
        assert_eq!(mask, bb(&["e5", "f6", "g7", "e3", "f2", "c5", "b6", "c3", "b2"]));
    }

    #[test]
    fn blocker_subset_count_is_two_to_the_mask_bits() {
        let mask = sliding_mask(sq("e4"), &BISHOP_DIRECTIONS);
        let subsets = blocker_subsets(mask);
        assert_eq!(subsets.len(), 1 << mask.count_ones());
        assert!(subsets.contains(&0));
        assert!(subsets.contains(&mask));
    }

    #[test]
    fn rook_attacks_stop_at_the_first_blocker_inclusive() {
        let occupancy = bb(&["d6", "f4"]);
        let attacks = rook_attacks(sq("d4"), occupancy);
        assert_eq!(
            attacks,
            bb(&["d5", "d6", "d3", "d2", "d1", "c4", "b4", "a4", "e4", "f4"])
        );
    }

    #[test]
    fn bishop_attacks_stop_at_the_first_blocker_inclusive() {
        let occupancy = bb(&["f6"]);
        let attacks = bishop_attacks(sq("d4"), occupancy);
        assert_eq!(
            attacks,
            bb(&["e5", "f6", "c5", "b6", "a7", "e3", "f2", "g1", "c3", "b2", "a1"])
        );
    }

    #[test]
    fn magic_lookup_matches_ray_walk_for_every_blocker_subset() {
        for square_name in ["a1", "d4", "h8", "e1", "b7"] {
            let square = sq(square_name);
            for (dirs, lookup) in [
                (
                    &BISHOP_DIRECTIONS,
                    bishop_attacks as fn(u8, u64) -> u64,
                ),
                (&ROOK_DIRECTIONS, rook_attacks as fn(u8, u64) -> u64),
            ] {
                let mask = sliding_mask(square, dirs);
                for blockers in blocker_subsets(mask) {
                    assert_eq!(
                        lookup(square, blockers),
                        sliding_attack(square, blockers, dirs),
                        "mismatch on {square_name} with blockers {blockers:#x}"
                    );
                }
            }
        }
    }

    #[test]
    fn queen_combines_both_slider_geometries() {
        let occupancy = 0;
        let square = sq("d4");
        assert_eq!(
            queen_attacks(square, occupancy),
            bishop_attacks(square, occupancy) | rook_attacks(square, occupancy)
        );
        assert_eq!(queen_attacks(square, 0).count_ones(), 27);
    }
}
