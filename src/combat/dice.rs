//! Per-unit dice rolls

use rand::Rng;

use crate::core::constants::{DIE_FACES, HIT_THRESHOLD, VETERAN_COMBAT_BONUS};

/// One side's rolls for a round
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SideRoll {
    pub raw: Vec<u32>,
    pub modified: Vec<i32>,
    pub hits: u32,
}

/// Roll one die per unit
///
/// Veterans roll after the standard units and add the veteran bonus on top
/// of `flat_bonus`. A modified roll at or above the hit threshold scores.
pub fn roll_hits(standard: u32, veteran: u32, flat_bonus: i32, rng: &mut impl Rng) -> SideRoll {
    let mut roll = SideRoll::default();
    let units = std::iter::repeat(0)
        .take(standard as usize)
        .chain(std::iter::repeat(VETERAN_COMBAT_BONUS).take(veteran as usize));

    for unit_bonus in units {
        let face = rng.gen_range(1..=DIE_FACES);
        let total = face as i32 + unit_bonus + flat_bonus;
        if total >= HIT_THRESHOLD {
            roll.hits += 1;
        }
        roll.raw.push(face);
        roll.modified.push(total);
    }
    roll
}
