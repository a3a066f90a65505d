//! Combat resolution: dice exchanges between a node garrison and the forces
//! queued against it

pub mod dice;
pub mod resolver;

pub use dice::{roll_hits, SideRoll};
pub use resolver::{fight, resolve_combat_phase, Engagement, Force};

use serde::{Deserialize, Serialize};

use crate::core::types::{FactionId, NodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BattleOutcome {
    AttackerWins,
    DefenderWins,
    /// Both sides wiped out in the same round
    Stalemate,
}

/// Dice detail for one exchange round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BattleRound {
    pub round_number: u32,
    pub attacker_units_start: u32,
    pub defender_units_start: u32,
    pub attacker_dice_rolls: Vec<u32>,
    pub defender_dice_rolls: Vec<u32>,
    /// Rolls after veteran, fortification and doctrine bonuses
    pub attacker_final_rolls: Vec<i32>,
    pub defender_final_rolls: Vec<i32>,
    pub defender_fortification_bonus: i32,
    pub attacker_losses: u32,
    pub defender_losses: u32,
    pub attacker_units_end: u32,
    pub defender_units_end: u32,
}

/// Record of one resolved battle; never mutated once logged
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BattleReport {
    pub id: String,
    pub turn: u32,
    pub attacker: FactionId,
    pub defender: FactionId,
    pub node_id: NodeId,
    pub outcome: BattleOutcome,
    pub attacker_units_before: u32,
    pub defender_units_before: u32,
    pub attacker_units_after: u32,
    pub defender_units_after: u32,
    pub attacker_losses: u32,
    pub defender_losses: u32,
    pub node_captured: bool,
    pub fortification_bonus_used: i32,
    pub fortification_hp_damage: u32,
    pub rounds: Vec<BattleRound>,
}

impl BattleReport {
    /// Losses match the before/after difference on both sides
    pub fn is_loss_conserving(&self) -> bool {
        self.attacker_units_before.checked_sub(self.attacker_units_after) == Some(self.attacker_losses)
            && self.defender_units_before.checked_sub(self.defender_units_after) == Some(self.defender_losses)
    }

    /// An empty garrison falls to any column without a die rolled
    pub fn is_walk_over_consistent(&self) -> bool {
        if self.defender_units_before > 0 || self.attacker_units_before == 0 {
            return true;
        }
        self.outcome == BattleOutcome::AttackerWins
            && self.rounds.is_empty()
            && self.attacker_losses == 0
            && self.defender_losses == 0
            && self.node_captured
    }
}
