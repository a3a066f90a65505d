//! Territory nodes

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::constants::{FORT_HP_PER_LEVEL, MAX_ARTILLERY_PER_NODE};
use crate::core::types::{FactionId, NodeId, NodeType, UnitType};

/// Units queued against a node, resolved in the next Combat phase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingAttack {
    pub units: u32,
    pub from_node_id: NodeId,
}

/// Units in training at a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingOrder {
    pub unit_type: UnitType,
    pub quantity: u32,
    pub turns_remaining: u32,
}

/// A territory node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    pub node_type: NodeType,
    pub owner: FactionId,

    pub standard_units: u32,
    pub veteran_units: u32,
    pub max_units: u32,
    pub training: Option<TrainingOrder>,

    pub materiel_output: f64,
    pub influence_output: f64,

    pub fortification_level: u32,
    pub fortification_hp: u32,
    pub max_fortification_hp: u32,
    /// Flat reduction applied to every instance of fortification damage
    pub fortification_hp_modifier: i32,

    pub artillery: u32,
    pub infiltrators: BTreeMap<FactionId, u32>,
    pub suppression: u32,
    pub alarm_level: u32,
    pub interdicted_turns: u32,
    pub low_supply: bool,

    pub connections: Vec<NodeId>,
    pub pending_attackers: BTreeMap<FactionId, PendingAttack>,
}

impl Node {
    pub fn new(id: impl Into<String>, name: impl Into<String>, node_type: NodeType, owner: FactionId) -> Self {
        Self {
            id: NodeId::new(id),
            name: name.into(),
            node_type,
            owner,
            standard_units: 0,
            veteran_units: 0,
            max_units: node_type.max_units(),
            training: None,
            materiel_output: node_type.default_materiel_output(),
            influence_output: node_type.default_influence_output(),
            fortification_level: 0,
            fortification_hp: 0,
            max_fortification_hp: 0,
            fortification_hp_modifier: 0,
            artillery: 0,
            infiltrators: BTreeMap::new(),
            suppression: 0,
            alarm_level: 0,
            interdicted_turns: 0,
            low_supply: false,
            connections: Vec::new(),
            pending_attackers: BTreeMap::new(),
        }
    }

    pub fn total_units(&self) -> u32 {
        self.standard_units + self.veteran_units
    }

    pub fn free_capacity(&self) -> u32 {
        self.max_units.saturating_sub(self.total_units())
    }

    /// Capacity for this node type moved by `shift`, floored at zero
    pub fn shifted_capacity(&self, shift: i32) -> u32 {
        (self.node_type.max_units() as i64 + shift as i64).max(0) as u32
    }

    pub fn is_command_node(&self) -> bool {
        self.node_type == NodeType::Cn
    }

    pub fn is_adjacent(&self, other: &NodeId) -> bool {
        self.connections.contains(other)
    }

    pub fn infiltrators_of(&self, faction: FactionId) -> u32 {
        self.infiltrators.get(&faction).copied().unwrap_or(0)
    }

    /// Set a new fortification level at full HP
    pub fn set_fortification_level(&mut self, level: u32) {
        self.fortification_level = level;
        self.max_fortification_hp = level * FORT_HP_PER_LEVEL;
        self.fortification_hp = self.max_fortification_hp;
    }

    /// Level backed by remaining HP
    ///
    /// Each level owns a 100 HP slice; a level stops counting once its slice
    /// is empty. A level-2 work at 120 HP still counts 2, at 100 HP it counts 1.
    pub fn effective_fortification_level(&self) -> u32 {
        let backed = self.fortification_hp.div_ceil(FORT_HP_PER_LEVEL);
        backed.min(self.fortification_level)
    }

    /// Apply fortification damage, returning the HP actually removed
    pub fn damage_fortification(&mut self, raw_damage: u32) -> u32 {
        if self.fortification_hp == 0 {
            return 0;
        }
        let damage = (raw_damage as i64 - self.fortification_hp_modifier as i64).max(0) as u32;
        let applied = damage.min(self.fortification_hp);
        self.fortification_hp -= applied;
        applied
    }

    /// Remove one fortification level, clamping HP to the new maximum
    pub fn destroy_fortification_level(&mut self) {
        if self.fortification_level == 0 {
            return;
        }
        self.fortification_level -= 1;
        self.max_fortification_hp = self.fortification_level * FORT_HP_PER_LEVEL;
        self.fortification_hp = self.fortification_hp.min(self.max_fortification_hp);
    }

    /// Remove up to `count` units, standard first; returns (standard, veteran) removed
    pub fn remove_units(&mut self, count: u32) -> (u32, u32) {
        let standard = count.min(self.standard_units);
        let veteran = (count - standard).min(self.veteran_units);
        self.standard_units -= standard;
        self.veteran_units -= veteran;
        (standard, veteran)
    }

    /// Check structural invariants on garrison, fortification and artillery
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.total_units() > self.max_units {
            return Err(format!(
                "{}: garrison {} exceeds capacity {}",
                self.id,
                self.total_units(),
                self.max_units
            ));
        }
        if self.max_fortification_hp != self.fortification_level * FORT_HP_PER_LEVEL {
            return Err(format!(
                "{}: max HP {} does not match level {}",
                self.id, self.max_fortification_hp, self.fortification_level
            ));
        }
        if self.fortification_hp > self.max_fortification_hp {
            return Err(format!(
                "{}: fortification HP {} exceeds max {}",
                self.id, self.fortification_hp, self.max_fortification_hp
            ));
        }
        if self.artillery > MAX_ARTILLERY_PER_NODE {
            return Err(format!("{}: artillery {} exceeds cap", self.id, self.artillery));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fortress() -> Node {
        let mut node = Node::new("NS", "Northern Strongpoint", NodeType::Fortress, FactionId::Neutral);
        node.set_fortification_level(2);
        node
    }

    #[test]
    fn test_effective_level_follows_hp_slices() {
        let mut node = fortress();
        assert_eq!(node.effective_fortification_level(), 2);
        node.fortification_hp = 120;
        assert_eq!(node.effective_fortification_level(), 2);
        node.fortification_hp = 100;
        assert_eq!(node.effective_fortification_level(), 1);
        node.fortification_hp = 0;
        assert_eq!(node.effective_fortification_level(), 0);
    }

    #[test]
    fn test_damage_floors_at_zero() {
        let mut node = fortress();
        node.fortification_hp = 8;
        assert_eq!(node.damage_fortification(15), 8);
        assert_eq!(node.fortification_hp, 0);
        assert_eq!(node.damage_fortification(15), 0);
    }

    #[test]
    fn test_hp_modifier_softens_damage() {
        let mut node = fortress();
        node.fortification_hp_modifier = 4;
        assert_eq!(node.damage_fortification(10), 6);
        assert_eq!(node.fortification_hp, 194);
    }

    #[test]
    fn test_destroy_level_clamps_hp() {
        let mut node = fortress();
        node.destroy_fortification_level();
        assert_eq!(node.fortification_level, 1);
        assert_eq!(node.max_fortification_hp, 100);
        assert_eq!(node.fortification_hp, 100);
        assert!(node.check_invariants().is_ok());
    }

    #[test]
    fn test_remove_units_standard_first() {
        let mut node = fortress();
        node.standard_units = 3;
        node.veteran_units = 4;
        assert_eq!(node.remove_units(5), (3, 2));
        assert_eq!(node.total_units(), 2);
        assert_eq!(node.remove_units(10), (0, 2));
    }

    #[test]
    fn test_invariant_violation_reported() {
        let mut node = fortress();
        node.standard_units = node.max_units + 1;
        assert!(node.check_invariants().is_err());
    }
}
