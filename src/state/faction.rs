//! Factions, their statistics and the plans they act on

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::core::constants::{STARTING_INFLUENCE, STARTING_MATERIEL};
use crate::core::types::{FactionId, NodeId};
use crate::doctrine::effect::{deserialize_effects, DoctrineEffect};
use crate::doctrine::modifiers::DoctrineModifiers;

/// Strategic emphasis tag carried by a plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanPriority {
    Economic,
    MilitaryOffense,
    MilitaryDefense,
    TerritorialExpansion,
    IntelligenceGathering,
}

/// Operational plan produced by the planning oracle
///
/// The engine keeps it for display and history only; strategy lives outside.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Plan {
    pub turn_generated: u32,
    pub objective: String,
    pub operation: String,
    pub tasks: Vec<String>,
    pub priority: Option<PlanPriority>,
    pub target_node_ids: Vec<NodeId>,
}

impl Default for Plan {
    fn default() -> Self {
        Self {
            turn_generated: 0,
            objective: String::new(),
            operation: String::new(),
            tasks: Vec::new(),
            priority: None,
            target_node_ids: Vec::new(),
        }
    }
}

impl Plan {
    /// Plan used when the oracle is unavailable or answers garbage
    pub fn fallback(turn: u32) -> Self {
        Self {
            turn_generated: turn,
            objective: "hold and assess".to_string(),
            operation: "Fallback".to_string(),
            tasks: vec!["Hold current positions".to_string()],
            priority: Some(PlanPriority::MilitaryDefense),
            target_node_ids: Vec::new(),
        }
    }
}

/// Doctrine adopted by a faction, with the effects folded in at adoption
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveDoctrine {
    pub id: String,
    pub name: String,
    pub adopted_turn: u32,
    pub turns_remaining: Option<u32>,
    #[serde(deserialize_with = "deserialize_effects")]
    pub applied_buffs: Vec<DoctrineEffect>,
    #[serde(deserialize_with = "deserialize_effects")]
    pub applied_nerfs: Vec<DoctrineEffect>,
}

/// Cumulative per-faction counters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FactionStats {
    // Snapshot counts, recomputed from the board
    pub nodes_controlled: u32,
    pub total_units: u32,
    pub total_veteran_units: u32,
    pub total_artillery: u32,
    pub total_infiltrators: u32,
    pub total_fortified_nodes: u32,

    // Units
    pub total_units_lost: u32,
    pub total_units_deployed: u32,
    pub current_turn_units_deployed: u32,
    pub current_turn_units_lost: u32,
    pub units_promoted: u32,

    // Battles
    pub battles_won: u32,
    pub battles_lost: u32,
    pub battles_initiated: u32,
    pub battles_won_as_attacker: u32,
    pub nodes_captured: u32,
    pub units_lost_in_successful_captures: u32,

    // Materiel flow
    pub total_mat_generated: f64,
    pub total_mat_consumed: f64,
    pub mat_spent_on_deployment: f64,
    pub mat_spent_on_upkeep: f64,
    pub mat_spent_on_fortifications: f64,
    pub mat_spent_on_fort_repair: f64,
    pub mat_spent_on_artillery: f64,
    pub mat_spent_on_artillery_ammo: f64,
    pub mat_spent_on_infiltrators: f64,
    pub mat_spent_on_training: f64,
    pub total_qr_generated: f64,

    // Recon
    pub pulses_performed: u32,
    pub intel_advantage_turns: u32,
    pub qr_spent_on_recon: f64,
    pub mat_spent_on_recon: f64,

    // Artillery and covert ops
    pub artillery_kills: u32,
    pub total_sabotage_attempts: u32,
    pub successful_sabotage_attempts: u32,
    pub enemy_mat_drained_by_sabotage: f64,
    pub infiltrators_lost: u32,
}

/// A faction and its resource pools
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Faction {
    pub id: FactionId,
    pub name: String,
    /// QR pool
    pub influence: f64,
    /// MAT pool; may go negative (debt)
    pub materiel: f64,
    pub stats: FactionStats,
    pub modifiers: DoctrineModifiers,
    pub current_plan: Option<Plan>,
    pub plan_history: Vec<Plan>,
    pub active_doctrines: Vec<ActiveDoctrine>,
    pub activated_recon_node_ids: BTreeSet<NodeId>,
    pub is_recon_system_active: bool,
    /// Last turn on which this faction's pulse grants full visibility
    pub recon_pulse_expires_after_turn: Option<u32>,
    /// Reinforcements that overflowed capacity
    pub reserve_units: u32,
}

impl Faction {
    pub fn new(id: FactionId) -> Self {
        Self {
            id,
            name: id.as_str().to_string(),
            influence: STARTING_INFLUENCE,
            materiel: STARTING_MATERIEL,
            stats: FactionStats::default(),
            modifiers: DoctrineModifiers::default(),
            current_plan: None,
            plan_history: Vec::new(),
            active_doctrines: Vec::new(),
            activated_recon_node_ids: BTreeSet::new(),
            is_recon_system_active: false,
            recon_pulse_expires_after_turn: None,
            reserve_units: 0,
        }
    }

    /// True if a recon pulse covers `turn`
    pub fn has_active_pulse(&self, turn: u32) -> bool {
        self.recon_pulse_expires_after_turn.is_some_and(|last| turn <= last)
    }

    pub fn can_afford(&self, influence: f64, materiel: f64) -> bool {
        self.influence >= influence && self.materiel >= materiel
    }

    /// Deduct a cost and record it as consumed materiel
    pub fn spend(&mut self, influence: f64, materiel: f64) {
        self.influence -= influence;
        self.materiel -= materiel;
        self.stats.total_mat_consumed += materiel;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_faction_pools() {
        let faction = Faction::new(FactionId::GemQ);
        assert_eq!(faction.name, "GEM-Q");
        assert_eq!(faction.influence, 100.0);
        assert_eq!(faction.materiel, 650.0);
        assert!(!faction.has_active_pulse(1));
    }

    #[test]
    fn test_pulse_window() {
        let mut faction = Faction::new(FactionId::Axiom);
        faction.recon_pulse_expires_after_turn = Some(4);
        assert!(faction.has_active_pulse(4));
        assert!(!faction.has_active_pulse(5));
    }

    #[test]
    fn test_spend_allows_debt() {
        let mut faction = Faction::new(FactionId::Axiom);
        faction.spend(0.0, 700.0);
        assert_eq!(faction.materiel, -50.0);
        assert_eq!(faction.stats.total_mat_consumed, 700.0);
    }

    #[test]
    fn test_fallback_plan() {
        let plan = Plan::fallback(3);
        assert_eq!(plan.objective, "hold and assess");
        assert!(plan.target_node_ids.is_empty());
    }
}
