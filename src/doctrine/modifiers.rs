//! Faction modifier block populated by doctrine effects
//!
//! Every field starts neutral (zero, false, empty) and only the doctrine
//! engine writes to it. Each field is read by the engine whose rule it bends.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::actions::ActionKind;
use crate::core::types::{NodeType, ResourceKind};
use crate::doctrine::effect::{CombatCondition, ResourceConversion};

/// Direction of a temporary cost modifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CostModifierKind {
    PercentageIncrease,
    PercentageDecrease,
}

/// Time-boxed percentage change to one action's MAT cost
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemporaryCostModifier {
    pub action_type: ActionKind,
    pub value: f64,
    pub turns_remaining: u32,
    pub modifier_type: CostModifierKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionalCombatModifier {
    pub value: i32,
    pub condition: CombatCondition,
}

/// Cooldown state for the command-node redeploy capability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CnRedeploy {
    pub cooldown: u32,
    pub last_used_turn: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DoctrineModifiers {
    // Income
    pub flat_mat_income_bonus: f64,
    pub flat_qr_income_bonus: f64,
    pub percentage_mat_income_modifier: f64,
    pub percentage_qr_income_modifier: f64,
    pub mat_income_modifier_from_node_type: BTreeMap<NodeType, f64>,
    pub resource_conversion: Option<ResourceConversion>,
    pub disabled_resource_types: BTreeSet<ResourceKind>,
    pub immune_to_low_supply_penalty: bool,

    // Upkeep
    pub unit_upkeep_modifier: f64,
    pub unit_upkeep_percentage_increase: f64,
    pub unit_upkeep_percentage_decrease: f64,
    pub unit_upkeep_adjacent_cn_modifier: f64,
    pub unit_upkeep_other_units_modifier: f64,
    pub recon_array_upkeep_modifier: f64,
    pub infiltrator_upkeep_modifier: f64,

    // Action costs, as percentages
    pub unit_deploy_cost_modifier: f64,
    pub fortification_cost_modifier: f64,
    pub artillery_cost_modifier: f64,
    pub artillery_fire_cost_modifier: f64,
    pub recon_cost_modifier: f64,
    pub infiltrator_cost_modifier: f64,
    /// Flat MAT added to each unit move
    pub move_units_cost_modifier: f64,
    /// MAT added per unit moved
    pub move_units_cost_per_unit_modifier: f64,
    pub move_units_cn_cost_modifier: f64,
    pub temporary_action_cost_modifiers: Vec<TemporaryCostModifier>,

    // Availability
    pub disabled_actions: BTreeSet<ActionKind>,
    pub unit_deploy_limit: Option<u32>,
    pub max_controlled_node_type_limits: BTreeMap<NodeType, u32>,
    pub max_active_recon_array_limit: Option<u32>,
    pub disable_new_infiltrators: bool,
    pub disable_auto_reinforcements: bool,
    pub disable_neutral_node_capture_adjacent_enemy: bool,

    // Combat
    pub combat_roll_modifier: i32,
    pub combat_roll_modifier_conditional: Vec<ConditionalCombatModifier>,
    pub combat_bonus_neutral_territory: i32,
    pub combat_penalty_own_fortress_defense: i32,
    pub fortification_combat_bonus_modifier: i32,
    pub battlefield_promotion_modifier: i32,
    pub battle_reward_mat: f64,
    pub gain_mat_on_capture_modifier: f64,
    pub permanent_node_mat_reduction_on_capture: f64,
    /// Share of battle losses that straggle back, as a percentage
    pub recover_lost_units_after_battle_percentage: f64,
    /// Roll bonus stripped from neutral garrisons we attack
    pub neutral_node_capture_bonus_reduction: i32,
    pub enemy_combat_penalty_adjacent_recon_array: i32,
    pub own_recon_array_enemy_attack_bonus: i32,

    // Capacity and reinforcement
    pub max_unit_capacity_modifier: i32,
    pub cn_max_unit_capacity_modifier: i32,
    pub max_unit_capacity_non_cn_modifier: i32,
    pub free_unit_per_turn: u32,
    pub auto_reinforcement_rate_modifier: i32,
    pub overflow_reinforcements_to_reserve_pool: bool,

    // Fortification
    pub fortification_hp_modifier: i32,
    pub can_fortify_adjacent_neutral: bool,
    /// Security added to every node we hold or take
    pub suppression_increase: u32,

    // Artillery
    pub artillery_range_modifier: i32,
    pub artillery_damage_modifier: i32,
    pub artillery_strike_fort_hp_damage: u32,
    pub artillery_strike_own_unit_damage_chance: f64,

    // Movement
    pub move_units_two_nodes: bool,
    pub move_units_from_cn_to_any_node: Option<CnRedeploy>,
    pub move_units_leave_zero_units: bool,
    pub move_units_suppression_penalty: u32,
    pub enemy_unit_attrition_on_move: u32,
    pub free_move_into_neutral_node: bool,

    // Recon
    pub recon_pulse_duration_modifier: u32,
    pub enemy_recon_pulse_failure_chance: f64,
    pub decoy_recon_pulse: bool,
    pub permanent_enemy_resource_visibility: bool,

    // Covert
    pub infiltrator_effectiveness_modifier: f64,
    pub infiltrator_detection_modifier: f64,
    pub sabotage_targets_global_stockpile: bool,
    pub gain_mat_on_enemy_deployment: f64,
}

/// Scale `base` by a whole-number percentage, never below zero
pub fn apply_percentage(base: f64, percent: f64) -> f64 {
    (base * (1.0 + percent / 100.0)).max(0.0)
}

impl DoctrineModifiers {
    pub fn is_action_disabled(&self, kind: ActionKind) -> bool {
        self.disabled_actions.contains(&kind)
    }

    pub fn is_resource_disabled(&self, kind: ResourceKind) -> bool {
        self.disabled_resource_types.contains(&kind)
    }

    /// Net percentage from every running temporary modifier on `kind`
    pub fn temporary_cost_percentage(&self, kind: ActionKind) -> f64 {
        self.temporary_action_cost_modifiers
            .iter()
            .filter(|m| m.action_type == kind)
            .map(|m| match m.modifier_type {
                CostModifierKind::PercentageIncrease => m.value,
                CostModifierKind::PercentageDecrease => -m.value,
            })
            .sum()
    }

    /// Capacity change for a command node or any other node we hold
    pub fn capacity_shift(&self, command_node: bool) -> i32 {
        let specific = if command_node {
            self.cn_max_unit_capacity_modifier
        } else {
            self.max_unit_capacity_non_cn_modifier
        };
        self.max_unit_capacity_modifier + specific
    }

    /// Net unit upkeep percentage
    pub fn unit_upkeep_percentage(&self) -> f64 {
        self.unit_upkeep_modifier + self.unit_upkeep_percentage_increase - self.unit_upkeep_percentage_decrease
    }

    /// Sum of conditional roll modifiers whose condition holds
    pub fn conditional_roll_bonus(&self, holds: impl Fn(CombatCondition) -> bool) -> i32 {
        self.combat_roll_modifier_conditional
            .iter()
            .filter(|m| holds(m.condition))
            .map(|m| m.value)
            .sum()
    }
}
