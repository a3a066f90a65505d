//! Applying doctrine effects to a faction
//!
//! Effects accumulate: applying the same effect twice doubles it. Only the
//! temporary cost modifiers ever come off again, through
//! [`expire_temporary_modifiers`] during Upkeep.

use tracing::{debug, warn};

use crate::core::types::FactionId;
use crate::doctrine::catalog::DoctrineDefinition;
use crate::doctrine::effect::DoctrineEffect;
use crate::doctrine::modifiers::{
    CnRedeploy, ConditionalCombatModifier, CostModifierKind, TemporaryCostModifier,
};
use crate::events::{GameEvent, LogKind};
use crate::map::graph::NodeMap;
use crate::state::{ActiveDoctrine, Faction, Node};

/// Shift a node's capacity, never below its current garrison
fn shift_capacity(node: &mut Node, delta: i32) {
    let shifted = (node.max_units as i64 + delta as i64).max(0) as u32;
    node.max_units = shifted.max(node.total_units());
}

fn for_owned_nodes(nodes: &mut NodeMap, faction: FactionId, mut f: impl FnMut(&mut Node)) {
    for node in nodes.values_mut().filter(|n| n.owner == faction) {
        f(node);
    }
}

/// Fold one effect into the faction (and, for node-level effects, its nodes)
///
/// Returns a log event only for effects that were skipped.
pub fn apply_effect(nodes: &mut NodeMap, faction: &mut Faction, effect: &DoctrineEffect) -> Option<GameEvent> {
    let owner = faction.id;
    let m = &mut faction.modifiers;

    match effect {
        DoctrineEffect::GainMat { value } => faction.materiel += value,
        DoctrineEffect::FlatMatIncome { value } => m.flat_mat_income_bonus += value,
        DoctrineEffect::FlatQrIncome { value } => m.flat_qr_income_bonus += value,
        DoctrineEffect::PercentageMatIncomeModifier { value } => m.percentage_mat_income_modifier += value,
        DoctrineEffect::PercentageQrIncomeModifier { value } => m.percentage_qr_income_modifier += value,
        DoctrineEffect::MatIncomeModifierFromNodeType { node_type, value } => {
            *m.mat_income_modifier_from_node_type.entry(*node_type).or_insert(0.0) += value;
        }
        DoctrineEffect::ResourceConversion { conversion_ratio } => {
            m.resource_conversion = Some(*conversion_ratio);
        }
        DoctrineEffect::DisableResourceType { resource_type } => {
            m.disabled_resource_types.insert(*resource_type);
        }
        DoctrineEffect::ImmuneToLowSupplyPenalty => m.immune_to_low_supply_penalty = true,

        DoctrineEffect::UnitUpkeepModifier { value } => m.unit_upkeep_modifier += value,
        DoctrineEffect::UnitUpkeepPercentageIncrease { value } => m.unit_upkeep_percentage_increase += value,
        DoctrineEffect::UnitUpkeepPercentageDecrease { value } => m.unit_upkeep_percentage_decrease += value,
        DoctrineEffect::UnitUpkeepAdjacentCnModifier { value } => m.unit_upkeep_adjacent_cn_modifier += value,
        DoctrineEffect::UnitUpkeepOtherUnitsModifier { value } => m.unit_upkeep_other_units_modifier += value,
        DoctrineEffect::ReconArrayUpkeepModifier { value } => m.recon_array_upkeep_modifier += value,
        DoctrineEffect::InfiltratorUpkeepModifier { value } => m.infiltrator_upkeep_modifier += value,

        DoctrineEffect::UnitDeployCostModifier { value } => m.unit_deploy_cost_modifier += value,
        DoctrineEffect::FortificationCostModifier { value } => m.fortification_cost_modifier += value,
        DoctrineEffect::ArtilleryCostModifier { value } => m.artillery_cost_modifier += value,
        DoctrineEffect::ArtilleryFireCostModifier { value } => m.artillery_fire_cost_modifier += value,
        DoctrineEffect::ReconCostModifier { value } => m.recon_cost_modifier += value,
        DoctrineEffect::InfiltratorCostModifier { value } => m.infiltrator_cost_modifier += value,
        DoctrineEffect::MoveUnitsCostModifier { value } => m.move_units_cost_modifier += value,
        DoctrineEffect::MoveUnitsCostPerUnitModifier { value } => m.move_units_cost_per_unit_modifier += value,
        DoctrineEffect::MoveUnitsCnCostModifier { value } => m.move_units_cn_cost_modifier += value,
        DoctrineEffect::TemporaryActionCostReduction {
            action_type,
            value,
            duration,
        } => m.temporary_action_cost_modifiers.push(TemporaryCostModifier {
            action_type: *action_type,
            value: *value,
            turns_remaining: *duration,
            modifier_type: CostModifierKind::PercentageDecrease,
        }),
        DoctrineEffect::TemporaryActionCostIncrease {
            action_type,
            value,
            duration,
        } => m.temporary_action_cost_modifiers.push(TemporaryCostModifier {
            action_type: *action_type,
            value: *value,
            turns_remaining: *duration,
            modifier_type: CostModifierKind::PercentageIncrease,
        }),

        DoctrineEffect::DisableAction { action_type } => {
            m.disabled_actions.insert(*action_type);
        }
        DoctrineEffect::UnitDeployLimit { value } => m.unit_deploy_limit = Some(*value),
        DoctrineEffect::MaxControlledNodeTypeLimit { node_type, max_limit } => {
            m.max_controlled_node_type_limits.insert(*node_type, *max_limit);
        }
        DoctrineEffect::MaxActiveReconArrayLimit { value } => m.max_active_recon_array_limit = Some(*value),
        DoctrineEffect::DisableNewInfiltrators => m.disable_new_infiltrators = true,
        DoctrineEffect::DisableAutoReinforcements => m.disable_auto_reinforcements = true,
        DoctrineEffect::DisableNeutralNodeCaptureAdjacentEnemy => {
            m.disable_neutral_node_capture_adjacent_enemy = true
        }

        DoctrineEffect::CombatRollModifier { value } => m.combat_roll_modifier += value,
        DoctrineEffect::CombatRollModifierConditional { value, condition } => {
            m.combat_roll_modifier_conditional.push(ConditionalCombatModifier {
                value: *value,
                condition: *condition,
            })
        }
        DoctrineEffect::CombatBonusNeutralTerritory { value } => m.combat_bonus_neutral_territory += value,
        DoctrineEffect::CombatPenaltyOwnFortressDefense { value } => {
            m.combat_penalty_own_fortress_defense += value
        }
        DoctrineEffect::FortificationCombatBonusModifier { value } => {
            m.fortification_combat_bonus_modifier += value
        }
        DoctrineEffect::BattlefieldPromotionModifier { value } => m.battlefield_promotion_modifier += value,
        DoctrineEffect::BattleRewardMat { value } => m.battle_reward_mat += value,
        DoctrineEffect::GainMatOnCapture { value } => m.gain_mat_on_capture_modifier += value,
        DoctrineEffect::PermanentNodeMatReductionOnCapture { value } => {
            m.permanent_node_mat_reduction_on_capture += value
        }
        DoctrineEffect::RecoverLostUnitsAfterBattle { value } => {
            m.recover_lost_units_after_battle_percentage += value
        }
        DoctrineEffect::NeutralNodeCaptureBonusReduction { value } => {
            m.neutral_node_capture_bonus_reduction += value
        }
        DoctrineEffect::EnemyCombatPenaltyAdjacentReconArray { value } => {
            m.enemy_combat_penalty_adjacent_recon_array += value
        }
        DoctrineEffect::OwnReconArrayEnemyAttackBonus { value } => m.own_recon_array_enemy_attack_bonus += value,

        DoctrineEffect::MaxUnitCapacityModifier { value } => {
            m.max_unit_capacity_modifier += value;
            for_owned_nodes(nodes, owner, |node| shift_capacity(node, *value));
        }
        DoctrineEffect::CnMaxUnitCapacityModifier { value } => {
            m.cn_max_unit_capacity_modifier += value;
            for_owned_nodes(nodes, owner, |node| {
                if node.is_command_node() {
                    shift_capacity(node, *value);
                }
            });
        }
        DoctrineEffect::MaxUnitCapacityNonCnModifier { value } => {
            m.max_unit_capacity_non_cn_modifier += value;
            for_owned_nodes(nodes, owner, |node| {
                if !node.is_command_node() {
                    shift_capacity(node, *value);
                }
            });
        }
        DoctrineEffect::FreeUnitPerTurn { value } => m.free_unit_per_turn += value,
        DoctrineEffect::AutoReinforcementRateModifier { value } => m.auto_reinforcement_rate_modifier += value,
        DoctrineEffect::OverflowReinforcementsToReservePool => m.overflow_reinforcements_to_reserve_pool = true,

        DoctrineEffect::FortificationHpModifier { value } => {
            m.fortification_hp_modifier += value;
            for_owned_nodes(nodes, owner, |node| node.fortification_hp_modifier += value);
        }
        DoctrineEffect::BuildFortificationsAdjacentNeutral => m.can_fortify_adjacent_neutral = true,
        DoctrineEffect::SuppressionIncrease { value } => {
            m.suppression_increase += value;
            for_owned_nodes(nodes, owner, |node| node.suppression += value);
        }

        DoctrineEffect::ArtilleryRangeModifier { value } => m.artillery_range_modifier += value,
        DoctrineEffect::ArtilleryDamageModifier { value } => m.artillery_damage_modifier += value,
        DoctrineEffect::ArtilleryStrikeFortHpDamage { value } => m.artillery_strike_fort_hp_damage += value,
        DoctrineEffect::ArtilleryStrikeOwnUnitDamageChance { value } => {
            m.artillery_strike_own_unit_damage_chance += value
        }

        DoctrineEffect::MoveUnitsTwoNodes => m.move_units_two_nodes = true,
        DoctrineEffect::MoveUnitsFromCnToAnyNode { cooldown } => {
            m.move_units_from_cn_to_any_node = Some(CnRedeploy {
                cooldown: *cooldown,
                last_used_turn: None,
            })
        }
        DoctrineEffect::MoveUnitsLeaveZeroUnits => m.move_units_leave_zero_units = true,
        DoctrineEffect::MoveUnitsSuppressionPenalty { value } => m.move_units_suppression_penalty += value,
        DoctrineEffect::EnemyUnitAttritionOnMove { value } => m.enemy_unit_attrition_on_move += value,
        DoctrineEffect::FreeMoveIntoNeutralNode => m.free_move_into_neutral_node = true,

        DoctrineEffect::ReconPulseDurationModifier { value } => m.recon_pulse_duration_modifier += value,
        DoctrineEffect::EnemyReconPulseFailureChance { value } => m.enemy_recon_pulse_failure_chance += value,
        DoctrineEffect::DecoyReconPulse => m.decoy_recon_pulse = true,
        DoctrineEffect::PermanentEnemyResourceVisibility => m.permanent_enemy_resource_visibility = true,

        DoctrineEffect::InfiltratorEffectivenessModifier { value } => {
            m.infiltrator_effectiveness_modifier += value
        }
        DoctrineEffect::InfiltratorDetectionModifier { value } => m.infiltrator_detection_modifier += value,
        DoctrineEffect::SabotageTargetsGlobalStockpile => m.sabotage_targets_global_stockpile = true,
        DoctrineEffect::GainMatOnEnemyDeployment { value } => m.gain_mat_on_enemy_deployment += value,

        DoctrineEffect::Unknown { tag } => {
            warn!(faction = %owner, tag = %tag, "Skipping unknown doctrine effect");
            return Some(GameEvent::log(
                LogKind::Doctrine,
                Some(owner),
                format!("Unhandled doctrine effect '{}' ignored", tag),
            ));
        }
    }
    None
}

/// Adopt a doctrine: buffs first, then nerfs
pub fn adopt_doctrine(
    nodes: &mut NodeMap,
    faction: &mut Faction,
    doctrine: &DoctrineDefinition,
    turn: u32,
) -> Vec<GameEvent> {
    let mut events = Vec::new();
    for effect in doctrine.buffs.iter().chain(&doctrine.nerfs) {
        events.extend(apply_effect(nodes, faction, effect));
    }

    faction.active_doctrines.push(ActiveDoctrine {
        id: doctrine.id.clone(),
        name: doctrine.name.clone(),
        adopted_turn: turn,
        turns_remaining: None,
        applied_buffs: doctrine.buffs.clone(),
        applied_nerfs: doctrine.nerfs.clone(),
    });

    debug!(faction = %faction.id, doctrine = %doctrine.id, "Doctrine adopted");
    events.push(GameEvent::log(
        LogKind::Doctrine,
        Some(faction.id),
        format!("{} adopted the '{}' doctrine.", faction.name, doctrine.name),
    ));
    events
}

/// Count down time-boxed modifiers and drop the ones that ran out
pub fn expire_temporary_modifiers(faction: &mut Faction) -> Vec<GameEvent> {
    let mut events = Vec::new();
    let owner = faction.id;

    faction.modifiers.temporary_action_cost_modifiers.retain_mut(|modifier| {
        modifier.turns_remaining = modifier.turns_remaining.saturating_sub(1);
        if modifier.turns_remaining == 0 {
            events.push(GameEvent::log(
                LogKind::Doctrine,
                Some(owner),
                format!("Temporary {:?} cost modifier expired", modifier.action_type),
            ));
            false
        } else {
            true
        }
    });

    for doctrine in &mut faction.active_doctrines {
        if let Some(turns) = doctrine.turns_remaining.as_mut() {
            *turns = turns.saturating_sub(1);
        }
    }
    faction.active_doctrines.retain(|d| d.turns_remaining != Some(0));
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::ActionKind;
    use crate::core::types::{NodeId, NodeType};

    fn board() -> NodeMap {
        let mut nodes = NodeMap::new();
        let mut cn = Node::new("CN-E", "East Command", NodeType::Cn, FactionId::GemQ);
        cn.standard_units = 30;
        let mut hub = Node::new("IH", "Hub", NodeType::IndustrialHub, FactionId::GemQ);
        hub.standard_units = 48;
        let enemy = Node::new("CN-W", "West Command", NodeType::Cn, FactionId::Axiom);
        nodes.insert(cn.id.clone(), cn);
        nodes.insert(hub.id.clone(), hub);
        nodes.insert(enemy.id.clone(), enemy);
        nodes
    }

    #[test]
    fn test_double_apply_accumulates() {
        let mut nodes = board();
        let mut faction = Faction::new(FactionId::GemQ);
        let effect = DoctrineEffect::FlatMatIncome { value: 15.0 };
        apply_effect(&mut nodes, &mut faction, &effect);
        apply_effect(&mut nodes, &mut faction, &effect);
        assert_eq!(faction.modifiers.flat_mat_income_bonus, 30.0);
    }

    #[test]
    fn test_gain_mat_is_immediate() {
        let mut nodes = board();
        let mut faction = Faction::new(FactionId::GemQ);
        apply_effect(&mut nodes, &mut faction, &DoctrineEffect::GainMat { value: 50.0 });
        assert_eq!(faction.materiel, 700.0);
    }

    #[test]
    fn test_capacity_never_drops_below_garrison() {
        let mut nodes = board();
        let mut faction = Faction::new(FactionId::GemQ);
        apply_effect(
            &mut nodes,
            &mut faction,
            &DoctrineEffect::MaxUnitCapacityNonCnModifier { value: -10 },
        );
        assert_eq!(nodes[&NodeId::from("IH")].max_units, 48);
        assert_eq!(nodes[&NodeId::from("CN-E")].max_units, 100);
        assert_eq!(nodes[&NodeId::from("CN-W")].max_units, 100);
    }

    #[test]
    fn test_unknown_effect_is_logged_no_op() {
        let mut nodes = board();
        let mut faction = Faction::new(FactionId::GemQ);
        let before = faction.clone();
        let event = apply_effect(
            &mut nodes,
            &mut faction,
            &DoctrineEffect::Unknown {
                tag: "WORMHOLE".into(),
            },
        );
        assert!(event.is_some());
        assert_eq!(faction, before);
    }

    #[test]
    fn test_temporary_modifier_expires() {
        let mut nodes = board();
        let mut faction = Faction::new(FactionId::GemQ);
        apply_effect(
            &mut nodes,
            &mut faction,
            &DoctrineEffect::TemporaryActionCostReduction {
                action_type: ActionKind::DeployUnits,
                value: 50.0,
                duration: 2,
            },
        );
        assert!(expire_temporary_modifiers(&mut faction).is_empty());
        assert_eq!(faction.modifiers.temporary_action_cost_modifiers.len(), 1);
        assert_eq!(expire_temporary_modifiers(&mut faction).len(), 1);
        assert!(faction.modifiers.temporary_action_cost_modifiers.is_empty());
    }
}
