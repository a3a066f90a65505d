//! Battle resolution
//!
//! Every node with queued attackers is fought over once per Combat phase.
//! Attackers go in faction order. Each one wears down the same standing
//! garrison until some attacker breaks through; from then on the remaining
//! attackers fight that attacker for the node.

use std::collections::BTreeMap;

use rand::Rng;
use tracing::{debug, info};

use crate::combat::dice::roll_hits;
use crate::combat::{BattleOutcome, BattleReport, BattleRound};
use crate::core::constants::{
    BATTLE_FORT_HP_DAMAGE_PER_ROUND, BATTLE_PROMOTION_RATIO, FORT_DEFENSE_BONUS_PER_LEVEL, MAX_BATTLE_ROUNDS,
};
use crate::core::types::{FactionId, NodeId, NodeType};
use crate::covert::recon::refresh_recon_capability;
use crate::doctrine::{CombatCondition, DoctrineModifiers};
use crate::events::{ActivityKind, GameEvent, LogKind};
use crate::state::{GameState, Node, PendingAttack};

/// One side of a battle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Force {
    pub faction: FactionId,
    pub standard: u32,
    pub veteran: u32,
    /// Flat bonus added to every die this side rolls
    pub roll_bonus: i32,
}

impl Force {
    pub fn total(&self) -> u32 {
        self.standard + self.veteran
    }

    /// Remove casualties, standard units first
    fn take_losses(&mut self, hits: u32) -> u32 {
        let standard = hits.min(self.standard);
        let veteran = (hits - standard).min(self.veteran);
        self.standard -= standard;
        self.veteran -= veteran;
        standard + veteran
    }
}

/// Inputs to a single battle
#[derive(Debug, Clone, Copy)]
pub struct Engagement {
    pub attacker: Force,
    pub defender: Force,
    /// Extra defender bonus while any fortification level still stands
    pub fortification_modifier: i32,
}

/// What came out of [`fight`]
#[derive(Debug, Clone)]
pub struct FightResult {
    pub attacker: Force,
    pub defender: Force,
    pub outcome: BattleOutcome,
    pub rounds: Vec<BattleRound>,
    pub fortification_bonus_used: i32,
    pub fortification_hp_damage: u32,
}

fn fortification_bonus(node: &Node, modifier: i32) -> i32 {
    let level = node.effective_fortification_level() as i32;
    if level == 0 {
        0
    } else {
        level * FORT_DEFENSE_BONUS_PER_LEVEL + modifier
    }
}

/// Run exchange rounds until one side is gone
///
/// Both sides roll from their strength at the start of the round and losses
/// land simultaneously. The node's fortifications take damage every round
/// and the defender bonus follows the HP that is left. A zero-unit defender
/// is a walk-over: no dice, attacker wins untouched.
///
/// Rounds stop at [`MAX_BATTLE_ROUNDS`] even if both sides still stand, as
/// can happen when penalties push every die below the hit threshold. Such a
/// fight is scored as `DefenderWins`: the attack is repulsed and the
/// garrison keeps the node.
pub fn fight(engagement: Engagement, node: &mut Node, rng: &mut impl Rng) -> FightResult {
    let mut attacker = engagement.attacker;
    let mut defender = engagement.defender;
    let bonus_used = fortification_bonus(node, engagement.fortification_modifier);
    let mut rounds = Vec::new();
    let mut fort_damage = 0;

    if defender.total() == 0 {
        return FightResult {
            attacker,
            defender,
            outcome: BattleOutcome::AttackerWins,
            rounds,
            fortification_bonus_used: bonus_used,
            fortification_hp_damage: 0,
        };
    }

    let mut round_number = 0;
    while attacker.total() > 0 && defender.total() > 0 && round_number < MAX_BATTLE_ROUNDS {
        round_number += 1;
        let fort_bonus = fortification_bonus(node, engagement.fortification_modifier);
        let attacker_start = attacker.total();
        let defender_start = defender.total();

        let attack = roll_hits(attacker.standard, attacker.veteran, attacker.roll_bonus, rng);
        let defence = roll_hits(defender.standard, defender.veteran, defender.roll_bonus + fort_bonus, rng);

        let defender_losses = defender.take_losses(attack.hits);
        let attacker_losses = attacker.take_losses(defence.hits);
        fort_damage += node.damage_fortification(BATTLE_FORT_HP_DAMAGE_PER_ROUND);

        rounds.push(BattleRound {
            round_number,
            attacker_units_start: attacker_start,
            defender_units_start: defender_start,
            attacker_dice_rolls: attack.raw,
            defender_dice_rolls: defence.raw,
            attacker_final_rolls: attack.modified,
            defender_final_rolls: defence.modified,
            defender_fortification_bonus: fort_bonus,
            attacker_losses,
            defender_losses,
            attacker_units_end: attacker.total(),
            defender_units_end: defender.total(),
        });
    }

    // An undecided assault at the round cap counts as repulsed
    let outcome = match (attacker.total(), defender.total()) {
        (0, 0) => BattleOutcome::Stalemate,
        (_, 0) => BattleOutcome::AttackerWins,
        _ => BattleOutcome::DefenderWins,
    };

    FightResult {
        attacker,
        defender,
        outcome,
        rounds,
        fortification_bonus_used: bonus_used,
        fortification_hp_damage: fort_damage,
    }
}

/// Battlefield promotion: one in five surviving standard units, plus doctrine
fn promote(force: &mut Force, modifier: i32) -> u32 {
    if force.standard == 0 {
        return 0;
    }
    let promoted = ((force.standard / BATTLE_PROMOTION_RATIO) as i32 + modifier).clamp(0, force.standard as i32) as u32;
    force.standard -= promoted;
    force.veteran += promoted;
    promoted
}

fn modifiers_of(state: &GameState, faction: FactionId) -> DoctrineModifiers {
    state
        .factions
        .get(&faction)
        .map(|f| f.modifiers.clone())
        .unwrap_or_default()
}

fn borders(state: &GameState, node: &Node, owner: FactionId) -> bool {
    node.connections
        .iter()
        .filter_map(|id| state.map_nodes.get(id))
        .any(|n| n.owner == owner)
}

fn borders_recon_array(state: &GameState, node: &Node, owner: FactionId) -> bool {
    node.connections
        .iter()
        .filter_map(|id| state.map_nodes.get(id))
        .any(|n| n.owner == owner && n.node_type == NodeType::ReconArray)
}

/// A force marching on a contested node
#[derive(Debug, Clone)]
struct Column {
    faction: FactionId,
    standard: u32,
    veteran: u32,
    from_node_id: NodeId,
}

impl Column {
    fn total(&self) -> u32 {
        self.standard + self.veteran
    }
}

/// Build both sides' bonuses from doctrine modifiers and the ground
fn engagement_for(state: &GameState, node: &Node, column: &Column) -> Engagement {
    let attacker = column.faction;
    let defender = node.owner;
    let att = modifiers_of(state, attacker);
    let def = modifiers_of(state, defender);
    let neutral_ground = defender == FactionId::Neutral;
    let defender_opponent = defender.opponent();

    let attacker_conditions = |c: CombatCondition| match c {
        CombatCondition::Attacking | CombatCondition::UnitsInBattle => true,
        CombatCondition::NeutralTerritory => neutral_ground,
        CombatCondition::AdjacentToEnemyTerritory => attacker.opponent().is_some_and(|e| borders(state, node, e)),
        _ => false,
    };
    let mut attacker_bonus = att.combat_roll_modifier + att.conditional_roll_bonus(attacker_conditions);
    if neutral_ground {
        attacker_bonus += att.combat_bonus_neutral_territory;
    }
    if borders_recon_array(state, node, defender) {
        attacker_bonus -= def.enemy_combat_penalty_adjacent_recon_array;
    }
    if node.node_type == NodeType::ReconArray {
        attacker_bonus += def.own_recon_array_enemy_attack_bonus;
    }

    let low_fort_hp = node.fortification_level > 0 && node.fortification_hp * 2 < node.max_fortification_hp;
    let defender_conditions = |c: CombatCondition| match c {
        CombatCondition::Defending | CombatCondition::UnitsInBattle => true,
        CombatCondition::LowFortHp => low_fort_hp,
        CombatCondition::NodeHasArtilleryAndUnits => node.artillery > 0 && node.total_units() > 0,
        CombatCondition::AdjacentToEnemyTerritory => defender_opponent.is_some_and(|e| borders(state, node, e)),
        _ => false,
    };
    let mut defender_bonus = def.combat_roll_modifier + def.conditional_roll_bonus(defender_conditions);
    if node.node_type == NodeType::Fortress {
        defender_bonus -= def.combat_penalty_own_fortress_defense;
    }
    if neutral_ground {
        defender_bonus -= att.neutral_node_capture_bonus_reduction;
    }

    Engagement {
        attacker: Force {
            faction: attacker,
            standard: column.standard,
            veteran: column.veteran,
            roll_bonus: attacker_bonus,
        },
        defender: Force {
            faction: defender,
            standard: node.standard_units,
            veteran: node.veteran_units,
            roll_bonus: defender_bonus,
        },
        fortification_modifier: def.fortification_combat_bonus_modifier,
    }
}

/// Share of a side's battle losses its doctrine brings back as stragglers
fn stragglers(modifiers: &DoctrineModifiers, losses: u32) -> u32 {
    (losses as f64 * modifiers.recover_lost_units_after_battle_percentage / 100.0)
        .floor()
        .clamp(0.0, losses as f64) as u32
}

fn record_losses(state: &mut GameState, faction: FactionId, losses: u32) {
    if let Some(f) = state.factions.get_mut(&faction) {
        f.stats.total_units_lost += losses;
        f.stats.current_turn_units_lost += losses;
    }
}

/// The attacker already holds the node: the column simply joins the garrison
fn join_garrison(state: &mut GameState, node_id: &NodeId, column: Column, events: &mut Vec<GameEvent>) {
    if let Some(node) = state.map_nodes.get_mut(node_id) {
        let joined = column.total().min(node.free_capacity());
        node.standard_units += joined;
        events.push(GameEvent::activity(
            node_id,
            ActivityKind::StatusChange,
            Some(column.faction),
            format!("{} units joined the garrison without a fight", joined),
        ));
    }
}

/// Fight one column against the garrison currently standing in the node
///
/// A column that wipes the garrison out is handed back for [`occupy`] to
/// install; until then the node stands empty under its old owner.
fn assault(
    state: &mut GameState,
    node_id: &NodeId,
    column: Column,
    rng: &mut impl Rng,
    events: &mut Vec<GameEvent>,
) -> Option<(BattleReport, Option<Column>)> {
    let turn = state.turn;
    let snapshot = state.map_nodes.get(node_id).cloned()?;
    let engagement = engagement_for(state, &snapshot, &column);
    let attacker = column.faction;
    let defender = snapshot.owner;
    let att_mods = modifiers_of(state, attacker);
    let def_mods = modifiers_of(state, defender);

    let node = state.map_nodes.get_mut(node_id)?;
    let mut result = fight(engagement, node, rng);
    let attacker_before = column.total();
    let defender_before = engagement.defender.total();
    let attacker_after = result.attacker.total();
    let defender_after = result.defender.total();
    let attacker_losses = attacker_before - attacker_after;
    let defender_losses = defender_before - defender_after;

    let report = BattleReport {
        id: format!("battle-{}-{}-{}-{}", turn, node_id, attacker, defender),
        turn,
        attacker,
        defender,
        node_id: node_id.clone(),
        outcome: result.outcome,
        attacker_units_before: attacker_before,
        defender_units_before: defender_before,
        attacker_units_after: attacker_after,
        defender_units_after: defender_after,
        attacker_losses,
        defender_losses,
        node_captured: false,
        fortification_bonus_used: result.fortification_bonus_used,
        fortification_hp_damage: result.fortification_hp_damage,
        rounds: std::mem::take(&mut result.rounds),
    };

    let mut survivors = None;
    let mut overflow = 0;
    let mut returned = 0;
    match result.outcome {
        BattleOutcome::AttackerWins => {
            let promoted = promote(&mut result.attacker, att_mods.battlefield_promotion_modifier);
            node.standard_units = 0;
            node.veteran_units = 0;
            if let Some(f) = state.factions.get_mut(&attacker) {
                f.stats.battles_won += 1;
                f.stats.battles_won_as_attacker += 1;
                f.stats.units_promoted += promoted;
                f.materiel += att_mods.battle_reward_mat;
            }
            if let Some(f) = state.factions.get_mut(&defender) {
                f.stats.battles_lost += 1;
            }
            if defender_before > 0 {
                events.push(GameEvent::activity(
                    node_id,
                    ActivityKind::CombatLoss,
                    Some(defender),
                    format!("Garrison of {} overrun by {}", snapshot.name, attacker),
                ));
            }
            survivors = Some(Column {
                standard: result.attacker.standard,
                veteran: result.attacker.veteran,
                ..column.clone()
            });
        }
        BattleOutcome::DefenderWins => {
            let promoted = promote(&mut result.defender, def_mods.battlefield_promotion_modifier);
            node.standard_units = result.defender.standard;
            node.veteran_units = result.defender.veteran;

            if let Some(f) = state.factions.get_mut(&defender) {
                f.stats.battles_won += 1;
                f.stats.units_promoted += promoted;
                f.materiel += def_mods.battle_reward_mat;
            }
            if let Some(f) = state.factions.get_mut(&attacker) {
                f.stats.battles_lost += 1;
            }
            events.push(GameEvent::activity(
                node_id,
                ActivityKind::CombatLoss,
                Some(defender),
                format!("{} held {} against {}", defender, snapshot.name, attacker),
            ));

            // Survivors of a repulsed assault fall back to where they came from
            if attacker_after > 0 {
                if let Some(source) = state.map_nodes.get_mut(&column.from_node_id) {
                    if source.owner == attacker {
                        returned = attacker_after.min(source.free_capacity());
                        source.standard_units += returned;
                    }
                }
                overflow = attacker_after - returned;
            }
        }
        BattleOutcome::Stalemate => {
            node.standard_units = 0;
            node.veteran_units = 0;
            for side in [attacker, defender] {
                if let Some(f) = state.factions.get_mut(&side) {
                    f.stats.battles_lost += 1;
                }
            }
            events.push(GameEvent::activity(
                node_id,
                ActivityKind::CombatLoss,
                None,
                format!("Mutual annihilation at {}", snapshot.name),
            ));
        }
    }

    let mut attacker_recovered = 0;
    let attacker_stragglers = stragglers(&att_mods, attacker_losses);
    if attacker_stragglers > 0 {
        if let Some(source) = state.map_nodes.get_mut(&column.from_node_id) {
            if source.owner == attacker {
                attacker_recovered = attacker_stragglers.min(source.free_capacity());
                source.standard_units += attacker_recovered;
            }
        }
    }
    let mut defender_recovered = 0;
    let defender_stragglers = stragglers(&def_mods, defender_losses);
    if defender_stragglers > 0 && result.outcome == BattleOutcome::DefenderWins {
        if let Some(held) = state.map_nodes.get_mut(node_id) {
            defender_recovered = defender_stragglers.min(held.free_capacity());
            held.standard_units += defender_recovered;
        }
    }
    for (side, recovered, at) in [
        (attacker, attacker_recovered, &column.from_node_id),
        (defender, defender_recovered, node_id),
    ] {
        if recovered > 0 {
            events.push(GameEvent::activity(
                at,
                ActivityKind::StatusChange,
                Some(side),
                format!("{} stragglers recovered after the battle at {}", recovered, snapshot.name),
            ));
        }
    }

    if let Some(f) = state.factions.get_mut(&attacker) {
        f.stats.battles_initiated += 1;
    }
    record_losses(state, attacker, attacker_losses + overflow - attacker_recovered);
    record_losses(state, defender, defender_losses - defender_recovered);
    if overflow > 0 {
        events.push(GameEvent::log(
            LogKind::Event,
            Some(attacker),
            format!("{} surviving units could not be quartered and disbanded", overflow),
        ));
    }
    if returned > 0 {
        events.push(GameEvent::activity(
            &column.from_node_id,
            ActivityKind::StatusChange,
            Some(attacker),
            format!("{} units fell back from {}", returned, snapshot.name),
        ));
    }
    if report.fortification_hp_damage > 0 {
        events.push(GameEvent::activity(
            node_id,
            ActivityKind::FortDamage,
            None,
            format!("Fortifications took {} damage", report.fortification_hp_damage),
        ));
    }

    debug!(
        node = %node_id,
        outcome = ?report.outcome,
        rounds = report.rounds.len(),
        attacker_losses,
        defender_losses,
        "Battle resolved"
    );
    events.push(GameEvent::log(
        LogKind::Event,
        Some(attacker),
        format!(
            "Battle at {}: {} ({} lost) vs {} ({} lost), {:?}",
            snapshot.name, attacker, attacker_losses, defender, defender_losses, report.outcome
        ),
    ));
    Some((report, survivors))
}

/// Install a victorious column as the node's new garrison
fn occupy(state: &mut GameState, node_id: &NodeId, column: Column, losses: u32, events: &mut Vec<GameEvent>) {
    let attacker = column.faction;
    let att_mods = modifiers_of(state, attacker);
    let Some(node) = state.map_nodes.get_mut(node_id) else {
        return;
    };
    let previous = node.owner;
    node.owner = attacker;
    node.training = None;
    node.infiltrators.remove(&attacker);
    node.max_units = node.shifted_capacity(att_mods.capacity_shift(node.is_command_node()));
    node.fortification_hp_modifier = att_mods.fortification_hp_modifier;
    node.suppression = att_mods.suppression_increase;
    node.veteran_units = column.veteran.min(node.max_units);
    node.standard_units = column.standard.min(node.max_units - node.veteran_units);
    let overflow = column.total() - node.total_units();
    node.materiel_output = (node.materiel_output - att_mods.permanent_node_mat_reduction_on_capture).max(0.0);
    let name = node.name.clone();

    if let Some(f) = state.factions.get_mut(&attacker) {
        f.stats.nodes_captured += 1;
        f.stats.units_lost_in_successful_captures += losses;
        f.materiel += att_mods.gain_mat_on_capture_modifier;
    }
    if let Some(f) = state.factions.get_mut(&previous) {
        if f.activated_recon_node_ids.remove(node_id) {
            events.push(GameEvent::activity(
                node_id,
                ActivityKind::ReconArrayDeactivated,
                Some(previous),
                "Recon array lost with the node",
            ));
        }
        refresh_recon_capability(&state.map_nodes, f);
    }
    if overflow > 0 {
        record_losses(state, attacker, overflow);
        events.push(GameEvent::log(
            LogKind::Event,
            Some(attacker),
            format!("{} surviving units could not be quartered and disbanded", overflow),
        ));
    }

    info!(node = %node_id, %attacker, defender = %previous, "Node captured");
    events.push(GameEvent::activity(
        node_id,
        ActivityKind::Capture,
        Some(attacker),
        format!("{} captured {} from {}", attacker, name, previous),
    ));
}

/// Resolve every column queued against one node
///
/// Columns go in faction order and each fights whatever garrison stands in
/// the node when its turn comes. A column that breaks through takes the
/// node at once, so a later column meets that new holder rather than the
/// emptied remains of the original garrison.
fn resolve_node(
    state: &mut GameState,
    node_id: &NodeId,
    pending: BTreeMap<FactionId, PendingAttack>,
    rng: &mut impl Rng,
) -> Vec<GameEvent> {
    let mut events = Vec::new();
    for (faction, attack) in pending {
        let column = Column {
            faction,
            standard: attack.units,
            veteran: 0,
            from_node_id: attack.from_node_id,
        };
        if state.map_nodes.get(node_id).is_some_and(|n| n.owner == faction) {
            join_garrison(state, node_id, column, &mut events);
            continue;
        }
        if let Some((mut report, survivors)) = assault(state, node_id, column, rng, &mut events) {
            if let Some(column) = survivors {
                report.node_captured = true;
                occupy(state, node_id, column, report.attacker_losses, &mut events);
            }
            events.push(GameEvent::Battle(Box::new(report)));
        }
    }
    events
}

/// Resolve every contested node and clear all pending attacks
pub fn resolve_combat_phase(state: &mut GameState, rng: &mut impl Rng) -> Vec<GameEvent> {
    let contested: Vec<NodeId> = state
        .map_nodes
        .values()
        .filter(|n| !n.pending_attackers.is_empty())
        .map(|n| n.id.clone())
        .collect();

    let mut events = Vec::new();
    for node_id in contested {
        let pending = match state.map_nodes.get_mut(&node_id) {
            Some(node) => std::mem::take(&mut node.pending_attackers),
            None => continue,
        };
        events.extend(resolve_node(state, &node_id, pending, rng));
    }
    if events.is_empty() {
        events.push(GameEvent::log(LogKind::Info, None, "No battles this turn."));
    }
    events
}
