//! Validate and apply one maneuver action
//!
//! Every handler checks everything it needs before it mutates anything, so a
//! rejected action leaves the state exactly as it was. Rejections never
//! escape: they become a no-op plus an `ActionRejected` event.

use rand::Rng;
use thiserror::Error;
use tracing::{debug, warn};

use crate::actions::costs::{
    artillery_move_cost, artillery_purchase_cost, artillery_strike_cost, unit_deploy_cost, unit_move_cost,
    veteran_training_cost,
};
use crate::actions::{Action, ActionKind};
use crate::core::constants::{
    ARTILLERY_STRIKE_FORT_HP_DAMAGE_PER_GUN, ARTILLERY_STRIKE_KILLS_PER_GUN, MAX_ARTILLERY_PER_NODE,
    MAX_DEPLOY_PER_ACTION, VETERAN_TRAINING_TURNS,
};
use crate::core::types::{FactionId, NodeId, NodeType, UnitType};
use crate::covert;
use crate::events::{ActivityKind, GameEvent, LogKind};
use crate::fortification;
use crate::map::graph::hop_distance;
use crate::state::{Faction, GameState, Node, PendingAttack, TrainingOrder};

/// Why an action was refused
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ActionRejection {
    #[error("{0:?} is disabled by doctrine")]
    Disabled(ActionKind),

    #[error("unknown faction {0}")]
    UnknownFaction(FactionId),

    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    #[error("node {0} is not under our control")]
    NotOwned(NodeId),

    #[error("node {0} is friendly")]
    FriendlyTarget(NodeId),

    #[error("{from} is not in range of {to}")]
    OutOfRange { from: NodeId, to: NodeId },

    #[error("{node} has {have} units, {need} requested")]
    InsufficientUnits { node: NodeId, have: u32, need: u32 },

    #[error("insufficient MAT: need {need:.1}, have {have:.1}")]
    InsufficientMateriel { need: f64, have: f64 },

    #[error("insufficient resources: need {influence:.0} QR and {materiel:.1} MAT")]
    InsufficientResources { influence: f64, materiel: f64 },

    #[error("{node} can hold {free} more units, {requested} requested")]
    CapacityExceeded { node: NodeId, free: u32, requested: u32 },

    #[error("{node} must be a {expected} node")]
    WrongNodeType { node: NodeId, expected: &'static str },

    #[error("artillery at {0} is at the cap")]
    ArtilleryCap(NodeId),

    #[error("{node} has {have} guns, {need} requested")]
    InsufficientArtillery { node: NodeId, have: u32, need: u32 },

    #[error("doctrine limits control of {0:?} nodes")]
    NodeTypeLimit(NodeType),

    #[error("doctrine forbids taking neutral ground next to the enemy at {0}")]
    NeutralCaptureForbidden(NodeId),

    #[error("deployment limit reached")]
    DeployLimit,

    #[error("training already under way at {0}")]
    TrainingInProgress(NodeId),

    #[error("{0} is not connected to a command node")]
    Disconnected(NodeId),

    #[error("recon array {0} is already active")]
    AlreadyActive(NodeId),

    #[error("recon array {0} is not active")]
    NotActive(NodeId),

    #[error("at most {0} recon arrays may be active")]
    ReconLimit(u32),

    #[error("new infiltrators are disabled by doctrine")]
    InfiltratorsDisabled,

    #[error("infiltrator cap reached at {0}")]
    InfiltratorCap(NodeId),

    #[error("no infiltrator of ours at {0}")]
    NoInfiltrator(NodeId),

    #[error("fortifications at {0} are at the maximum level")]
    FortificationMaxed(NodeId),

    #[error("no units available to consolidate into {0}")]
    NothingToConsolidate(NodeId),

    #[error("moving every unit out would leave {0} empty")]
    WouldStripNode(NodeId),
}

type Applied = Result<Vec<GameEvent>, ActionRejection>;

/// Validate and apply `action` for `faction`
pub fn apply_action(state: &mut GameState, faction: FactionId, action: &Action, rng: &mut impl Rng) -> Vec<GameEvent> {
    match try_apply(state, faction, action, rng) {
        Ok(events) => events,
        Err(rejection) => {
            warn!(%faction, action = ?action.kind(), reason = %rejection, "Action rejected");
            vec![GameEvent::rejected(faction, rejection.to_string())]
        }
    }
}

fn try_apply(state: &mut GameState, faction: FactionId, action: &Action, rng: &mut impl Rng) -> Applied {
    let kind = action.kind();
    if faction_of(state, faction)?.modifiers.is_action_disabled(kind) {
        return Err(ActionRejection::Disabled(kind));
    }
    debug!(%faction, action = ?kind, "Applying action");

    match action {
        Action::DeployUnits { node_id, quantity } => deploy(state, faction, node_id, *quantity),
        Action::MoveUnits {
            node_id,
            target_node_id,
            units,
        } => move_units(state, faction, kind, node_id, target_node_id, *units),
        Action::ReinforceNode {
            node_id,
            target_node_id,
            units,
        } => move_units(state, faction, kind, node_id, target_node_id, *units),
        Action::AttackNode {
            node_id,
            target_node_id,
            units,
        } => attack(state, faction, node_id, target_node_id, *units),
        Action::ConsolidateForces { node_id } => consolidate(state, faction, node_id),
        Action::BuildFortifications { node_id } => fortification::fortify(state, faction, node_id),
        Action::PurchaseArtillery { node_id, quantity } => purchase_artillery(state, faction, node_id, *quantity),
        Action::MoveArtillery {
            node_id,
            target_node_id,
            quantity,
        } => move_artillery(state, faction, node_id, target_node_id, *quantity),
        Action::ArtilleryStrike {
            node_id,
            target_node_id,
            guns,
        } => artillery_strike(state, faction, node_id, target_node_id, *guns, rng),
        Action::TrainInfiltrator {
            node_id,
            target_node_id,
        } => covert::train_infiltrator(state, faction, node_id, target_node_id),
        Action::SabotageMateriel { node_id } => covert::sabotage(state, faction, node_id, rng),
        Action::ActivateReconArray { node_id } => covert::activate_recon_array(state, faction, node_id),
        Action::PerformReconPulse { node_id } => covert::perform_recon_pulse(state, faction, node_id, rng),
        Action::TrainVeterans { node_id, quantity } => train_veterans(state, faction, node_id, *quantity),
        Action::HoldPosition => Ok(vec![GameEvent::log(
            LogKind::AiAction,
            Some(faction),
            "Holding current positions",
        )]),
        Action::EconomicFocus => Ok(vec![GameEvent::log(
            LogKind::AiAction,
            Some(faction),
            "Focusing on the economy this turn",
        )]),
    }
}

// === LOOKUPS ===

fn faction_of(state: &GameState, faction: FactionId) -> Result<&Faction, ActionRejection> {
    state.faction(faction).ok_or(ActionRejection::UnknownFaction(faction))
}

fn node_of<'a>(state: &'a GameState, id: &NodeId) -> Result<&'a Node, ActionRejection> {
    state.node(id).ok_or_else(|| ActionRejection::UnknownNode(id.clone()))
}

fn owned_node<'a>(state: &'a GameState, faction: FactionId, id: &NodeId) -> Result<&'a Node, ActionRejection> {
    let node = node_of(state, id)?;
    if node.owner != faction {
        return Err(ActionRejection::NotOwned(id.clone()));
    }
    Ok(node)
}

fn require_units(node: &Node, units: u32) -> Result<(), ActionRejection> {
    if units == 0 || node.standard_units < units {
        return Err(ActionRejection::InsufficientUnits {
            node: node.id.clone(),
            have: node.standard_units,
            need: units,
        });
    }
    Ok(())
}

fn require_materiel(faction: &Faction, cost: f64) -> Result<(), ActionRejection> {
    if faction.materiel < cost {
        return Err(ActionRejection::InsufficientMateriel {
            need: cost,
            have: faction.materiel,
        });
    }
    Ok(())
}

// === UNITS ===

fn deploy(state: &mut GameState, faction: FactionId, node_id: &NodeId, requested: u32) -> Applied {
    let node = owned_node(state, faction, node_id)?;
    if !node.is_command_node() {
        return Err(ActionRejection::WrongNodeType {
            node: node_id.clone(),
            expected: "CN",
        });
    }
    let owner = faction_of(state, faction)?;
    let unit_cost = unit_deploy_cost(&owner.modifiers);
    let limit = owner.modifiers.unit_deploy_limit.unwrap_or(MAX_DEPLOY_PER_ACTION);
    if limit == 0 {
        return Err(ActionRejection::DeployLimit);
    }
    let affordable = if unit_cost <= 0.0 {
        requested
    } else {
        (owner.materiel.max(0.0) / unit_cost).floor().min(u32::MAX as f64) as u32
    };
    let quantity = requested.min(MAX_DEPLOY_PER_ACTION).min(limit).min(affordable);
    if quantity == 0 {
        return Err(ActionRejection::InsufficientMateriel {
            need: unit_cost,
            have: owner.materiel,
        });
    }
    if quantity > node.free_capacity() {
        return Err(ActionRejection::CapacityExceeded {
            node: node_id.clone(),
            free: node.free_capacity(),
            requested: quantity,
        });
    }
    let cost = quantity as f64 * unit_cost;
    let name = node.name.clone();

    if let Some(owner) = state.factions.get_mut(&faction) {
        owner.spend(0.0, cost);
        owner.stats.mat_spent_on_deployment += cost;
        owner.stats.total_units_deployed += quantity;
        owner.stats.current_turn_units_deployed += quantity;
    }
    if let Some(node) = state.map_nodes.get_mut(node_id) {
        node.standard_units += quantity;
    }

    let mut events = vec![
        GameEvent::log(
            LogKind::AiAction,
            Some(faction),
            format!("Deployed {} units at {} for {:.0} MAT", quantity, name, cost),
        ),
        GameEvent::activity(
            node_id,
            ActivityKind::UnitDeploy,
            Some(faction),
            format!("{} units deployed", quantity),
        ),
    ];

    // Doctrines that profit from watching the enemy mobilise
    if let Some(enemy) = faction.opponent().and_then(|id| state.factions.get_mut(&id)) {
        let gain = enemy.modifiers.gain_mat_on_enemy_deployment;
        if gain > 0.0 {
            enemy.materiel += gain;
            events.push(GameEvent::log(
                LogKind::Doctrine,
                Some(enemy.id),
                format!("Gained {:.0} MAT from enemy deployment", gain),
            ));
        }
    }
    Ok(events)
}

/// True if the command-node redeploy doctrine lets this move skip the range check
fn cn_redeploy_ready(owner: &Faction, source: &Node, turn: u32) -> bool {
    match owner.modifiers.move_units_from_cn_to_any_node {
        Some(redeploy) if source.is_command_node() => redeploy
            .last_used_turn
            .map_or(true, |last| turn >= last + redeploy.cooldown),
        _ => false,
    }
}

fn move_units(
    state: &mut GameState,
    faction: FactionId,
    kind: ActionKind,
    from: &NodeId,
    to: &NodeId,
    units: u32,
) -> Applied {
    let source = owned_node(state, faction, from)?;
    require_units(source, units)?;
    let target = node_of(state, to)?;
    let owner = faction_of(state, faction)?;

    if target.owner != faction {
        if kind == ActionKind::ReinforceNode {
            return Err(ActionRejection::NotOwned(to.clone()));
        }
        // Moving into ground we do not hold is an assault
        return attack(state, faction, from, to, units);
    }

    let max_hops = if owner.modifiers.move_units_two_nodes { 2 } else { 1 };
    let redeploy = cn_redeploy_ready(owner, source, state.turn);
    if !redeploy && hop_distance(&state.map_nodes, from, to, max_hops).is_none() {
        return Err(ActionRejection::OutOfRange {
            from: from.clone(),
            to: to.clone(),
        });
    }
    if units > target.free_capacity() {
        return Err(ActionRejection::CapacityExceeded {
            node: to.clone(),
            free: target.free_capacity(),
            requested: units,
        });
    }
    if !owner.modifiers.move_units_leave_zero_units && units >= source.total_units() {
        return Err(ActionRejection::WouldStripNode(from.clone()));
    }
    let cost = unit_move_cost(&owner.modifiers, kind, units, source.is_command_node());
    require_materiel(owner, cost)?;
    let uses_redeploy = redeploy && !source.is_adjacent(to);
    let suppression = owner.modifiers.move_units_suppression_penalty;
    // Enemy doctrine bleeds columns arriving on its border
    let attrition = faction
        .opponent()
        .and_then(|enemy| state.faction(enemy))
        .filter(|enemy| {
            target
                .connections
                .iter()
                .filter_map(|id| state.node(id))
                .any(|n| n.owner == enemy.id)
        })
        .map_or(0, |enemy| enemy.modifiers.enemy_unit_attrition_on_move.min(units));
    let (from_name, to_name) = (source.name.clone(), target.name.clone());
    let turn = state.turn;

    if let Some(owner) = state.factions.get_mut(&faction) {
        owner.spend(0.0, cost);
        owner.stats.total_units_lost += attrition;
        owner.stats.current_turn_units_lost += attrition;
        if uses_redeploy {
            if let Some(redeploy) = owner.modifiers.move_units_from_cn_to_any_node.as_mut() {
                redeploy.last_used_turn = Some(turn);
            }
        }
    }
    if let Some(source) = state.map_nodes.get_mut(from) {
        source.standard_units -= units;
    }
    if let Some(target) = state.map_nodes.get_mut(to) {
        target.standard_units += units - attrition;
        target.suppression += suppression;
    }

    let mut events = vec![
        GameEvent::log(
            LogKind::AiAction,
            Some(faction),
            format!("Moved {} units from {} to {}", units, from_name, to_name),
        ),
        GameEvent::activity(
            to,
            ActivityKind::StatusChange,
            Some(faction),
            format!("{} units arrived from {}", units - attrition, from_name),
        ),
    ];
    if attrition > 0 {
        events.push(GameEvent::activity(
            to,
            ActivityKind::CombatLoss,
            Some(faction),
            format!("{} units lost to enemy harassment on the way to {}", attrition, to_name),
        ));
    }
    Ok(events)
}

fn attack(state: &mut GameState, faction: FactionId, from: &NodeId, to: &NodeId, units: u32) -> Applied {
    let source = owned_node(state, faction, from)?;
    require_units(source, units)?;
    let target = node_of(state, to)?;
    let owner = faction_of(state, faction)?;

    if target.owner == faction {
        return Err(ActionRejection::FriendlyTarget(to.clone()));
    }
    let max_hops = if owner.modifiers.move_units_two_nodes { 2 } else { 1 };
    if hop_distance(&state.map_nodes, from, to, max_hops).is_none() {
        return Err(ActionRejection::OutOfRange {
            from: from.clone(),
            to: to.clone(),
        });
    }
    if let Some(&limit) = owner.modifiers.max_controlled_node_type_limits.get(&target.node_type) {
        let held = state
            .map_nodes
            .values()
            .filter(|n| n.owner == faction && n.node_type == target.node_type)
            .count() as u32;
        if held >= limit {
            return Err(ActionRejection::NodeTypeLimit(target.node_type));
        }
    }
    if target.owner == FactionId::Neutral && owner.modifiers.disable_neutral_node_capture_adjacent_enemy {
        let enemy = faction.opponent();
        let borders_enemy = target
            .connections
            .iter()
            .filter_map(|id| state.node(id))
            .any(|n| Some(n.owner) == enemy);
        if borders_enemy {
            return Err(ActionRejection::NeutralCaptureForbidden(to.clone()));
        }
    }
    let queued = target.pending_attackers.get(&faction).map_or(0, |p| p.units);
    if queued + units > target.max_units {
        return Err(ActionRejection::CapacityExceeded {
            node: to.clone(),
            free: target.max_units.saturating_sub(queued),
            requested: units,
        });
    }
    let cost = if target.owner == FactionId::Neutral && owner.modifiers.free_move_into_neutral_node {
        0.0
    } else {
        unit_move_cost(&owner.modifiers, ActionKind::AttackNode, units, source.is_command_node())
    };
    require_materiel(owner, cost)?;
    let (from_name, to_name, defender) = (source.name.clone(), target.name.clone(), target.owner);

    if let Some(owner) = state.factions.get_mut(&faction) {
        owner.spend(0.0, cost);
    }
    if let Some(source) = state.map_nodes.get_mut(from) {
        source.standard_units -= units;
    }
    if let Some(target) = state.map_nodes.get_mut(to) {
        target
            .pending_attackers
            .entry(faction)
            .and_modify(|p| p.units += units)
            .or_insert_with(|| PendingAttack {
                units,
                from_node_id: from.clone(),
            });
    }

    Ok(vec![GameEvent::log(
        LogKind::AiAction,
        Some(faction),
        format!(
            "{} units from {} move to attack {} ({})",
            units, from_name, to_name, defender
        ),
    )])
}

fn consolidate(state: &mut GameState, faction: FactionId, target_id: &NodeId) -> Applied {
    let target = owned_node(state, faction, target_id)?;
    let mut room = target.free_capacity();
    let mut transfers = Vec::new();
    for neighbor_id in &target.connections {
        if room == 0 {
            break;
        }
        if let Some(neighbor) = state.node(neighbor_id) {
            if neighbor.owner == faction && neighbor.standard_units > 0 {
                let moved = neighbor.standard_units.min(room);
                room -= moved;
                transfers.push((neighbor_id.clone(), moved));
            }
        }
    }
    if transfers.is_empty() {
        return Err(ActionRejection::NothingToConsolidate(target_id.clone()));
    }
    let name = target.name.clone();
    let total: u32 = transfers.iter().map(|(_, n)| n).sum();

    for (neighbor_id, moved) in &transfers {
        if let Some(neighbor) = state.map_nodes.get_mut(neighbor_id) {
            neighbor.standard_units -= moved;
        }
    }
    if let Some(target) = state.map_nodes.get_mut(target_id) {
        target.standard_units += total;
    }

    Ok(vec![
        GameEvent::log(
            LogKind::AiAction,
            Some(faction),
            format!("Consolidated {} units from {} nodes into {}", total, transfers.len(), name),
        ),
        GameEvent::activity(
            target_id,
            ActivityKind::StatusChange,
            Some(faction),
            format!("{} units consolidated", total),
        ),
    ])
}

fn train_veterans(state: &mut GameState, faction: FactionId, node_id: &NodeId, quantity: u32) -> Applied {
    let node = owned_node(state, faction, node_id)?;
    if node.node_type != NodeType::Fortress {
        return Err(ActionRejection::WrongNodeType {
            node: node_id.clone(),
            expected: "FORTRESS",
        });
    }
    if node.training.is_some() {
        return Err(ActionRejection::TrainingInProgress(node_id.clone()));
    }
    require_units(node, quantity)?;
    let owner = faction_of(state, faction)?;
    let cost = veteran_training_cost(&owner.modifiers, quantity);
    require_materiel(owner, cost)?;
    let name = node.name.clone();

    if let Some(owner) = state.factions.get_mut(&faction) {
        owner.spend(0.0, cost);
        owner.stats.mat_spent_on_training += cost;
    }
    if let Some(node) = state.map_nodes.get_mut(node_id) {
        node.training = Some(TrainingOrder {
            unit_type: UnitType::Veteran,
            quantity,
            turns_remaining: VETERAN_TRAINING_TURNS,
        });
    }

    Ok(vec![
        GameEvent::log(
            LogKind::AiAction,
            Some(faction),
            format!("Training {} veterans at {}", quantity, name),
        ),
        GameEvent::activity(
            node_id,
            ActivityKind::Training,
            Some(faction),
            format!("{} units in veteran training", quantity),
        ),
    ])
}

// === ARTILLERY ===

fn purchase_artillery(state: &mut GameState, faction: FactionId, node_id: &NodeId, requested: u32) -> Applied {
    let node = owned_node(state, faction, node_id)?;
    if !matches!(node.node_type, NodeType::IndustrialHub | NodeType::Fortress) {
        return Err(ActionRejection::WrongNodeType {
            node: node_id.clone(),
            expected: "INDUSTRIAL_HUB or FORTRESS",
        });
    }
    let room = MAX_ARTILLERY_PER_NODE.saturating_sub(node.artillery);
    if room == 0 {
        return Err(ActionRejection::ArtilleryCap(node_id.clone()));
    }
    let owner = faction_of(state, faction)?;
    let unit = artillery_purchase_cost(&owner.modifiers);
    let quantity = requested.min(room);
    let (influence, materiel) = (unit.influence * quantity as f64, unit.materiel * quantity as f64);
    if !owner.can_afford(influence, materiel) {
        return Err(ActionRejection::InsufficientResources { influence, materiel });
    }
    let name = node.name.clone();

    if let Some(owner) = state.factions.get_mut(&faction) {
        owner.spend(influence, materiel);
        owner.stats.mat_spent_on_artillery += materiel;
    }
    if let Some(node) = state.map_nodes.get_mut(node_id) {
        node.artillery += quantity;
    }

    Ok(vec![
        GameEvent::log(
            LogKind::Artillery,
            Some(faction),
            format!("Purchased {} artillery at {}", quantity, name),
        ),
        GameEvent::activity(
            node_id,
            ActivityKind::ArtilleryPurchase,
            Some(faction),
            format!("{} guns emplaced", quantity),
        ),
    ])
}

fn move_artillery(state: &mut GameState, faction: FactionId, from: &NodeId, to: &NodeId, quantity: u32) -> Applied {
    let source = owned_node(state, faction, from)?;
    let target = owned_node(state, faction, to)?;
    if !source.is_adjacent(to) {
        return Err(ActionRejection::OutOfRange {
            from: from.clone(),
            to: to.clone(),
        });
    }
    if quantity == 0 || source.artillery < quantity {
        return Err(ActionRejection::InsufficientArtillery {
            node: from.clone(),
            have: source.artillery,
            need: quantity,
        });
    }
    if target.artillery + quantity > MAX_ARTILLERY_PER_NODE {
        return Err(ActionRejection::ArtilleryCap(to.clone()));
    }
    let owner = faction_of(state, faction)?;
    let cost = artillery_move_cost(&owner.modifiers, quantity);
    require_materiel(owner, cost)?;
    let (from_name, to_name) = (source.name.clone(), target.name.clone());

    if let Some(owner) = state.factions.get_mut(&faction) {
        owner.spend(0.0, cost);
        owner.stats.mat_spent_on_artillery += cost;
    }
    if let Some(source) = state.map_nodes.get_mut(from) {
        source.artillery -= quantity;
    }
    if let Some(target) = state.map_nodes.get_mut(to) {
        target.artillery += quantity;
    }

    Ok(vec![GameEvent::log(
        LogKind::Artillery,
        Some(faction),
        format!("Moved {} artillery from {} to {}", quantity, from_name, to_name),
    )])
}

fn artillery_strike(
    state: &mut GameState,
    faction: FactionId,
    from: &NodeId,
    to: &NodeId,
    guns: u32,
    rng: &mut impl Rng,
) -> Applied {
    let source = owned_node(state, faction, from)?;
    if guns == 0 || source.artillery < guns {
        return Err(ActionRejection::InsufficientArtillery {
            node: from.clone(),
            have: source.artillery,
            need: guns,
        });
    }
    let target = node_of(state, to)?;
    if target.owner == faction {
        return Err(ActionRejection::FriendlyTarget(to.clone()));
    }
    let owner = faction_of(state, faction)?;
    let range = (1 + owner.modifiers.artillery_range_modifier).max(1) as u32;
    if hop_distance(&state.map_nodes, from, to, range).is_none() {
        return Err(ActionRejection::OutOfRange {
            from: from.clone(),
            to: to.clone(),
        });
    }
    let cost = artillery_strike_cost(&owner.modifiers) * guns as f64;
    require_materiel(owner, cost)?;

    let kills_per_gun = (ARTILLERY_STRIKE_KILLS_PER_GUN as i32 + owner.modifiers.artillery_damage_modifier).max(0) as u32;
    let fort_damage = guns * ARTILLERY_STRIKE_FORT_HP_DAMAGE_PER_GUN + owner.modifiers.artillery_strike_fort_hp_damage;
    let friendly_fire = owner.modifiers.artillery_strike_own_unit_damage_chance;
    let defender = target.owner;
    let target_name = target.name.clone();

    if let Some(owner) = state.factions.get_mut(&faction) {
        owner.spend(0.0, cost);
        owner.stats.mat_spent_on_artillery_ammo += cost;
    }
    let (killed, hp_removed) = match state.map_nodes.get_mut(to) {
        Some(target) => {
            let killed = target.standard_units.min(guns * kills_per_gun);
            target.standard_units -= killed;
            (killed, target.damage_fortification(fort_damage))
        }
        None => (0, 0),
    };
    if let Some(owner) = state.factions.get_mut(&faction) {
        owner.stats.artillery_kills += killed;
    }
    if let Some(victim) = state.factions.get_mut(&defender) {
        victim.stats.total_units_lost += killed;
        victim.stats.current_turn_units_lost += killed;
    }

    let mut events = vec![
        GameEvent::log(
            LogKind::Artillery,
            Some(faction),
            format!(
                "{} guns shelled {}: {} units killed, {} fortification HP destroyed",
                guns, target_name, killed, hp_removed
            ),
        ),
        GameEvent::activity(
            to,
            ActivityKind::ArtilleryStrike,
            Some(faction),
            format!("Artillery strike killed {} units", killed),
        ),
    ];

    if friendly_fire > 0.0 && rng.gen_bool((friendly_fire / 100.0).clamp(0.0, 1.0)) {
        if let Some(source) = state.map_nodes.get_mut(from) {
            let (lost, _) = source.remove_units(1);
            if lost > 0 {
                if let Some(owner) = state.factions.get_mut(&faction) {
                    owner.stats.total_units_lost += lost;
                    owner.stats.current_turn_units_lost += lost;
                }
                events.push(GameEvent::activity(
                    from,
                    ActivityKind::CombatLoss,
                    Some(faction),
                    "A short round killed one of our own units",
                ));
            }
        }
    }
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::EngineConfig;
    use crate::map::MapType;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn game() -> GameState {
        GameState::new(
            MapType::VolgogradCauldron,
            EngineConfig {
                fog_of_war: false,
                ..Default::default()
            },
        )
    }

    fn run(state: &mut GameState, faction: FactionId, action: Action) -> Vec<GameEvent> {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        apply_action(state, faction, &action, &mut rng)
    }

    #[test]
    fn test_deploy_clamped_to_affordable() {
        let mut state = game();
        state.faction_mut(FactionId::Axiom).unwrap().materiel = 50.0;
        let events = run(
            &mut state,
            FactionId::Axiom,
            Action::DeployUnits {
                node_id: "CN-W".into(),
                quantity: 8,
            },
        );
        assert!(!events.iter().any(GameEvent::is_rejection));
        assert_eq!(state.node(&"CN-W".into()).unwrap().standard_units, 28);
        assert_eq!(state.faction(FactionId::Axiom).unwrap().materiel, 5.0);
    }

    #[test]
    fn test_deploy_unaffordable_is_noop() {
        let mut state = game();
        state.faction_mut(FactionId::Axiom).unwrap().materiel = 10.0;
        let before = state.clone();
        let events = run(
            &mut state,
            FactionId::Axiom,
            Action::DeployUnits {
                node_id: "CN-W".into(),
                quantity: 1,
            },
        );
        assert!(events[0].is_rejection());
        assert_eq!(state, before);
    }

    #[test]
    fn test_attack_queues_and_accumulates() {
        let mut state = game();
        for units in [3, 2] {
            run(
                &mut state,
                FactionId::Axiom,
                Action::AttackNode {
                    node_id: "WG".into(),
                    target_node_id: "MK".into(),
                    units,
                },
            );
        }
        let target = state.node(&"MK".into()).unwrap();
        assert_eq!(target.pending_attackers[&FactionId::Axiom].units, 5);
        assert_eq!(state.node(&"WG".into()).unwrap().standard_units, 13);
    }

    #[test]
    fn test_move_into_enemy_becomes_attack() {
        let mut state = game();
        run(
            &mut state,
            FactionId::GemQ,
            Action::MoveUnits {
                node_id: "EG".into(),
                target_node_id: "TF".into(),
                units: 4,
            },
        );
        assert_eq!(state.node(&"TF".into()).unwrap().pending_attackers[&FactionId::GemQ].units, 4);
    }

    #[test]
    fn test_reinforce_requires_friendly_target() {
        let mut state = game();
        let events = run(
            &mut state,
            FactionId::GemQ,
            Action::ReinforceNode {
                node_id: "EG".into(),
                target_node_id: "TF".into(),
                units: 4,
            },
        );
        assert!(events[0].is_rejection());
    }

    #[test]
    fn test_move_out_of_range_rejected() {
        let mut state = game();
        let events = run(
            &mut state,
            FactionId::Axiom,
            Action::MoveUnits {
                node_id: "CN-W".into(),
                target_node_id: "WG".into(),
                units: 5,
            },
        );
        assert!(events[0].is_rejection());

        state.faction_mut(FactionId::Axiom).unwrap().modifiers.move_units_two_nodes = true;
        let events = run(
            &mut state,
            FactionId::Axiom,
            Action::MoveUnits {
                node_id: "CN-W".into(),
                target_node_id: "WG".into(),
                units: 5,
            },
        );
        assert!(!events[0].is_rejection());
        assert_eq!(state.node(&"WG".into()).unwrap().standard_units, 23);
    }

    #[test]
    fn test_disabled_action_rejected() {
        let mut state = game();
        state
            .faction_mut(FactionId::Axiom)
            .unwrap()
            .modifiers
            .disabled_actions
            .insert(ActionKind::HoldPosition);
        let events = run(&mut state, FactionId::Axiom, Action::HoldPosition);
        assert!(events[0].is_rejection());
    }

    #[test]
    fn test_artillery_purchase_and_strike() {
        let mut state = game();
        state.node_mut(&"WSH".into()).unwrap().owner = FactionId::Axiom;
        run(
            &mut state,
            FactionId::Axiom,
            Action::PurchaseArtillery {
                node_id: "WSH".into(),
                quantity: 2,
            },
        );
        assert_eq!(state.node(&"WSH".into()).unwrap().artillery, 2);
        assert_eq!(state.faction(FactionId::Axiom).unwrap().influence, 40.0);

        state.node_mut(&"KA".into()).unwrap().owner = FactionId::GemQ;
        state.node_mut(&"KA".into()).unwrap().standard_units = 5;
        run(
            &mut state,
            FactionId::Axiom,
            Action::ArtilleryStrike {
                node_id: "WSH".into(),
                target_node_id: "KA".into(),
                guns: 2,
            },
        );
        assert_eq!(state.node(&"KA".into()).unwrap().standard_units, 3);
        assert_eq!(state.faction(FactionId::Axiom).unwrap().stats.artillery_kills, 2);
    }

    #[test]
    fn test_consolidate_pulls_from_neighbours() {
        let mut state = game();
        run(
            &mut state,
            FactionId::Axiom,
            Action::ConsolidateForces { node_id: "KA".into() },
        );
        // WG (18) and WSH (0) border KA
        assert_eq!(state.node(&"KA".into()).unwrap().standard_units, 19);
        assert_eq!(state.node(&"WG".into()).unwrap().standard_units, 0);
    }

    #[test]
    fn test_veteran_training_order() {
        let mut state = game();
        let id = NodeId::from("NS");
        state.node_mut(&id).unwrap().owner = FactionId::Axiom;
        run(
            &mut state,
            FactionId::Axiom,
            Action::TrainVeterans {
                node_id: id.clone(),
                quantity: 4,
            },
        );
        let order = state.node(&id).unwrap().training.clone().unwrap();
        assert_eq!((order.quantity, order.turns_remaining), (4, 2));
        assert_eq!(state.faction(FactionId::Axiom).unwrap().materiel, 610.0);
    }
}
