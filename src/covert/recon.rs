//! Recon arrays and pulses
//!
//! An array counts toward pulse capability only while its owner still holds
//! it and can trace owned territory back to a command node.

use rand::Rng;
use tracing::{debug, info};

use crate::actions::apply::ActionRejection;
use crate::actions::costs::{recon_activation_cost, recon_pulse_cost};
use crate::core::types::{FactionId, NodeId, NodeType};
use crate::events::{ActivityKind, GameEvent, LogKind};
use crate::map::graph::{is_connected_to_command_node, NodeMap};
use crate::state::{Faction, GameState};

/// Drop arrays the faction no longer holds and recompute pulse capability
pub fn refresh_recon_capability(nodes: &NodeMap, faction: &mut Faction) {
    let id = faction.id;
    faction
        .activated_recon_node_ids
        .retain(|node_id| nodes.get(node_id).is_some_and(|n| n.owner == id));
    faction.is_recon_system_active = faction
        .activated_recon_node_ids
        .iter()
        .any(|node_id| is_connected_to_command_node(nodes, node_id, id));
}

/// Apply an ACTIVATE_RECON_ARRAY order
pub fn activate_recon_array(
    state: &mut GameState,
    faction: FactionId,
    node_id: &NodeId,
) -> Result<Vec<GameEvent>, ActionRejection> {
    let node = state
        .node(node_id)
        .ok_or_else(|| ActionRejection::UnknownNode(node_id.clone()))?;
    let owner = state
        .faction(faction)
        .ok_or(ActionRejection::UnknownFaction(faction))?;

    if node.owner != faction {
        return Err(ActionRejection::NotOwned(node_id.clone()));
    }
    if node.node_type != NodeType::ReconArray {
        return Err(ActionRejection::WrongNodeType {
            node: node_id.clone(),
            expected: "RECON_ARRAY",
        });
    }
    if owner.activated_recon_node_ids.contains(node_id) {
        return Err(ActionRejection::AlreadyActive(node_id.clone()));
    }
    if let Some(limit) = owner.modifiers.max_active_recon_array_limit {
        if owner.activated_recon_node_ids.len() as u32 >= limit {
            return Err(ActionRejection::ReconLimit(limit));
        }
    }
    if !is_connected_to_command_node(&state.map_nodes, node_id, faction) {
        return Err(ActionRejection::Disconnected(node_id.clone()));
    }
    let cost = recon_activation_cost(&owner.modifiers);
    if !owner.can_afford(cost.influence, cost.materiel) {
        return Err(ActionRejection::InsufficientResources {
            influence: cost.influence,
            materiel: cost.materiel,
        });
    }
    let name = node.name.clone();

    let Some(owner) = state.factions.get_mut(&faction) else {
        return Err(ActionRejection::UnknownFaction(faction));
    };
    owner.spend(cost.influence, cost.materiel);
    owner.stats.qr_spent_on_recon += cost.influence;
    owner.stats.mat_spent_on_recon += cost.materiel;
    owner.activated_recon_node_ids.insert(node_id.clone());
    refresh_recon_capability(&state.map_nodes, owner);
    info!(%faction, node = %node_id, "Recon array activated");

    Ok(vec![
        GameEvent::log(LogKind::Recon, Some(faction), format!("Activated recon array at {}", name)),
        GameEvent::activity(
            node_id,
            ActivityKind::ReconArrayActivated,
            Some(faction),
            "Recon array online",
        ),
    ])
}

/// Apply a PERFORM_RECON_PULSE order
///
/// A successful pulse shows the whole board through the end of the current
/// turn, extended by any pulse-duration doctrine. An enemy jamming doctrine
/// can make the pulse fail after it has been paid for.
pub fn perform_recon_pulse(
    state: &mut GameState,
    faction: FactionId,
    node_id: &NodeId,
    rng: &mut impl Rng,
) -> Result<Vec<GameEvent>, ActionRejection> {
    let owner = state
        .faction(faction)
        .ok_or(ActionRejection::UnknownFaction(faction))?;
    if !owner.activated_recon_node_ids.contains(node_id) {
        return Err(ActionRejection::NotActive(node_id.clone()));
    }
    if !is_connected_to_command_node(&state.map_nodes, node_id, faction) {
        return Err(ActionRejection::Disconnected(node_id.clone()));
    }
    let cost = recon_pulse_cost(&owner.modifiers);
    if !owner.can_afford(cost.influence, cost.materiel) {
        return Err(ActionRejection::InsufficientResources {
            influence: cost.influence,
            materiel: cost.materiel,
        });
    }
    let jamming = faction
        .opponent()
        .and_then(|enemy| state.faction(enemy))
        .map(|enemy| enemy.modifiers.enemy_recon_pulse_failure_chance)
        .unwrap_or(0.0);
    let turn = state.turn;

    let Some(owner) = state.factions.get_mut(&faction) else {
        return Err(ActionRejection::UnknownFaction(faction));
    };
    owner.spend(cost.influence, cost.materiel);
    owner.stats.qr_spent_on_recon += cost.influence;
    owner.stats.mat_spent_on_recon += cost.materiel;

    if jamming > 0.0 && rng.gen_bool((jamming / 100.0).clamp(0.0, 1.0)) {
        debug!(%faction, "Recon pulse jammed");
        return Ok(vec![
            GameEvent::log(LogKind::Recon, Some(faction), "Recon pulse jammed by enemy countermeasures"),
            GameEvent::activity(node_id, ActivityKind::ReconPulseActivated, Some(faction), "Pulse jammed"),
        ]);
    }

    let extra_turns = owner.modifiers.recon_pulse_duration_modifier;
    owner.recon_pulse_expires_after_turn = Some(turn + extra_turns);
    owner.stats.pulses_performed += 1;
    owner.stats.intel_advantage_turns += 1 + extra_turns;
    info!(%faction, turn, "Recon pulse active");

    Ok(vec![
        GameEvent::log(
            LogKind::Recon,
            Some(faction),
            format!("Recon pulse grants full visibility through turn {}", turn + extra_turns),
        ),
        GameEvent::activity(node_id, ActivityKind::ReconPulseActivated, Some(faction), "Recon pulse"),
    ])
}

/// Clear pulses whose window has closed before `next_turn`
pub fn expire_pulses(state: &mut GameState, next_turn: u32) {
    for faction in state.factions.values_mut() {
        if faction.recon_pulse_expires_after_turn.is_some_and(|last| last < next_turn) {
            faction.recon_pulse_expires_after_turn = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::EngineConfig;
    use crate::map::MapType;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    /// Axiom holding the Don recon array next to its command node
    fn game_with_array() -> (GameState, NodeId) {
        let mut state = GameState::new(
            MapType::VolgogradCauldron,
            EngineConfig {
                fog_of_war: false,
                ..Default::default()
            },
        );
        let id = NodeId::from("FBD");
        state.node_mut(&id).unwrap().owner = FactionId::Axiom;
        (state, id)
    }

    #[test]
    fn test_activate_then_pulse() {
        let (mut state, id) = game_with_array();
        activate_recon_array(&mut state, FactionId::Axiom, &id).unwrap();
        let axiom = state.faction(FactionId::Axiom).unwrap();
        assert!(axiom.is_recon_system_active);
        assert_eq!(axiom.influence, 25.0);
        assert_eq!(axiom.materiel, 600.0);

        state.faction_mut(FactionId::Axiom).unwrap().influence = 100.0;
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        perform_recon_pulse(&mut state, FactionId::Axiom, &id, &mut rng).unwrap();
        let axiom = state.faction(FactionId::Axiom).unwrap();
        assert!(axiom.has_active_pulse(1));
        assert!(!axiom.has_active_pulse(2));
    }

    #[test]
    fn test_disconnected_array_rejected() {
        let (mut state, id) = game_with_array();
        for cut in ["CN-W", "WSH", "WMP", "WG"] {
            state.node_mut(&NodeId::from(cut)).unwrap().owner = FactionId::Neutral;
        }
        let result = activate_recon_array(&mut state, FactionId::Axiom, &id);
        assert!(matches!(result, Err(ActionRejection::Disconnected(_))));
        assert_eq!(state.faction(FactionId::Axiom).unwrap().materiel, 650.0);
    }

    #[test]
    fn test_lost_array_drops_out() {
        let (mut state, id) = game_with_array();
        activate_recon_array(&mut state, FactionId::Axiom, &id).unwrap();
        state.node_mut(&id).unwrap().owner = FactionId::GemQ;
        let nodes = state.map_nodes.clone();
        let axiom = state.faction_mut(FactionId::Axiom).unwrap();
        refresh_recon_capability(&nodes, axiom);
        assert!(axiom.activated_recon_node_ids.is_empty());
        assert!(!axiom.is_recon_system_active);
    }

    #[test]
    fn test_pulse_expiry() {
        let (mut state, _) = game_with_array();
        state.faction_mut(FactionId::Axiom).unwrap().recon_pulse_expires_after_turn = Some(1);
        expire_pulses(&mut state, 2);
        assert_eq!(state.faction(FactionId::Axiom).unwrap().recon_pulse_expires_after_turn, None);
    }
}
