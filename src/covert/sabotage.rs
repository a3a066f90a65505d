//! Infiltrators and sabotage
//!
//! Every sabotage attempt, whatever the dice say, produces exactly one system
//! log entry and one node activity entry.

use rand::Rng;
use tracing::{debug, info};

use crate::actions::apply::ActionRejection;
use crate::actions::costs::infiltrator_cost;
use crate::core::constants::{
    INTERDICTED_OUTPUT_FACTOR, MAX_ALARM_LEVEL, MAX_INFILTRATORS_PER_FACTION_PER_NODE, SABOTAGE_DETECTION_CHANCE,
    SABOTAGE_FORT_DESTRUCTION_CHANCE, SABOTAGE_INTERDICTION_TURNS, SABOTAGE_MATERIEL_DRAIN, SABOTAGE_SUCCESS_CHANCE,
    SUPPRESSION_SABOTAGE_PENALTY,
};
use crate::core::types::{FactionId, NodeId, NodeType};
use crate::covert::recon::refresh_recon_capability;
use crate::events::{ActivityKind, GameEvent, LogKind};
use crate::state::GameState;

/// Apply a TRAIN_INFILTRATOR order
///
/// The agent is raised at one of the faction's command nodes and slipped
/// into a node the faction does not hold.
pub fn train_infiltrator(
    state: &mut GameState,
    faction: FactionId,
    base_id: &NodeId,
    target_id: &NodeId,
) -> Result<Vec<GameEvent>, ActionRejection> {
    let owner = state
        .faction(faction)
        .ok_or(ActionRejection::UnknownFaction(faction))?;
    if owner.modifiers.disable_new_infiltrators {
        return Err(ActionRejection::InfiltratorsDisabled);
    }
    let base = state
        .node(base_id)
        .ok_or_else(|| ActionRejection::UnknownNode(base_id.clone()))?;
    if base.owner != faction {
        return Err(ActionRejection::NotOwned(base_id.clone()));
    }
    if !base.is_command_node() {
        return Err(ActionRejection::WrongNodeType {
            node: base_id.clone(),
            expected: "CN",
        });
    }
    let target = state
        .node(target_id)
        .ok_or_else(|| ActionRejection::UnknownNode(target_id.clone()))?;
    if target.owner == faction {
        return Err(ActionRejection::FriendlyTarget(target_id.clone()));
    }
    if target.infiltrators_of(faction) >= MAX_INFILTRATORS_PER_FACTION_PER_NODE {
        return Err(ActionRejection::InfiltratorCap(target_id.clone()));
    }
    let cost = infiltrator_cost(&owner.modifiers);
    if owner.materiel < cost {
        return Err(ActionRejection::InsufficientMateriel {
            need: cost,
            have: owner.materiel,
        });
    }
    let target_name = target.name.clone();

    if let Some(owner) = state.factions.get_mut(&faction) {
        owner.spend(0.0, cost);
        owner.stats.mat_spent_on_infiltrators += cost;
    }
    if let Some(target) = state.map_nodes.get_mut(target_id) {
        *target.infiltrators.entry(faction).or_insert(0) += 1;
    }
    debug!(%faction, target = %target_id, "Infiltrator placed");

    Ok(vec![
        GameEvent::log(
            LogKind::Infiltration,
            Some(faction),
            format!("Infiltrator inserted into {}", target_name),
        ),
        GameEvent::activity(
            target_id,
            ActivityKind::InfiltratorDeployed,
            Some(faction),
            "Covert operative in place",
        ),
    ])
}

/// Apply a SABOTAGE_MATERIEL order against the node hosting our infiltrator
pub fn sabotage(
    state: &mut GameState,
    faction: FactionId,
    node_id: &NodeId,
    rng: &mut impl Rng,
) -> Result<Vec<GameEvent>, ActionRejection> {
    let saboteur = state
        .faction(faction)
        .ok_or(ActionRejection::UnknownFaction(faction))?;
    let node = state
        .node(node_id)
        .ok_or_else(|| ActionRejection::UnknownNode(node_id.clone()))?;
    if node.owner == faction {
        return Err(ActionRejection::FriendlyTarget(node_id.clone()));
    }
    if node.infiltrators_of(faction) == 0 {
        return Err(ActionRejection::NoInfiltrator(node_id.clone()));
    }

    let victim = node.owner;
    let node_type = node.node_type;
    let name = node.name.clone();
    let hits_stockpile = saboteur.modifiers.sabotage_targets_global_stockpile;
    let success_chance = (SABOTAGE_SUCCESS_CHANCE + saboteur.modifiers.infiltrator_effectiveness_modifier / 100.0
        - node.suppression as f64 * SUPPRESSION_SABOTAGE_PENALTY)
        .clamp(0.0, 1.0);
    let detection_chance = (SABOTAGE_DETECTION_CHANCE
        + state
            .faction(victim)
            .map(|f| f.modifiers.infiltrator_detection_modifier / 100.0)
            .unwrap_or(0.0))
    .clamp(0.0, 1.0);

    if let Some(f) = state.factions.get_mut(&faction) {
        f.stats.total_sabotage_attempts += 1;
    }
    if let Some(n) = state.map_nodes.get_mut(node_id) {
        n.alarm_level = (n.alarm_level + 1).min(MAX_ALARM_LEVEL);
    }

    if !rng.gen_bool(success_chance) {
        let detected = rng.gen_bool(detection_chance);
        let mut message = format!("Sabotage at {} failed", name);
        let kind = if detected {
            if let Some(n) = state.map_nodes.get_mut(node_id) {
                n.infiltrators.remove(&faction);
            }
            if let Some(f) = state.factions.get_mut(&faction) {
                f.stats.infiltrators_lost += 1;
            }
            message.push_str("; the operative was detected and eliminated");
            ActivityKind::InfiltratorDetected
        } else {
            ActivityKind::SabotageFailure
        };
        debug!(%faction, node = %node_id, detected, "Sabotage failed");
        return Ok(vec![
            GameEvent::log(LogKind::Infiltration, Some(faction), message.clone()),
            GameEvent::activity(node_id, kind, Some(faction), message),
        ]);
    }

    if let Some(f) = state.factions.get_mut(&faction) {
        f.stats.successful_sabotage_attempts += 1;
    }

    let detail = match node_type {
        NodeType::IndustrialHub => {
            let drained = drain_stockpile(state, faction, victim);
            interdict(state, node_id);
            format!(
                "drained {:.0} MAT and cut output to {:.0}% for {} turns",
                drained,
                INTERDICTED_OUTPUT_FACTOR * 100.0,
                SABOTAGE_INTERDICTION_TURNS
            )
        }
        NodeType::ReconArray => {
            if let Some(f) = state.factions.get_mut(&victim) {
                f.activated_recon_node_ids.remove(node_id);
                refresh_recon_capability(&state.map_nodes, f);
            }
            interdict(state, node_id);
            "knocked the recon array offline".to_string()
        }
        NodeType::Fortress | NodeType::Cn => {
            interdict(state, node_id);
            let mut detail = "disrupted the garrison's supply".to_string();
            if rng.gen_bool(SABOTAGE_FORT_DESTRUCTION_CHANCE) {
                if let Some(n) = state.map_nodes.get_mut(node_id) {
                    if n.fortification_level > 0 {
                        n.destroy_fortification_level();
                        detail = format!("destroyed a fortification level (now {})", n.fortification_level);
                    }
                }
            }
            detail
        }
        _ => {
            interdict(state, node_id);
            "interdicted local production".to_string()
        }
    };
    let detail = if hits_stockpile && node_type != NodeType::IndustrialHub {
        let drained = drain_stockpile(state, faction, victim);
        format!("{}; drained {:.0} MAT from the {} stockpile", detail, drained, victim)
    } else {
        detail
    };

    info!(%faction, node = %node_id, %victim, "Sabotage succeeded");
    let message = format!("Sabotage at {} {}", name, detail);
    Ok(vec![
        GameEvent::log(LogKind::Infiltration, Some(faction), message.clone()),
        GameEvent::activity(node_id, ActivityKind::SabotageSuccess, Some(faction), message),
    ])
}

/// Take up to [`SABOTAGE_MATERIEL_DRAIN`] from the victim's pool
fn drain_stockpile(state: &mut GameState, saboteur: FactionId, victim: FactionId) -> f64 {
    let drained = state
        .factions
        .get_mut(&victim)
        .map(|f| {
            let drained = SABOTAGE_MATERIEL_DRAIN.min(f.materiel.max(0.0));
            f.materiel -= drained;
            drained
        })
        .unwrap_or(0.0);
    if let Some(f) = state.factions.get_mut(&saboteur) {
        f.stats.enemy_mat_drained_by_sabotage += drained;
    }
    drained
}

fn interdict(state: &mut GameState, node_id: &NodeId) {
    if let Some(n) = state.map_nodes.get_mut(node_id) {
        n.interdicted_turns = n.interdicted_turns.max(SABOTAGE_INTERDICTION_TURNS);
    }
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

    #[test]
    fn test_train_places_one_agent() {
        let mut state = game();
        let target = NodeId::from("ESH");
        train_infiltrator(&mut state, FactionId::Axiom, &NodeId::from("CN-W"), &target).unwrap();
        assert_eq!(state.node(&target).unwrap().infiltrators_of(FactionId::Axiom), 1);
        assert_eq!(state.faction(FactionId::Axiom).unwrap().materiel, 575.0);

        let again = train_infiltrator(&mut state, FactionId::Axiom, &NodeId::from("CN-W"), &target);
        assert!(matches!(again, Err(ActionRejection::InfiltratorCap(_))));
    }

    #[test]
    fn test_sabotage_needs_agent() {
        let mut state = game();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let result = sabotage(&mut state, FactionId::Axiom, &NodeId::from("ESH"), &mut rng);
        assert!(matches!(result, Err(ActionRejection::NoInfiltrator(_))));
    }

    #[test]
    fn test_sabotage_always_one_log_one_activity() {
        for seed in 0..40 {
            let mut state = game();
            let target = NodeId::from("ESH");
            state.node_mut(&target).unwrap().infiltrators.insert(FactionId::Axiom, 1);
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let events = sabotage(&mut state, FactionId::Axiom, &target, &mut rng).unwrap();
            let logs = events.iter().filter(|e| matches!(e, GameEvent::Log { .. })).count();
            let activity = events.iter().filter(|e| matches!(e, GameEvent::NodeActivity { .. })).count();
            assert_eq!((logs, activity), (1, 1), "seed {}", seed);
        }
    }

    #[test]
    fn test_certain_success_drains_hub() {
        let mut state = game();
        let target = NodeId::from("ESH");
        state.node_mut(&target).unwrap().infiltrators.insert(FactionId::Axiom, 1);
        state.faction_mut(FactionId::Axiom).unwrap().modifiers.infiltrator_effectiveness_modifier = 100.0;
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        sabotage(&mut state, FactionId::Axiom, &target, &mut rng).unwrap();
        assert_eq!(state.faction(FactionId::GemQ).unwrap().materiel, 575.0);
        assert_eq!(state.node(&target).unwrap().interdicted_turns, SABOTAGE_INTERDICTION_TURNS);
        assert_eq!(state.faction(FactionId::Axiom).unwrap().stats.successful_sabotage_attempts, 1);
    }
}
