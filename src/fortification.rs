//! Fortification orders: repair before upgrade
//!
//! A damaged work is always repaired first, as far as materiel allows. Only a
//! work at full HP can be raised a level, and the new level starts full.

use tracing::debug;

use crate::actions::apply::ActionRejection;
use crate::actions::costs::{fort_repair_cost_per_hp, fort_upgrade_cost};
use crate::core::constants::MAX_FORTIFICATION_LEVEL;
use crate::core::types::{FactionId, NodeId};
use crate::events::{ActivityKind, GameEvent, LogKind};
use crate::state::GameState;

/// What a fortify order turned into
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FortifyOutcome {
    Repaired { hp: u32, cost: f64 },
    Upgraded { level: u32, cost: f64 },
}

/// Decide repair or upgrade for a node without touching state
pub fn plan_fortify(state: &GameState, faction: FactionId, node_id: &NodeId) -> Result<FortifyOutcome, ActionRejection> {
    let node = state
        .node(node_id)
        .ok_or_else(|| ActionRejection::UnknownNode(node_id.clone()))?;
    let owner = state
        .faction(faction)
        .ok_or(ActionRejection::UnknownFaction(faction))?;

    let neutral_outpost = node.owner == FactionId::Neutral
        && owner.modifiers.can_fortify_adjacent_neutral
        && node
            .connections
            .iter()
            .filter_map(|id| state.node(id))
            .any(|n| n.owner == faction);
    if node.owner != faction && !neutral_outpost {
        return Err(ActionRejection::NotOwned(node_id.clone()));
    }

    if node.fortification_hp < node.max_fortification_hp {
        let missing = node.max_fortification_hp - node.fortification_hp;
        let per_hp = fort_repair_cost_per_hp(&owner.modifiers);
        let hp = if per_hp <= 0.0 {
            missing
        } else {
            ((owner.materiel.max(0.0) / per_hp).floor() as u32).min(missing)
        };
        if hp == 0 {
            return Err(ActionRejection::InsufficientMateriel {
                need: per_hp,
                have: owner.materiel,
            });
        }
        return Ok(FortifyOutcome::Repaired {
            hp,
            cost: hp as f64 * per_hp,
        });
    }

    if node.fortification_level >= MAX_FORTIFICATION_LEVEL {
        return Err(ActionRejection::FortificationMaxed(node_id.clone()));
    }
    let cost = fort_upgrade_cost(&owner.modifiers);
    if owner.materiel < cost {
        return Err(ActionRejection::InsufficientMateriel {
            need: cost,
            have: owner.materiel,
        });
    }
    Ok(FortifyOutcome::Upgraded {
        level: node.fortification_level + 1,
        cost,
    })
}

/// Apply a BUILD_FORTIFICATIONS order
pub fn fortify(state: &mut GameState, faction: FactionId, node_id: &NodeId) -> Result<Vec<GameEvent>, ActionRejection> {
    let outcome = plan_fortify(state, faction, node_id)?;
    let mut events = Vec::new();

    let (Some(node), Some(owner)) = (state.map_nodes.get_mut(node_id), state.factions.get_mut(&faction)) else {
        return Err(ActionRejection::UnknownNode(node_id.clone()));
    };

    match outcome {
        FortifyOutcome::Repaired { hp, cost } => {
            owner.spend(0.0, cost);
            owner.stats.mat_spent_on_fort_repair += cost;
            node.fortification_hp += hp;
            debug!(node = %node_id, hp, cost, "Fortification repaired");
            events.push(GameEvent::log(
                LogKind::Fortification,
                Some(faction),
                format!(
                    "Repaired {} HP at {} ({}/{}) for {:.1} MAT",
                    hp, node.name, node.fortification_hp, node.max_fortification_hp, cost
                ),
            ));
            events.push(GameEvent::activity(
                node_id,
                ActivityKind::FortRepair,
                Some(faction),
                format!("Fortifications repaired by {} HP", hp),
            ));
        }
        FortifyOutcome::Upgraded { level, cost } => {
            owner.spend(0.0, cost);
            owner.stats.mat_spent_on_fortifications += cost;
            node.set_fortification_level(level);
            debug!(node = %node_id, level, "Fortification upgraded");
            events.push(GameEvent::log(
                LogKind::Fortification,
                Some(faction),
                format!("Fortified {} to level {} for {:.0} MAT", node.name, level, cost),
            ));
            events.push(GameEvent::activity(
                node_id,
                ActivityKind::Fortify,
                Some(faction),
                format!("Fortifications raised to level {}", level),
            ));
        }
    }
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::EngineConfig;
    use crate::map::MapType;

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
    fn test_upgrade_at_full_hp() {
        let mut state = game();
        let id = NodeId::from("CN-W");
        fortify(&mut state, FactionId::Axiom, &id).unwrap();
        let node = state.node(&id).unwrap();
        assert_eq!(node.fortification_level, 2);
        assert_eq!(node.fortification_hp, 200);
        assert_eq!(state.faction(FactionId::Axiom).unwrap().materiel, 625.0);
    }

    #[test]
    fn test_partial_repair_when_short() {
        let mut state = game();
        let id = NodeId::from("CN-W");
        state.node_mut(&id).unwrap().fortification_hp = 20;
        state.faction_mut(FactionId::Axiom).unwrap().materiel = 5.0;
        let outcome = plan_fortify(&state, FactionId::Axiom, &id).unwrap();
        assert_eq!(outcome, FortifyOutcome::Repaired { hp: 20, cost: 5.0 });
        fortify(&mut state, FactionId::Axiom, &id).unwrap();
        assert_eq!(state.node(&id).unwrap().fortification_hp, 40);
        assert_eq!(state.faction(FactionId::Axiom).unwrap().materiel, 0.0);
    }

    #[test]
    fn test_enemy_node_rejected() {
        let mut state = game();
        let result = fortify(&mut state, FactionId::Axiom, &NodeId::from("CN-E"));
        assert!(matches!(result, Err(ActionRejection::NotOwned(_))));
    }

    #[test]
    fn test_max_level_rejected() {
        let mut state = game();
        let id = NodeId::from("CN-W");
        state.node_mut(&id).unwrap().set_fortification_level(MAX_FORTIFICATION_LEVEL);
        let result = fortify(&mut state, FactionId::Axiom, &id);
        assert!(matches!(result, Err(ActionRejection::FortificationMaxed(_))));
    }
}
