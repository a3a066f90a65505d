//! Fog of war and intel snapshots
//!
//! A faction sees a node if fog is off, if it holds the node or a neighbour,
//! or if one of its recon pulses covers the current turn. Everything else is
//! shown with owner and garrison redacted. A holder with a decoy doctrine
//! keeps its garrison hidden from pulses. Snapshots are what the planning
//! oracle gets to reason over.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::core::types::{FactionId, NodeId, NodeType, Phase};
use crate::state::{GameState, Node, Plan};

/// True if `viewer` can currently see `node`
pub fn is_node_visible(state: &GameState, viewer: FactionId, node: &Node) -> bool {
    if !state.settings.fog_of_war || in_direct_sight(state, viewer, node) {
        return true;
    }
    state.faction(viewer).is_some_and(|f| f.has_active_pulse(state.turn))
}

fn in_direct_sight(state: &GameState, viewer: FactionId, node: &Node) -> bool {
    if node.owner == viewer {
        return true;
    }
    node.connections
        .iter()
        .filter_map(|id| state.node(id))
        .any(|n| n.owner == viewer)
}

/// True if a pulse is the only thing showing `node` and its holder jams pulses
///
/// Such a node reports its owner but nothing about what stands in it.
pub fn is_pulse_decoyed(state: &GameState, viewer: FactionId, node: &Node) -> bool {
    state.settings.fog_of_war
        && !in_direct_sight(state, viewer, node)
        && state.faction(viewer).is_some_and(|f| f.has_active_pulse(state.turn))
        && state.faction(node.owner).is_some_and(|f| f.modifiers.decoy_recon_pulse)
}

/// What one faction knows about a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeIntel {
    pub id: NodeId,
    pub name: String,
    pub node_type: NodeType,
    pub max_units: u32,
    pub visible: bool,
    pub owner: Option<FactionId>,
    pub standard_units: Option<u32>,
    pub veteran_units: Option<u32>,
    pub fortification_level: Option<u32>,
    pub artillery: Option<u32>,
    pub connections: Vec<NodeId>,
}

impl NodeIntel {
    fn observe(node: &Node, visible: bool, decoyed: bool) -> Self {
        let seen = |value: u32| (visible && !decoyed).then_some(value);
        Self {
            id: node.id.clone(),
            name: node.name.clone(),
            node_type: node.node_type,
            max_units: node.max_units,
            visible,
            owner: visible.then_some(node.owner),
            standard_units: seen(node.standard_units),
            veteran_units: seen(node.veteran_units),
            fortification_level: seen(node.fortification_level),
            artillery: seen(node.artillery),
            connections: node.connections.clone(),
        }
    }
}

/// Enemy pools, when a doctrine or pulse reveals them
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnemyResources {
    pub faction: FactionId,
    pub influence: f64,
    pub materiel: f64,
}

/// The board as one faction sees it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntelSnapshot {
    pub viewer: FactionId,
    pub turn: u32,
    pub phase: Phase,
    pub influence: f64,
    pub materiel: f64,
    pub current_plan: Option<Plan>,
    pub visible_node_ids: BTreeSet<NodeId>,
    pub nodes: Vec<NodeIntel>,
    pub enemy_resources: Option<EnemyResources>,
}

impl IntelSnapshot {
    pub fn node(&self, id: &NodeId) -> Option<&NodeIntel> {
        self.nodes.iter().find(|n| &n.id == id)
    }

    /// Visible nodes held by `owner`
    pub fn nodes_owned_by(&self, owner: FactionId) -> impl Iterator<Item = &NodeIntel> {
        self.nodes.iter().filter(move |n| n.owner == Some(owner))
    }
}

/// Build `viewer`'s snapshot of the current board
pub fn intel_snapshot(state: &GameState, viewer: FactionId) -> IntelSnapshot {
    let mut visible_node_ids = BTreeSet::new();
    let nodes = state
        .map_nodes
        .values()
        .map(|node| {
            let visible = is_node_visible(state, viewer, node);
            if visible {
                visible_node_ids.insert(node.id.clone());
            }
            NodeIntel::observe(node, visible, visible && is_pulse_decoyed(state, viewer, node))
        })
        .collect();

    let own = state.faction(viewer);
    let sees_enemy_pools =
        own.is_some_and(|f| f.modifiers.permanent_enemy_resource_visibility || f.has_active_pulse(state.turn));
    let enemy_resources = viewer
        .opponent()
        .and_then(|enemy| state.faction(enemy))
        .filter(|_| sees_enemy_pools)
        .map(|enemy| EnemyResources {
            faction: enemy.id,
            influence: enemy.influence,
            materiel: enemy.materiel,
        });

    IntelSnapshot {
        viewer,
        turn: state.turn,
        phase: state.current_phase,
        influence: own.map_or(0.0, |f| f.influence),
        materiel: own.map_or(0.0, |f| f.materiel),
        current_plan: own.and_then(|f| f.current_plan.clone()),
        visible_node_ids,
        nodes,
        enemy_resources,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::EngineConfig;
    use crate::map::MapType;

    #[test]
    fn test_fog_hides_distant_nodes() {
        let state = GameState::new(MapType::VolgogradCauldron, EngineConfig::default());
        let snapshot = intel_snapshot(&state, FactionId::Axiom);
        assert!(snapshot.visible_node_ids.contains(&NodeId::from("CN-W")));
        assert!(snapshot.visible_node_ids.contains(&NodeId::from("FBD")));
        assert!(!snapshot.visible_node_ids.contains(&NodeId::from("CN-E")));

        let hidden = snapshot.node(&NodeId::from("CN-E")).unwrap();
        assert_eq!(hidden.owner, None);
        assert_eq!(hidden.standard_units, None);
        assert!(snapshot.enemy_resources.is_none());
    }

    #[test]
    fn test_pulse_reveals_everything_this_turn() {
        let mut state = GameState::new(MapType::VolgogradCauldron, EngineConfig::default());
        state.faction_mut(FactionId::Axiom).unwrap().recon_pulse_expires_after_turn = Some(1);
        let snapshot = intel_snapshot(&state, FactionId::Axiom);
        assert_eq!(snapshot.visible_node_ids.len(), state.map_nodes.len());
        assert!(snapshot.enemy_resources.is_some());

        state.turn = 2;
        let next_turn = intel_snapshot(&state, FactionId::Axiom);
        assert!(!next_turn.visible_node_ids.contains(&NodeId::from("CN-E")));
    }

    #[test]
    fn test_decoy_masks_pulsed_garrison() {
        let mut state = GameState::new(MapType::VolgogradCauldron, EngineConfig::default());
        state.faction_mut(FactionId::Axiom).unwrap().recon_pulse_expires_after_turn = Some(1);
        state.faction_mut(FactionId::GemQ).unwrap().modifiers.decoy_recon_pulse = true;
        let snapshot = intel_snapshot(&state, FactionId::Axiom);

        let far = snapshot.node(&NodeId::from("CN-E")).unwrap();
        assert!(far.visible);
        assert_eq!(far.owner, Some(FactionId::GemQ));
        assert_eq!(far.standard_units, None);

        let own = snapshot.node(&NodeId::from("CN-W")).unwrap();
        assert!(own.standard_units.is_some());
    }

    #[test]
    fn test_no_fog_shows_all() {
        let state = GameState::new(
            MapType::ClassicLattice,
            EngineConfig {
                fog_of_war: false,
                ..Default::default()
            },
        );
        let snapshot = intel_snapshot(&state, FactionId::GemQ);
        assert!(snapshot.nodes.iter().all(|n| n.visible));
    }
}
