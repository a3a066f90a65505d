//! Rule-based oracle for offline play
//!
//! Looks only at its own intel snapshot. Attacks the softest visible
//! neighbour it clearly outnumbers, otherwise deploys at a command node, and
//! in Fortify phases digs in on the least fortified border node.

use super::PlanningOracle;
use crate::actions::Action;
use crate::core::constants::{FORT_UPGRADE_COST, MAX_DEPLOY_PER_ACTION, MAX_FORTIFICATION_LEVEL, UNIT_DEPLOY_COST};
use crate::core::error::{GridError, Result};
use crate::core::types::{FactionId, NodeId, NodeType, Phase};
use crate::doctrine::DoctrineDefinition;
use crate::state::{Plan, PlanPriority};
use crate::visibility::{IntelSnapshot, NodeIntel};

/// MAT kept back for upkeep before spending on anything else
const MATERIEL_RESERVE: f64 = 60.0;
/// Required ratio of attacking units to defender strength
const ATTACK_ODDS: u32 = 2;

#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicOracle;

/// Rough defensive weight of a visible node
fn defender_strength(node: &NodeIntel) -> u32 {
    let standard = node.standard_units.unwrap_or(0);
    let veteran = node.veteran_units.unwrap_or(0);
    let fort = node.fortification_level.unwrap_or(0);
    standard + veteran * 2 + fort * 2
}

struct Strike<'a> {
    from: &'a NodeIntel,
    target: &'a NodeIntel,
    units: u32,
}

fn best_strike(intel: &IntelSnapshot) -> Option<Strike<'_>> {
    let mut best: Option<(u32, Strike<'_>)> = None;
    for from in intel.nodes_owned_by(intel.viewer) {
        let available = from.standard_units.unwrap_or(0).saturating_sub(1);
        if available == 0 {
            continue;
        }
        for target_id in &from.connections {
            let Some(target) = intel.node(target_id) else {
                continue;
            };
            if !target.visible || target.owner == Some(intel.viewer) {
                continue;
            }
            let strength = defender_strength(target);
            let units = available.min(target.max_units);
            if units < strength * ATTACK_ODDS + 2 {
                continue;
            }
            // Enemy command nodes first, then the weakest defence
            let score = strength + if target.node_type == NodeType::Cn { 0 } else { 1000 };
            if best.as_ref().map_or(true, |(s, _)| score < *s) {
                best = Some((score, Strike { from, target, units }));
            }
        }
    }
    best.map(|(_, strike)| strike)
}

fn best_deployment(intel: &IntelSnapshot) -> Option<(NodeId, u32)> {
    let affordable = ((intel.materiel - MATERIEL_RESERVE) / UNIT_DEPLOY_COST).floor();
    if affordable < 1.0 {
        return None;
    }
    intel
        .nodes_owned_by(intel.viewer)
        .filter(|n| n.node_type == NodeType::Cn)
        .map(|n| {
            let held = n.standard_units.unwrap_or(0) + n.veteran_units.unwrap_or(0);
            (n, n.max_units.saturating_sub(held))
        })
        .filter(|(_, free)| *free > 0)
        .max_by_key(|(_, free)| *free)
        .map(|(n, free)| {
            let quantity = free.min(MAX_DEPLOY_PER_ACTION).min(affordable as u32);
            (n.id.clone(), quantity)
        })
}

fn borders_enemy(intel: &IntelSnapshot, node: &NodeIntel, enemy: Option<FactionId>) -> bool {
    node.connections
        .iter()
        .filter_map(|id| intel.node(id))
        .any(|n| enemy.is_some() && n.owner == enemy)
}

fn fortify_target(intel: &IntelSnapshot) -> Option<NodeId> {
    if intel.materiel < FORT_UPGRADE_COST + MATERIEL_RESERVE {
        return None;
    }
    let enemy = intel.viewer.opponent();
    intel
        .nodes_owned_by(intel.viewer)
        .filter(|n| n.fortification_level.unwrap_or(0) < MAX_FORTIFICATION_LEVEL)
        .filter(|n| borders_enemy(intel, n, enemy))
        .min_by_key(|n| n.fortification_level.unwrap_or(0))
        .map(|n| n.id.clone())
}

impl PlanningOracle for HeuristicOracle {
    async fn plan(&mut self, intel: &IntelSnapshot) -> Result<Plan> {
        let mut plan = Plan::fallback(intel.turn);
        if let Some(strike) = best_strike(intel) {
            plan.objective = format!("Seize {}", strike.target.name);
            plan.operation = "Forward Pressure".to_string();
            plan.tasks = vec![format!("attack from {} with {} units", strike.from.id, strike.units)];
            plan.priority = Some(PlanPriority::MilitaryOffense);
            plan.target_node_ids = vec![strike.target.id.clone()];
        } else if let Some((node_id, _)) = best_deployment(intel) {
            plan.objective = "Build up reserves at the command node".to_string();
            plan.operation = "Muster".to_string();
            plan.tasks = vec![format!("deploy at {}", node_id)];
            plan.priority = Some(PlanPriority::MilitaryDefense);
            plan.target_node_ids = vec![node_id];
        } else {
            plan.priority = Some(PlanPriority::Economic);
        }
        Ok(plan)
    }

    async fn choose_action(&mut self, intel: &IntelSnapshot, phase: Phase) -> Result<Action> {
        if matches!(phase, Phase::FortifyAxiom | Phase::FortifyGemq) {
            return Ok(match fortify_target(intel) {
                Some(node_id) => Action::BuildFortifications { node_id },
                None => Action::HoldPosition,
            });
        }
        if let Some(strike) = best_strike(intel) {
            return Ok(Action::AttackNode {
                node_id: strike.from.id.clone(),
                target_node_id: strike.target.id.clone(),
                units: strike.units,
            });
        }
        if let Some((node_id, quantity)) = best_deployment(intel) {
            return Ok(Action::DeployUnits { node_id, quantity });
        }
        Ok(Action::EconomicFocus)
    }

    /// Cheapest affordable doctrine, first offered on ties
    async fn choose_doctrine(&mut self, intel: &IntelSnapshot, offered: &[DoctrineDefinition]) -> Result<String> {
        offered
            .iter()
            .filter(|d| d.tier.influence_cost() <= intel.influence)
            .min_by(|a, b| a.tier.influence_cost().total_cmp(&b.tier.influence_cost()))
            .or_else(|| offered.first())
            .map(|d| d.id.clone())
            .ok_or_else(|| GridError::OracleError("no doctrines offered".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::EngineConfig;
    use crate::map::MapType;
    use crate::state::GameState;
    use crate::visibility::intel_snapshot;

    fn volgograd() -> GameState {
        GameState::new(MapType::VolgogradCauldron, EngineConfig::default())
    }

    #[tokio::test]
    async fn test_attacks_only_with_clear_odds() {
        let mut state = volgograd();
        let mut oracle = HeuristicOracle;
        let target = state.node(&NodeId::from("CN-W")).unwrap().connections[0].clone();
        {
            let node = state.node_mut(&target).unwrap();
            node.owner = FactionId::Neutral;
            node.standard_units = 2;
            node.veteran_units = 0;
            node.set_fortification_level(0);
        }
        let intel = intel_snapshot(&state, FactionId::Axiom);
        let action = oracle.choose_action(&intel, Phase::ManeuverAxiom).await.unwrap();
        assert!(matches!(action, Action::AttackNode { .. }), "{:?}", action);
        let plan = oracle.plan(&intel).await.unwrap();
        assert_eq!(plan.priority, Some(PlanPriority::MilitaryOffense));
    }

    #[tokio::test]
    async fn test_deploys_when_no_target() {
        let mut state = volgograd();
        for node in state.map_nodes.values_mut() {
            if node.owner != FactionId::Axiom {
                node.standard_units = 500;
            }
        }
        let cn = state.node_mut(&NodeId::from("CN-W")).unwrap();
        cn.standard_units = 5;
        let intel = intel_snapshot(&state, FactionId::Axiom);
        let action = HeuristicOracle.choose_action(&intel, Phase::ManeuverAxiom).await.unwrap();
        assert!(
            matches!(action, Action::DeployUnits { ref node_id, quantity } if node_id.as_str() == "CN-W" && quantity == MAX_DEPLOY_PER_ACTION),
            "{:?}",
            action
        );
    }

    #[tokio::test]
    async fn test_broke_faction_focuses_economy() {
        let mut state = volgograd();
        state.faction_mut(FactionId::GemQ).unwrap().materiel = 10.0;
        for node in state.map_nodes.values_mut() {
            if node.owner != FactionId::GemQ {
                node.standard_units = 500;
            }
        }
        let intel = intel_snapshot(&state, FactionId::GemQ);
        let mut oracle = HeuristicOracle;
        assert_eq!(
            oracle.choose_action(&intel, Phase::ManeuverGemq).await.unwrap(),
            Action::EconomicFocus
        );
        assert_eq!(
            oracle.choose_action(&intel, Phase::FortifyGemq).await.unwrap(),
            Action::HoldPosition
        );
    }
}
