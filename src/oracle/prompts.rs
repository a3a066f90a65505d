//! Prompt text for the LLM oracle

use std::fmt::Write;

use crate::core::types::{FactionId, Phase};
use crate::doctrine::DoctrineDefinition;
use crate::visibility::IntelSnapshot;

pub const PLAN_SYSTEM_PROMPT: &str = r#"You are the strategic command AI of a faction in a turn-based attrition wargame.
Factions fight over a graph of territory nodes. Materiel (MAT) pays for units, fortifications,
artillery and covert operations; influence (QR) grows with the size of your largest connected network.
Losing every command node (CN) loses the war.

Produce an operational plan for the coming turn.

OUTPUT FORMAT (JSON only):
{
  "objective": "one sentence",
  "operation": "short operation name",
  "tasks": ["task", "..."],
  "priority": "ECONOMIC|MILITARY_OFFENSE|MILITARY_DEFENSE|TERRITORIAL_EXPANSION|INTELLIGENCE_GATHERING",
  "targetNodeIds": ["node id", "..."]
}"#;

pub const ACTION_SYSTEM_PROMPT: &str = r#"You issue exactly one order per turn for your faction in a turn-based attrition wargame.

ORDERS (type and params):
- DEPLOY_UNITS {nodeId, unitsToDeploy}          new units at an owned CN, 15 MAT each, max 10
- MOVE_UNITS {nodeId, targetNodeId, unitsToMove}   to an adjacent node, leaving at least one unit behind; into enemy ground it becomes an attack
- REINFORCE_NODE {nodeId, targetNodeId, unitsToMove}   to an adjacent friendly node
- ATTACK_NODE {nodeId, targetNodeId, unitsToMove}  resolved in the Combat phase
- CONSOLIDATE_FORCES {nodeId}                   pull units from owned neighbours
- BUILD_FORTIFICATIONS {nodeId}                 repair damage first, else +1 level for 25 MAT
- PURCHASE_ARTILLERY {nodeId, quantity}         at an INDUSTRIAL_HUB or FORTRESS, 30 QR + 100 MAT each
- MOVE_ARTILLERY {nodeId, targetNodeId, artilleryToMove}
- ARTILLERY_STRIKE {nodeId, targetNodeId, artilleryToFire}
- TRAIN_INFILTRATOR {nodeId, targetNodeId}      from an owned CN into enemy or neutral ground
- SABOTAGE_MATERIEL {nodeId}                    where you have an infiltrator
- ACTIVATE_RECON_ARRAY {nodeId}
- PERFORM_RECON_PULSE {nodeId}
- TRAIN_VETERANS {nodeId, quantity}             at an owned FORTRESS
- ECONOMIC_FOCUS {}
- HOLD_POSITION {}

OUTPUT FORMAT (JSON only):
{"type": "ORDER_TYPE", "params": {...}, "reasoning": "one sentence"}"#;

pub const DOCTRINE_SYSTEM_PROMPT: &str = r#"You choose a military doctrine for your faction. Each doctrine is a permanent
bundle of buffs and nerfs. Pick the one that best fits your situation.

OUTPUT FORMAT (JSON only):
{"doctrineId": "id of the chosen doctrine"}"#;

pub const COMMUNIQUE_SYSTEM_PROMPT: &str = r#"You write a one or two sentence strategic communique from your faction's
high command, in character, for the shared communications log.

OUTPUT FORMAT (JSON only):
{"message": "text"}"#;

/// Compact board summary for one faction
pub fn situation(intel: &IntelSnapshot) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "You are {}. Turn {}, phase {:?}. Pools: {:.0} QR, {:.0} MAT.",
        intel.viewer, intel.turn, intel.phase, intel.influence, intel.materiel
    );
    if let Some(enemy) = &intel.enemy_resources {
        let _ = writeln!(out, "{} pools: {:.0} QR, {:.0} MAT.", enemy.faction, enemy.influence, enemy.materiel);
    }
    if let Some(plan) = &intel.current_plan {
        let _ = writeln!(out, "Current plan: {} ({})", plan.objective, plan.operation);
    }

    let _ = writeln!(out, "\nNODES (id | type | owner | units std/vet | fort | guns | links):");
    for node in intel.nodes.iter().filter(|n| n.visible) {
        let owner = node.owner.map_or("?", FactionId::as_str);
        let _ = writeln!(
            out,
            "{} | {:?} | {} | {}/{} | {} | {} | {}",
            node.id,
            node.node_type,
            owner,
            node.standard_units.unwrap_or(0),
            node.veteran_units.unwrap_or(0),
            node.fortification_level.unwrap_or(0),
            node.artillery.unwrap_or(0),
            node.connections.iter().map(|c| c.as_str()).collect::<Vec<_>>().join(",")
        );
    }
    let hidden = intel.nodes.iter().filter(|n| !n.visible).count();
    if hidden > 0 {
        let _ = writeln!(out, "({} nodes hidden by fog of war)", hidden);
    }
    out
}

pub fn action_prompt(intel: &IntelSnapshot, phase: Phase) -> String {
    let scope = match phase {
        Phase::FortifyAxiom | Phase::FortifyGemq => "Fortify phase: only BUILD_FORTIFICATIONS or HOLD_POSITION is accepted.",
        _ => "Maneuver phase: choose your single order for this turn.",
    };
    format!("{}\n{}\nYour order as JSON:", situation(intel), scope)
}

pub fn doctrine_prompt(faction: FactionId, offered: &[DoctrineDefinition]) -> String {
    let mut out = format!("You are {}. Offered doctrines:\n", faction);
    for doctrine in offered {
        let _ = writeln!(
            out,
            "- {} \"{}\" ({:?}, {:?}): {} buffs, {} nerfs",
            doctrine.id,
            doctrine.name,
            doctrine.theme,
            doctrine.tier,
            doctrine.buffs.len(),
            doctrine.nerfs.len()
        );
    }
    out.push_str("Your choice as JSON:");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::EngineConfig;
    use crate::map::MapType;
    use crate::state::GameState;
    use crate::visibility::intel_snapshot;

    #[test]
    fn test_situation_lists_only_visible_nodes() {
        let state = GameState::new(MapType::VolgogradCauldron, EngineConfig::default());
        let text = situation(&intel_snapshot(&state, FactionId::Axiom));
        assert!(text.starts_with("You are AXIOM. Turn 1"));
        assert!(text.contains("CN-W | Cn | AXIOM | 25/0"));
        assert!(!text.contains("CN-E |"));
        assert!(text.contains("hidden by fog of war"));
    }

    #[test]
    fn test_fortify_prompt_scope() {
        let state = GameState::new(MapType::ClassicLattice, EngineConfig::default());
        let text = action_prompt(&intel_snapshot(&state, FactionId::GemQ), Phase::FortifyGemq);
        assert!(text.contains("only BUILD_FORTIFICATIONS"));
    }
}
