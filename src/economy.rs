//! Income and upkeep
//!
//! Materiel comes from owned nodes; influence comes from the size of the
//! faction's largest connected block. Both are settled once per Upkeep phase
//! and pools are left negative if upkeep outruns income.

use tracing::{debug, info};

use crate::core::constants::{
    INFLUENCE_PER_NODE_IN_LARGEST_NETWORK, INTERDICTED_OUTPUT_FACTOR, RECON_ARRAY_UPKEEP, UPKEEP_PER_FORT_LEVEL,
    UPKEEP_PER_STANDARD_UNIT, VETERAN_UPKEEP_MULTIPLIER,
};
use crate::core::types::{FactionId, ResourceKind};
use crate::doctrine::modifiers::apply_percentage;
use crate::events::{GameEvent, LogKind};
use crate::map::graph::{largest_component_size, supplied_nodes, NodeMap};
use crate::state::{Faction, GameState, Node};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Income {
    pub materiel: f64,
    pub influence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Upkeep {
    pub units: f64,
    pub fortifications: f64,
    pub recon: f64,
    pub infiltrators: f64,
}

impl Upkeep {
    pub fn total(&self) -> f64 {
        self.units + self.fortifications + self.recon + self.infiltrators
    }
}

/// Flag owned nodes that cannot trace a line back to a command node
pub fn mark_supply(nodes: &mut NodeMap) {
    let supplied: Vec<_> = FactionId::PLAYABLE
        .into_iter()
        .map(|faction| (faction, supplied_nodes(nodes, faction)))
        .collect();
    for node in nodes.values_mut() {
        node.low_supply = supplied
            .iter()
            .find(|(faction, _)| *faction == node.owner)
            .is_some_and(|(_, set)| !set.contains(&node.id));
    }
}

/// MAT a single node yields its owner this turn
fn node_materiel(node: &Node, faction: &Faction) -> f64 {
    let m = &faction.modifiers;
    if node.low_supply && !m.immune_to_low_supply_penalty {
        return 0.0;
    }
    let mut output = node.materiel_output;
    if node.interdicted_turns > 0 {
        output *= INTERDICTED_OUTPUT_FACTOR;
    }
    match m.mat_income_modifier_from_node_type.get(&node.node_type) {
        Some(&percent) => apply_percentage(output, percent),
        None => output,
    }
}

/// Gross income before upkeep
pub fn income(nodes: &NodeMap, faction: &Faction) -> Income {
    let m = &faction.modifiers;

    let node_output: f64 = nodes
        .values()
        .filter(|n| n.owner == faction.id)
        .map(|n| node_materiel(n, faction))
        .sum();
    let mut materiel = apply_percentage(node_output, m.percentage_mat_income_modifier) + m.flat_mat_income_bonus;

    let network = largest_component_size(nodes, faction.id) as f64;
    let mut influence = apply_percentage(network * INFLUENCE_PER_NODE_IN_LARGEST_NETWORK, m.percentage_qr_income_modifier)
        + m.flat_qr_income_bonus;

    if m.is_resource_disabled(ResourceKind::Materiel) {
        materiel = 0.0;
    }
    if m.is_resource_disabled(ResourceKind::Influence) {
        influence = 0.0;
    }
    Income {
        materiel: materiel.max(0.0),
        influence: influence.max(0.0),
    }
}

/// Per-turn upkeep bill
///
/// Units next to (or on) one of the faction's command nodes take the
/// adjacent-CN percentage on top of the general unit upkeep modifier; all
/// other units take the other-units percentage.
pub fn upkeep(nodes: &NodeMap, faction: &Faction) -> Upkeep {
    let m = &faction.modifiers;
    let mut bill = Upkeep::default();

    for node in nodes.values().filter(|n| n.owner == faction.id) {
        let near_command = node.is_command_node()
            || node
                .connections
                .iter()
                .filter_map(|id| nodes.get(id))
                .any(|n| n.owner == faction.id && n.is_command_node());
        let local = if near_command {
            m.unit_upkeep_adjacent_cn_modifier
        } else {
            m.unit_upkeep_other_units_modifier
        };
        let base = node.standard_units as f64 * UPKEEP_PER_STANDARD_UNIT
            + node.veteran_units as f64 * UPKEEP_PER_STANDARD_UNIT * VETERAN_UPKEEP_MULTIPLIER;
        bill.units += apply_percentage(base, m.unit_upkeep_percentage() + local);
        bill.fortifications += node.fortification_level as f64 * UPKEEP_PER_FORT_LEVEL;
    }

    bill.recon = apply_percentage(
        faction.activated_recon_node_ids.len() as f64 * RECON_ARRAY_UPKEEP,
        m.recon_array_upkeep_modifier,
    );
    let agents: u32 = nodes.values().map(|n| n.infiltrators_of(faction.id)).sum();
    bill.infiltrators = (agents as f64 * m.infiltrator_upkeep_modifier).max(0.0);
    bill
}

/// Settle income and upkeep for every faction
pub fn settle_upkeep(state: &mut GameState) -> Vec<GameEvent> {
    mark_supply(&mut state.map_nodes);
    let mut events = Vec::new();

    for faction in state.factions.values_mut() {
        let gross = income(&state.map_nodes, faction);
        let bill = upkeep(&state.map_nodes, faction);
        let total_upkeep = bill.total();

        let mut mat_delta = gross.materiel - total_upkeep;
        let mut qr_delta = gross.influence;
        if let Some(conversion) = faction.modifiers.resource_conversion {
            let converted = match conversion.from {
                ResourceKind::Materiel => {
                    let amount = gross.materiel;
                    mat_delta -= amount;
                    amount
                }
                ResourceKind::Influence => {
                    let amount = gross.influence;
                    qr_delta -= amount;
                    amount
                }
            };
            match conversion.to {
                ResourceKind::Materiel => mat_delta += converted * conversion.ratio,
                ResourceKind::Influence => qr_delta += converted * conversion.ratio,
            }
        }

        faction.materiel += mat_delta;
        faction.influence += qr_delta;
        faction.stats.total_mat_generated += gross.materiel;
        faction.stats.total_qr_generated += gross.influence;
        faction.stats.mat_spent_on_upkeep += total_upkeep;
        faction.stats.total_mat_consumed += total_upkeep;

        debug!(
            faction = %faction.id,
            income = gross.materiel,
            upkeep = total_upkeep,
            influence = gross.influence,
            "Upkeep settled"
        );
        if faction.materiel < 0.0 {
            info!(faction = %faction.id, materiel = faction.materiel, "Faction in debt");
        }
        events.push(GameEvent::log(
            LogKind::Event,
            Some(faction.id),
            format!(
                "Income {:.1} MAT / {:.1} QR, upkeep {:.1} MAT (units {:.1}, forts {:.1}, recon {:.1})",
                gross.materiel, gross.influence, total_upkeep, bill.units, bill.fortifications, bill.recon
            ),
        ));
    }
    events
}
