//! Built-in map templates and board setup

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::core::error::GridError;
use crate::core::types::{FactionId, NodeId, NodeType};
use crate::map::graph::NodeMap;
use crate::state::Node;

use FactionId::{Axiom as AX, GemQ as GQ, Neutral as NE};
use NodeType::{Cn, Fortress, IndustrialHub, Qn, ReconArray, Standard, Urban};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MapType {
    VolgogradCauldron,
    ClassicLattice,
    TartarusAnomaly,
}

impl MapType {
    pub const ALL: [MapType; 3] = [
        MapType::VolgogradCauldron,
        MapType::ClassicLattice,
        MapType::TartarusAnomaly,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            MapType::VolgogradCauldron => "Volgograd Cauldron",
            MapType::ClassicLattice => "Classic Lattice",
            MapType::TartarusAnomaly => "The Tartarus Anomaly",
        }
    }

    fn template(self) -> &'static MapTemplate {
        match self {
            MapType::VolgogradCauldron => &VOLGOGRAD_CAULDRON,
            MapType::ClassicLattice => &CLASSIC_LATTICE,
            MapType::TartarusAnomaly => &TARTARUS_ANOMALY,
        }
    }
}

impl FromStr for MapType {
    type Err = GridError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "VOLGOGRAD_CAULDRON" => Ok(MapType::VolgogradCauldron),
            "CLASSIC_LATTICE" => Ok(MapType::ClassicLattice),
            "TARTARUS_ANOMALY" => Ok(MapType::TartarusAnomaly),
            _ => Err(GridError::UnknownMap(s.to_string())),
        }
    }
}

struct NodeTemplate {
    id: &'static str,
    name: &'static str,
    node_type: NodeType,
    owner: FactionId,
    units: u32,
    fort_level: u32,
    influence: Option<f64>,
    materiel: Option<f64>,
}

const fn node(
    id: &'static str,
    name: &'static str,
    node_type: NodeType,
    owner: FactionId,
    units: u32,
    fort_level: u32,
) -> NodeTemplate {
    NodeTemplate {
        id,
        name,
        node_type,
        owner,
        units,
        fort_level,
        influence: None,
        materiel: None,
    }
}

const fn node_with_output(
    id: &'static str,
    name: &'static str,
    node_type: NodeType,
    owner: FactionId,
    units: u32,
    influence: f64,
    materiel: f64,
) -> NodeTemplate {
    NodeTemplate {
        id,
        name,
        node_type,
        owner,
        units,
        fort_level: 0,
        influence: Some(influence),
        materiel: Some(materiel),
    }
}

struct MapTemplate {
    gemq_start: &'static str,
    axiom_start: &'static str,
    nodes: &'static [NodeTemplate],
    connections: &'static [(&'static str, &'static str)],
}

static VOLGOGRAD_CAULDRON: MapTemplate = MapTemplate {
    gemq_start: "CN-E",
    axiom_start: "CN-W",
    nodes: &[
        node("CN-W", "Western Staging", Cn, AX, 25, 1),
        node("WSH", "West Supply Hub", IndustrialHub, AX, 0, 1),
        node("WMP", "West Motor Pool", Standard, AX, 0, 0),
        node("FBD", "Recon Array Don", ReconArray, NE, 5, 0),
        node("WG", "West Gate", Standard, AX, 18, 0),
        node("BA", "Beketovka Approach", Standard, AX, 1, 0),
        node("NS", "Northern Strongpoint", Fortress, NE, 10, 2),
        node("KA", "Kotluban Approach", Standard, AX, 1, 0),
        node_with_output("NB", "North Bridge", Standard, NE, 0, 5.0, 0.0),
        node("MK", "Mamayev Kurgan", Urban, NE, 5, 0),
        node("TF", "Tractor Factory", IndustrialHub, NE, 5, 0),
        node("OP", "October Plant", IndustrialHub, NE, 5, 0),
        node("CS", "Central Station", Standard, NE, 0, 0),
        node_with_output("SB", "South Bridge", Standard, NE, 0, 5.0, 0.0),
        node("SS", "Southern Strongpoint", Fortress, NE, 10, 2),
        node("GH", "Gorodishche Heights", Standard, GQ, 6, 0),
        node("EG", "East Gate", Standard, GQ, 9, 0),
        node("KR", "Krasnoarmeysk Ruins", Standard, GQ, 3, 0),
        node("FBV", "Recon Array Volga", ReconArray, NE, 5, 0),
        node("EMP", "East Motor Pool", Standard, GQ, 1, 0),
        node("ESH", "East Supply Hub", IndustrialHub, GQ, 1, 0),
        node("CN-E", "Eastern Staging", Cn, GQ, 25, 1),
    ],
    connections: &[
        ("CN-W", "WSH"), ("CN-W", "WMP"), ("CN-W", "FBD"), ("WSH", "KA"), ("WSH", "FBD"),
        ("WMP", "FBD"), ("WMP", "BA"), ("FBD", "WG"), ("WG", "KA"), ("WG", "NB"),
        ("WG", "MK"), ("WG", "CS"), ("WG", "SB"), ("WG", "BA"), ("KA", "NS"),
        ("KA", "NB"), ("BA", "SB"), ("BA", "SS"), ("NS", "NB"), ("NS", "GH"),
        ("NB", "MK"), ("NB", "TF"), ("NB", "GH"), ("MK", "TF"), ("MK", "OP"),
        ("MK", "CS"), ("TF", "GH"), ("TF", "EG"), ("TF", "OP"), ("OP", "EG"),
        ("OP", "FBV"), ("OP", "CS"), ("CS", "SB"), ("CS", "KR"), ("CS", "EMP"),
        ("SB", "SS"), ("SB", "KR"), ("SS", "KR"), ("GH", "ESH"), ("GH", "EG"),
        ("EG", "ESH"), ("EG", "FBV"), ("KR", "FBV"), ("KR", "EMP"), ("FBV", "ESH"),
        ("FBV", "EMP"), ("FBV", "CN-E"), ("ESH", "CN-E"), ("EMP", "CN-E"),
    ],
};

static CLASSIC_LATTICE: MapTemplate = MapTemplate {
    gemq_start: "N1",
    axiom_start: "N2",
    nodes: &[
        node("N1", "GEM-Q CN", Cn, GQ, 25, 1),
        node("N2", "AXIOM CN", Cn, AX, 25, 1),
        node("N3", "Peri-Alpha", IndustrialHub, GQ, 8, 0),
        node("N5", "Fortress Vega", Fortress, NE, 12, 1),
        node("N6", "Fortress Nexus", Fortress, NE, 15, 1),
        node("N7", "Peri-Beta", IndustrialHub, AX, 8, 0),
        node("N8", "Quad Gamma", Qn, GQ, 5, 0),
        node("N9", "X-Link Delta", Urban, NE, 5, 0),
        node("N10", "Fortress Sirius", Fortress, NE, 12, 1),
        node("N11", "X-Link Zeta", Urban, NE, 5, 0),
        node("N12", "Quad Eta", Qn, AX, 5, 0),
        node("N13", "Core Theta", Qn, NE, 0, 0),
        node("N14", "Core Iota", Qn, NE, 0, 0),
    ],
    connections: &[
        ("N1", "N3"), ("N1", "N8"), ("N1", "N5"), ("N2", "N7"), ("N2", "N12"), ("N2", "N5"),
        ("N3", "N5"), ("N3", "N6"), ("N3", "N8"), ("N3", "N9"), ("N5", "N6"), ("N5", "N7"),
        ("N6", "N7"), ("N6", "N9"), ("N6", "N10"), ("N6", "N11"), ("N7", "N11"), ("N7", "N12"),
        ("N8", "N9"), ("N8", "N13"), ("N9", "N10"), ("N9", "N13"), ("N10", "N11"),
        ("N10", "N13"), ("N10", "N14"), ("N11", "N12"), ("N11", "N14"), ("N12", "N14"),
    ],
};

static TARTARUS_ANOMALY: MapTemplate = MapTemplate {
    gemq_start: "N3",
    axiom_start: "N10",
    nodes: &[
        node("N3", "Elysian Fields", Cn, GQ, 25, 1),
        node("N10", "Asphodel Meadows", Cn, AX, 25, 1),
        node("N20", "Styx Terminus", Fortress, NE, 15, 1),
        node("N21", "Lethe Confluence", Fortress, NE, 15, 1),
        node("N22", "Acheron Gate", Fortress, NE, 15, 1),
        node("N0", "Persephone's Gate", Qn, GQ, 8, 0),
        node("N2", "Hecate's Veil", IndustrialHub, GQ, 5, 0),
        node("N6", "Orpheus Relay", Urban, NE, 5, 0),
        node("N7", "The Charon Relay", Qn, NE, 3, 0),
        node("N8", "Eurydice's Hope", Qn, NE, 0, 0),
        node("N9", "Nyx's Approach", Qn, GQ, 5, 0),
        node("N11", "Erebus Expanse", IndustrialHub, AX, 5, 0),
        node("N23", "Hypnos Channel", Qn, AX, 3, 0),
        node("N25", "Morpheus Drift", Qn, NE, 0, 0),
        node("N26", "Thanatos Link", Qn, NE, 3, 0),
        node("N27", "The Phlegethon", Urban, NE, 5, 0),
        node("N28", "The Cocytus", Qn, NE, 3, 0),
        node("N29", "Hades' Crossing", Qn, NE, 3, 0),
        node("N30", "Tartarus Breach", Qn, NE, 0, 0),
        node("N31", "Cerberus Watch", Qn, NE, 0, 0),
        node("N32", "Sisyphus Loop", Qn, NE, 0, 0),
        node("N33", "Tantalus Reach", Qn, NE, 0, 0),
        node("N34", "The Furies", Qn, AX, 8, 0),
    ],
    connections: &[
        ("N3", "N2"), ("N3", "N0"), ("N3", "N9"), ("N10", "N11"), ("N10", "N23"), ("N10", "N34"),
        ("N20", "N32"), ("N20", "N33"), ("N20", "N31"), ("N20", "N30"), ("N21", "N30"),
        ("N21", "N31"), ("N21", "N29"), ("N21", "N28"), ("N22", "N32"), ("N22", "N33"),
        ("N22", "N27"), ("N22", "N6"), ("N0", "N29"), ("N2", "N9"), ("N2", "N7"), ("N2", "N6"),
        ("N2", "N29"), ("N6", "N8"), ("N6", "N7"), ("N7", "N29"), ("N7", "N30"), ("N7", "N32"),
        ("N8", "N9"), ("N11", "N23"), ("N11", "N25"), ("N23", "N26"), ("N23", "N27"),
        ("N23", "N28"), ("N25", "N27"), ("N26", "N27"), ("N26", "N28"), ("N26", "N31"),
        ("N26", "N33"), ("N28", "N34"), ("N28", "N31"),
    ],
};

/// Node types that keep their neutral garrison when the board is masked
fn keeps_garrison_under_fog(node_type: NodeType) -> bool {
    matches!(node_type, IndustrialHub | Fortress | Urban | Cn | Qn)
}

/// Build the starting nodes for a map
///
/// With `fog_of_war` the board is masked: only the two starting command
/// nodes keep an owner, recon arrays and significant neutral strongholds
/// keep their garrison, and everything else starts as empty neutral ground.
pub fn build_nodes(map_type: MapType, fog_of_war: bool) -> NodeMap {
    let template = map_type.template();

    let mut adjacency: BTreeMap<&str, Vec<NodeId>> = BTreeMap::new();
    for &(a, b) in template.connections {
        let a_links = adjacency.entry(a).or_default();
        if !a_links.iter().any(|id| id.as_str() == b) {
            a_links.push(NodeId::from(b));
        }
        let b_links = adjacency.entry(b).or_default();
        if !b_links.iter().any(|id| id.as_str() == a) {
            b_links.push(NodeId::from(a));
        }
    }

    let mut nodes = NodeMap::new();
    for spec in template.nodes {
        let (owner, units, fort_level) = if !fog_of_war {
            (spec.owner, spec.units, spec.fort_level)
        } else if spec.id == template.gemq_start {
            (GQ, spec.units, spec.fort_level)
        } else if spec.id == template.axiom_start {
            (AX, spec.units, spec.fort_level)
        } else if spec.node_type == ReconArray {
            (NE, spec.units, spec.fort_level)
        } else if spec.units > 0 && keeps_garrison_under_fog(spec.node_type) {
            (NE, spec.units, spec.fort_level)
        } else {
            (NE, 0, 0)
        };

        let mut node = Node::new(spec.id, spec.name, spec.node_type, owner);
        node.standard_units = units.min(node.max_units);
        node.set_fortification_level(fort_level);
        if let Some(influence) = spec.influence {
            node.influence_output = influence;
        }
        if let Some(materiel) = spec.materiel {
            node.materiel_output = materiel;
        }
        node.connections = adjacency.remove(spec.id).unwrap_or_default();
        nodes.insert(node.id.clone(), node);
    }
    nodes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_map_is_symmetric_and_valid() {
        for map_type in MapType::ALL {
            let nodes = build_nodes(map_type, false);
            for node in nodes.values() {
                assert!(node.check_invariants().is_ok(), "{}", node.id);
                for link in &node.connections {
                    let other = nodes.get(link).expect("connection to unknown node");
                    assert!(other.connections.contains(&node.id), "{} -> {} one-way", node.id, link);
                }
            }
        }
    }

    #[test]
    fn test_volgograd_layout() {
        let nodes = build_nodes(MapType::VolgogradCauldron, false);
        assert_eq!(nodes.len(), 22);
        let west = &nodes[&NodeId::from("CN-W")];
        assert_eq!(west.owner, FactionId::Axiom);
        assert_eq!(west.max_units, 100);
        assert_eq!(west.fortification_hp, 100);
        let ns = &nodes[&NodeId::from("NS")];
        assert_eq!(ns.max_fortification_hp, 200);
        assert_eq!(ns.max_units, 75);
        assert_eq!(nodes[&NodeId::from("NB")].materiel_output, 0.0);
        assert_eq!(nodes[&NodeId::from("TF")].materiel_output, 20.0);
    }

    #[test]
    fn test_fog_masks_ordinary_nodes() {
        let nodes = build_nodes(MapType::VolgogradCauldron, true);
        assert_eq!(nodes[&NodeId::from("CN-E")].owner, FactionId::GemQ);
        assert_eq!(nodes[&NodeId::from("CN-E")].standard_units, 25);
        let wg = &nodes[&NodeId::from("WG")];
        assert_eq!(wg.owner, FactionId::Neutral);
        assert_eq!(wg.standard_units, 0);
        assert_eq!(nodes[&NodeId::from("FBD")].standard_units, 5);
        assert_eq!(nodes[&NodeId::from("NS")].standard_units, 10);
        assert_eq!(nodes[&NodeId::from("WSH")].owner, FactionId::Neutral);
    }

    #[test]
    fn test_parse_map_type() {
        assert_eq!("classic_lattice".parse::<MapType>().unwrap(), MapType::ClassicLattice);
        assert!(matches!("ATLANTIS".parse::<MapType>(), Err(GridError::UnknownMap(_))));
    }
}
