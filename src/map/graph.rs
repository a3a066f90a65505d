//! Breadth-first connectivity over the node graph
//!
//! Ownership-restricted searches only step onto nodes held by the faction
//! being queried.

use ahash::AHashSet;
use std::collections::{BTreeMap, VecDeque};

use crate::core::types::{FactionId, NodeId};
use crate::state::Node;

pub type NodeMap = BTreeMap<NodeId, Node>;

/// Owned nodes reachable from `start` through `faction`'s own territory
fn owned_component(nodes: &NodeMap, start: &NodeId, faction: FactionId) -> AHashSet<NodeId> {
    let mut visited = AHashSet::new();
    match nodes.get(start) {
        Some(node) if node.owner == faction => {}
        _ => return visited,
    }

    let mut queue = VecDeque::new();
    visited.insert(start.clone());
    queue.push_back(start.clone());

    while let Some(current) = queue.pop_front() {
        let Some(node) = nodes.get(&current) else {
            continue;
        };
        for neighbor_id in &node.connections {
            if visited.contains(neighbor_id) {
                continue;
            }
            if let Some(neighbor) = nodes.get(neighbor_id) {
                if neighbor.owner == faction {
                    visited.insert(neighbor_id.clone());
                    queue.push_back(neighbor_id.clone());
                }
            }
        }
    }
    visited
}

/// True if `start` is owned by `faction` and linked to one of its command
/// nodes through owned territory
pub fn is_connected_to_command_node(nodes: &NodeMap, start: &NodeId, faction: FactionId) -> bool {
    owned_component(nodes, start, faction)
        .iter()
        .filter_map(|id| nodes.get(id))
        .any(|node| node.is_command_node())
}

/// Size of the faction's largest connected block of owned nodes
pub fn largest_component_size(nodes: &NodeMap, faction: FactionId) -> usize {
    let mut seen: AHashSet<NodeId> = AHashSet::new();
    let mut largest = 0;

    for (id, node) in nodes {
        if node.owner != faction || seen.contains(id) {
            continue;
        }
        let component = owned_component(nodes, id, faction);
        largest = largest.max(component.len());
        seen.extend(component);
    }
    largest
}

/// Owned nodes that trace a supply line to an owned command node
pub fn supplied_nodes(nodes: &NodeMap, faction: FactionId) -> AHashSet<NodeId> {
    let mut supplied = AHashSet::new();
    for (id, node) in nodes {
        if node.owner == faction && node.is_command_node() && !supplied.contains(id) {
            supplied.extend(owned_component(nodes, id, faction));
        }
    }
    supplied
}

/// Hop count between two nodes ignoring ownership, if within `max_hops`
pub fn hop_distance(nodes: &NodeMap, from: &NodeId, to: &NodeId, max_hops: u32) -> Option<u32> {
    if from == to {
        return Some(0);
    }
    let mut visited = AHashSet::new();
    let mut queue = VecDeque::new();
    visited.insert(from.clone());
    queue.push_back((from.clone(), 0u32));

    while let Some((current, depth)) = queue.pop_front() {
        if depth >= max_hops {
            continue;
        }
        let Some(node) = nodes.get(&current) else {
            continue;
        };
        for neighbor in &node.connections {
            if neighbor == to {
                return Some(depth + 1);
            }
            if visited.insert(neighbor.clone()) {
                queue.push_back((neighbor.clone(), depth + 1));
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::NodeType;

    /// A - B - C - D, with E hanging off A
    fn chain() -> NodeMap {
        let specs = [
            ("A", NodeType::Cn, FactionId::GemQ, vec!["B", "E"]),
            ("B", NodeType::Standard, FactionId::GemQ, vec!["A", "C"]),
            ("C", NodeType::Standard, FactionId::Axiom, vec!["B", "D"]),
            ("D", NodeType::ReconArray, FactionId::GemQ, vec!["C"]),
            ("E", NodeType::Standard, FactionId::GemQ, vec!["A"]),
        ];
        specs
            .into_iter()
            .map(|(id, ty, owner, links)| {
                let mut node = Node::new(id, id, ty, owner);
                node.connections = links.into_iter().map(NodeId::from).collect();
                (NodeId::from(id), node)
            })
            .collect()
    }

    #[test]
    fn test_connected_through_owned_nodes() {
        let nodes = chain();
        assert!(is_connected_to_command_node(&nodes, &"B".into(), FactionId::GemQ));
        assert!(!is_connected_to_command_node(&nodes, &"D".into(), FactionId::GemQ));
        assert!(!is_connected_to_command_node(&nodes, &"C".into(), FactionId::GemQ));
    }

    #[test]
    fn test_largest_component() {
        let nodes = chain();
        assert_eq!(largest_component_size(&nodes, FactionId::GemQ), 3);
        assert_eq!(largest_component_size(&nodes, FactionId::Axiom), 1);
        assert_eq!(largest_component_size(&nodes, FactionId::Neutral), 0);
    }

    #[test]
    fn test_supplied_nodes_exclude_cut_off_territory() {
        let nodes = chain();
        let supplied = supplied_nodes(&nodes, FactionId::GemQ);
        assert!(supplied.contains(&NodeId::from("E")));
        assert!(!supplied.contains(&NodeId::from("D")));
    }

    #[test]
    fn test_hop_distance() {
        let nodes = chain();
        assert_eq!(hop_distance(&nodes, &"A".into(), &"C".into(), 2), Some(2));
        assert_eq!(hop_distance(&nodes, &"A".into(), &"D".into(), 2), None);
        assert_eq!(hop_distance(&nodes, &"A".into(), &"D".into(), 3), Some(3));
    }
}
