//! Territory graph: connectivity queries and built-in map templates

pub mod graph;
pub mod templates;

pub use graph::{
    hop_distance, is_connected_to_command_node, largest_component_size, supplied_nodes,
};
pub use templates::{build_nodes, MapType};
