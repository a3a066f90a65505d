//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};
use std::fmt;

/// Faction identifier
///
/// The two playable factions, the neutral owner of unclaimed territory, and
/// the human observer that can only send directives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FactionId {
    #[serde(rename = "GEM-Q")]
    GemQ,
    #[serde(rename = "AXIOM")]
    Axiom,
    #[serde(rename = "NEUTRAL")]
    Neutral,
    #[serde(rename = "COMMAND_CONSOLE")]
    CommandConsole,
}

impl FactionId {
    /// Playable factions in maneuver order
    pub const PLAYABLE: [FactionId; 2] = [FactionId::Axiom, FactionId::GemQ];

    pub fn is_playable(self) -> bool {
        matches!(self, FactionId::GemQ | FactionId::Axiom)
    }

    pub fn opponent(self) -> Option<FactionId> {
        match self {
            FactionId::GemQ => Some(FactionId::Axiom),
            FactionId::Axiom => Some(FactionId::GemQ),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FactionId::GemQ => "GEM-Q",
            FactionId::Axiom => "AXIOM",
            FactionId::Neutral => "NEUTRAL",
            FactionId::CommandConsole => "COMMAND_CONSOLE",
        }
    }

    pub fn parse(s: &str) -> Option<FactionId> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GEM-Q" | "GEMQ" => Some(FactionId::GemQ),
            "AXIOM" => Some(FactionId::Axiom),
            "NEUTRAL" => Some(FactionId::Neutral),
            "COMMAND_CONSOLE" => Some(FactionId::CommandConsole),
            _ => None,
        }
    }
}

impl fmt::Display for FactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Territory node identifier (map-template ids such as "CN-W")
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Node classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeType {
    /// Command node
    Cn,
    Qn,
    Kj,
    IndustrialHub,
    Fortress,
    Urban,
    Standard,
    ReconArray,
}

impl NodeType {
    pub fn max_units(self) -> u32 {
        match self {
            NodeType::Cn => 100,
            NodeType::Fortress => 75,
            NodeType::IndustrialHub | NodeType::Urban | NodeType::Standard | NodeType::ReconArray => 50,
            NodeType::Qn | NodeType::Kj => 20,
        }
    }

    pub fn default_influence_output(self) -> f64 {
        match self {
            NodeType::Cn => 10.0,
            NodeType::Qn => 15.0,
            NodeType::Fortress => 12.0,
            NodeType::IndustrialHub => 8.0,
            NodeType::Urban => 7.0,
            NodeType::Standard => 5.0,
            NodeType::Kj | NodeType::ReconArray => 0.0,
        }
    }

    pub fn default_materiel_output(self) -> f64 {
        match self {
            NodeType::Cn => 15.0,
            NodeType::IndustrialHub => 20.0,
            NodeType::Urban | NodeType::Fortress => 10.0,
            NodeType::Standard => 5.0,
            NodeType::Qn | NodeType::Kj | NodeType::ReconArray => 0.0,
        }
    }
}

/// Turn phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    Fluctuation,
    Resource,
    Doctrine,
    ManeuverAxiom,
    ManeuverGemq,
    Combat,
    FortifyAxiom,
    FortifyGemq,
    Upkeep,
    GameOver,
}

impl Phase {
    /// Faction acting in a per-faction phase
    pub fn acting_faction(self) -> Option<FactionId> {
        match self {
            Phase::ManeuverAxiom | Phase::FortifyAxiom => Some(FactionId::Axiom),
            Phase::ManeuverGemq | Phase::FortifyGemq => Some(FactionId::GemQ),
            _ => None,
        }
    }
}

/// Unit classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnitType {
    Standard,
    Veteran,
}

/// Resource pools
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    #[serde(rename = "MAT")]
    Materiel,
    #[serde(rename = "QR")]
    Influence,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_faction_serde_names() {
        assert_eq!(serde_json::to_string(&FactionId::GemQ).unwrap(), "\"GEM-Q\"");
        assert_eq!(serde_json::to_string(&FactionId::CommandConsole).unwrap(), "\"COMMAND_CONSOLE\"");
        let parsed: FactionId = serde_json::from_str("\"AXIOM\"").unwrap();
        assert_eq!(parsed, FactionId::Axiom);
    }

    #[test]
    fn test_opponents() {
        assert_eq!(FactionId::GemQ.opponent(), Some(FactionId::Axiom));
        assert_eq!(FactionId::Neutral.opponent(), None);
        assert!(!FactionId::CommandConsole.is_playable());
    }

    #[test]
    fn test_node_type_tags() {
        assert_eq!(serde_json::to_string(&NodeType::Cn).unwrap(), "\"CN\"");
        assert_eq!(serde_json::to_string(&NodeType::IndustrialHub).unwrap(), "\"INDUSTRIAL_HUB\"");
        assert_eq!(serde_json::to_string(&NodeType::ReconArray).unwrap(), "\"RECON_ARRAY\"");
    }

    #[test]
    fn test_phase_tags_and_actors() {
        assert_eq!(serde_json::to_string(&Phase::ManeuverGemq).unwrap(), "\"MANEUVER_GEMQ\"");
        assert_eq!(Phase::FortifyAxiom.acting_faction(), Some(FactionId::Axiom));
        assert_eq!(Phase::Combat.acting_faction(), None);
    }

    #[test]
    fn test_capacity_by_type() {
        assert_eq!(NodeType::Cn.max_units(), 100);
        assert_eq!(NodeType::Fortress.max_units(), 75);
        assert_eq!(NodeType::Qn.max_units(), 20);
    }
}
