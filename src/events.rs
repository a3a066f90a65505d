//! Domain events and the log entries they become
//!
//! Engines never write logs directly. They return `GameEvent`s and the
//! orchestrator commits them to the state's logs in order.

use serde::{Deserialize, Serialize};

use crate::combat::BattleReport;
use crate::core::types::{FactionId, NodeId, Phase};

/// System log entry category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogKind {
    Event,
    Error,
    Info,
    AiPlan,
    AiAction,
    PhaseTransition,
    Artillery,
    Recon,
    Infiltration,
    Fortification,
    Doctrine,
    Communique,
    Directive,
}

/// Node activity category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityKind {
    Capture,
    Fortify,
    FortRepair,
    FortDamage,
    Interdict,
    CombatLoss,
    StatusChange,
    UnitDeploy,
    Training,
    ArtilleryStrike,
    ArtilleryPurchase,
    ReconArrayActivated,
    ReconArrayDeactivated,
    ReconPulseActivated,
    InfiltratorDeployed,
    SabotageSuccess,
    SabotageFailure,
    InfiltratorDetected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemLogEntry {
    pub id: u64,
    pub turn: u32,
    pub phase: Phase,
    pub kind: LogKind,
    pub source: Option<FactionId>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeActivityEntry {
    pub id: u64,
    pub turn: u32,
    pub node_id: NodeId,
    pub kind: ActivityKind,
    pub faction: Option<FactionId>,
    pub message: String,
}

/// Who a communiqué is addressed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommTarget {
    Faction(FactionId),
    Broadcast(BroadcastTag),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BroadcastTag {
    #[serde(rename = "BROADCAST")]
    Broadcast,
}

impl CommTarget {
    pub const BROADCAST: CommTarget = CommTarget::Broadcast(BroadcastTag::Broadcast);

    pub fn includes(self, faction: FactionId) -> bool {
        match self {
            CommTarget::Faction(target) => target == faction,
            CommTarget::Broadcast(_) => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommLogEntry {
    pub id: u64,
    pub turn: u32,
    pub sender: FactionId,
    pub target: Option<CommTarget>,
    pub message: String,
}

/// Something that happened during a phase
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    Log {
        kind: LogKind,
        source: Option<FactionId>,
        message: String,
    },
    NodeActivity {
        node_id: NodeId,
        kind: ActivityKind,
        faction: Option<FactionId>,
        message: String,
    },
    /// A validation failure resolved as a no-op
    ActionRejected {
        faction: FactionId,
        message: String,
    },
    Battle(Box<BattleReport>),
    Communique {
        sender: FactionId,
        target: Option<CommTarget>,
        message: String,
    },
}

impl GameEvent {
    pub fn log(kind: LogKind, source: Option<FactionId>, message: impl Into<String>) -> Self {
        GameEvent::Log {
            kind,
            source,
            message: message.into(),
        }
    }

    pub fn event(source: FactionId, message: impl Into<String>) -> Self {
        Self::log(LogKind::Event, Some(source), message)
    }

    pub fn error(source: Option<FactionId>, message: impl Into<String>) -> Self {
        Self::log(LogKind::Error, source, message)
    }

    pub fn activity(
        node_id: &NodeId,
        kind: ActivityKind,
        faction: Option<FactionId>,
        message: impl Into<String>,
    ) -> Self {
        GameEvent::NodeActivity {
            node_id: node_id.clone(),
            kind,
            faction,
            message: message.into(),
        }
    }

    pub fn rejected(faction: FactionId, message: impl Into<String>) -> Self {
        GameEvent::ActionRejected {
            faction,
            message: message.into(),
        }
    }

    pub fn is_rejection(&self) -> bool {
        matches!(self, GameEvent::ActionRejected { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comm_target_serde() {
        assert_eq!(serde_json::to_string(&CommTarget::BROADCAST).unwrap(), "\"BROADCAST\"");
        let target: CommTarget = serde_json::from_str("\"GEM-Q\"").unwrap();
        assert_eq!(target, CommTarget::Faction(FactionId::GemQ));
        let broadcast: CommTarget = serde_json::from_str("\"BROADCAST\"").unwrap();
        assert!(broadcast.includes(FactionId::Axiom));
        assert!(!target.includes(FactionId::Axiom));
    }

    #[test]
    fn test_rejection_helper() {
        let event = GameEvent::rejected(FactionId::Axiom, "insufficient MAT");
        assert!(event.is_rejection());
        assert!(!GameEvent::event(FactionId::Axiom, "ok").is_rejection());
    }
}
