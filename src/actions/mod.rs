//! Maneuver actions: the typed command set and its validation/application

pub mod apply;
pub mod costs;

pub use apply::apply_action;

use serde::{Deserialize, Serialize};

use crate::core::types::NodeId;

/// Action kind tags, as they appear on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionKind {
    DeployUnits,
    MoveUnits,
    AttackNode,
    BuildFortifications,
    PurchaseArtillery,
    MoveArtillery,
    ArtilleryStrike,
    TrainInfiltrator,
    SabotageMateriel,
    ReinforceNode,
    ConsolidateForces,
    HoldPosition,
    EconomicFocus,
    ActivateReconArray,
    PerformReconPulse,
    TrainVeterans,
}

/// One validated-shape command for one faction turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "params", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    #[serde(rename_all = "camelCase")]
    DeployUnits { node_id: NodeId, quantity: u32 },
    #[serde(rename_all = "camelCase")]
    MoveUnits { node_id: NodeId, target_node_id: NodeId, units: u32 },
    #[serde(rename_all = "camelCase")]
    AttackNode { node_id: NodeId, target_node_id: NodeId, units: u32 },
    #[serde(rename_all = "camelCase")]
    BuildFortifications { node_id: NodeId },
    #[serde(rename_all = "camelCase")]
    PurchaseArtillery { node_id: NodeId, quantity: u32 },
    #[serde(rename_all = "camelCase")]
    MoveArtillery { node_id: NodeId, target_node_id: NodeId, quantity: u32 },
    #[serde(rename_all = "camelCase")]
    ArtilleryStrike { node_id: NodeId, target_node_id: NodeId, guns: u32 },
    #[serde(rename_all = "camelCase")]
    TrainInfiltrator { node_id: NodeId, target_node_id: NodeId },
    #[serde(rename_all = "camelCase")]
    SabotageMateriel { node_id: NodeId },
    #[serde(rename_all = "camelCase")]
    ReinforceNode { node_id: NodeId, target_node_id: NodeId, units: u32 },
    #[serde(rename_all = "camelCase")]
    ConsolidateForces { node_id: NodeId },
    HoldPosition,
    EconomicFocus,
    #[serde(rename_all = "camelCase")]
    ActivateReconArray { node_id: NodeId },
    #[serde(rename_all = "camelCase")]
    PerformReconPulse { node_id: NodeId },
    #[serde(rename_all = "camelCase")]
    TrainVeterans { node_id: NodeId, quantity: u32 },
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::DeployUnits { .. } => ActionKind::DeployUnits,
            Action::MoveUnits { .. } => ActionKind::MoveUnits,
            Action::AttackNode { .. } => ActionKind::AttackNode,
            Action::BuildFortifications { .. } => ActionKind::BuildFortifications,
            Action::PurchaseArtillery { .. } => ActionKind::PurchaseArtillery,
            Action::MoveArtillery { .. } => ActionKind::MoveArtillery,
            Action::ArtilleryStrike { .. } => ActionKind::ArtilleryStrike,
            Action::TrainInfiltrator { .. } => ActionKind::TrainInfiltrator,
            Action::SabotageMateriel { .. } => ActionKind::SabotageMateriel,
            Action::ReinforceNode { .. } => ActionKind::ReinforceNode,
            Action::ConsolidateForces { .. } => ActionKind::ConsolidateForces,
            Action::HoldPosition => ActionKind::HoldPosition,
            Action::EconomicFocus => ActionKind::EconomicFocus,
            Action::ActivateReconArray { .. } => ActionKind::ActivateReconArray,
            Action::PerformReconPulse { .. } => ActionKind::PerformReconPulse,
            Action::TrainVeterans { .. } => ActionKind::TrainVeterans,
        }
    }
}

/// Loosely-typed action params as the planning oracle emits them
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawActionParams {
    pub node_id: Option<String>,
    pub target_node_id: Option<String>,
    pub units_to_deploy: Option<f64>,
    pub units_to_move: Option<f64>,
    pub quantity: Option<f64>,
    pub artillery_to_move: Option<f64>,
    pub artillery_to_fire: Option<f64>,
}

/// Oracle action payload before coercion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawAction {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub params: RawActionParams,
    #[serde(default)]
    pub reasoning: Option<String>,
}

fn node_param(value: &Option<String>, name: &str) -> Result<NodeId, String> {
    match value.as_deref().map(str::trim) {
        Some(id) if !id.is_empty() => Ok(NodeId::new(id)),
        _ => Err(format!("missing {}", name)),
    }
}

fn count_param(value: Option<f64>, name: &str) -> Result<u32, String> {
    match value {
        Some(n) if n.is_finite() && n >= 1.0 => Ok(n.floor().min(u32::MAX as f64) as u32),
        Some(n) => Err(format!("{} must be a positive count, got {}", name, n)),
        None => Err(format!("missing {}", name)),
    }
}

impl RawAction {
    /// Coerce the oracle's payload into a typed action
    ///
    /// This is the only place payload shape is checked; engine code works on
    /// `Action` and never re-inspects raw params.
    pub fn into_action(self) -> Result<Action, String> {
        let p = &self.params;
        let kind: ActionKind = serde_json::from_value(serde_json::Value::String(self.kind.trim().to_ascii_uppercase()))
            .map_err(|_| format!("unknown action type '{}'", self.kind))?;

        let action = match kind {
            ActionKind::DeployUnits => Action::DeployUnits {
                node_id: node_param(&p.node_id, "nodeId")?,
                quantity: count_param(p.units_to_deploy.or(p.quantity), "unitsToDeploy")?,
            },
            ActionKind::MoveUnits => Action::MoveUnits {
                node_id: node_param(&p.node_id, "nodeId")?,
                target_node_id: node_param(&p.target_node_id, "targetNodeId")?,
                units: count_param(p.units_to_move, "unitsToMove")?,
            },
            ActionKind::ReinforceNode => Action::ReinforceNode {
                node_id: node_param(&p.node_id, "nodeId")?,
                target_node_id: node_param(&p.target_node_id, "targetNodeId")?,
                units: count_param(p.units_to_move, "unitsToMove")?,
            },
            ActionKind::AttackNode => Action::AttackNode {
                node_id: node_param(&p.node_id, "nodeId")?,
                target_node_id: node_param(&p.target_node_id, "targetNodeId")?,
                units: count_param(p.units_to_move, "unitsToMove")?,
            },
            ActionKind::BuildFortifications => Action::BuildFortifications {
                node_id: node_param(&p.node_id, "nodeId")?,
            },
            ActionKind::PurchaseArtillery => Action::PurchaseArtillery {
                node_id: node_param(&p.node_id, "nodeId")?,
                quantity: count_param(p.quantity, "quantity")?,
            },
            ActionKind::MoveArtillery => Action::MoveArtillery {
                node_id: node_param(&p.node_id, "nodeId")?,
                target_node_id: node_param(&p.target_node_id, "targetNodeId")?,
                quantity: count_param(p.artillery_to_move.or(p.quantity), "artilleryToMove")?,
            },
            ActionKind::ArtilleryStrike => Action::ArtilleryStrike {
                node_id: node_param(&p.node_id, "nodeId")?,
                target_node_id: node_param(&p.target_node_id, "targetNodeId")?,
                guns: count_param(p.artillery_to_fire, "artilleryToFire")?,
            },
            ActionKind::TrainInfiltrator => Action::TrainInfiltrator {
                node_id: node_param(&p.node_id, "nodeId")?,
                target_node_id: node_param(&p.target_node_id, "targetNodeId")?,
            },
            ActionKind::SabotageMateriel => Action::SabotageMateriel {
                node_id: node_param(&p.node_id, "nodeId")?,
            },
            ActionKind::ConsolidateForces => Action::ConsolidateForces {
                node_id: node_param(&p.node_id, "nodeId")?,
            },
            ActionKind::HoldPosition => Action::HoldPosition,
            ActionKind::EconomicFocus => Action::EconomicFocus,
            ActionKind::ActivateReconArray => Action::ActivateReconArray {
                node_id: node_param(&p.node_id, "nodeId")?,
            },
            ActionKind::PerformReconPulse => Action::PerformReconPulse {
                node_id: node_param(&p.node_id, "nodeId")?,
            },
            ActionKind::TrainVeterans => Action::TrainVeterans {
                node_id: node_param(&p.node_id, "nodeId")?,
                quantity: count_param(p.quantity, "quantity")?,
            },
        };
        Ok(action)
    }
}
