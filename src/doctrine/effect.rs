//! Doctrine effect kinds
//!
//! One variant per effect tag. Doctrine content arrives as JSON, so parsing
//! goes through [`DoctrineEffect::parse`], which turns an unrecognised or
//! malformed entry into [`DoctrineEffect::Unknown`] instead of failing the
//! whole doctrine.

use serde::{Deserialize, Deserializer, Serialize};

use crate::actions::ActionKind;
use crate::core::types::{NodeType, ResourceKind};

/// Battle situation a conditional roll modifier applies in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CombatCondition {
    Attacking,
    Defending,
    NeutralTerritory,
    LowFortHp,
    AdjacentToEnemyTerritory,
    UnitsInBattle,
    SuccessfulDefenseNextAttack,
    NodeHasArtilleryAndUnits,
}

/// Converts part of one pool into the other each upkeep
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceConversion {
    pub from: ResourceKind,
    pub to: ResourceKind,
    /// Units of `to` gained per unit of `from`
    pub ratio: f64,
}

/// A single doctrine buff or nerf
///
/// Percentages are whole numbers (`10.0` is +10%).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DoctrineEffect {
    // === ECONOMY ===
    GainMat { value: f64 },
    FlatMatIncome { value: f64 },
    FlatQrIncome { value: f64 },
    PercentageMatIncomeModifier { value: f64 },
    PercentageQrIncomeModifier { value: f64 },
    #[serde(rename_all = "camelCase")]
    MatIncomeModifierFromNodeType { node_type: NodeType, value: f64 },
    #[serde(rename_all = "camelCase")]
    ResourceConversion { conversion_ratio: ResourceConversion },
    #[serde(rename_all = "camelCase")]
    DisableResourceType { resource_type: ResourceKind },
    ImmuneToLowSupplyPenalty,

    // === UPKEEP ===
    UnitUpkeepModifier { value: f64 },
    UnitUpkeepPercentageIncrease { value: f64 },
    UnitUpkeepPercentageDecrease { value: f64 },
    UnitUpkeepAdjacentCnModifier { value: f64 },
    UnitUpkeepOtherUnitsModifier { value: f64 },
    ReconArrayUpkeepModifier { value: f64 },
    InfiltratorUpkeepModifier { value: f64 },

    // === ACTION COSTS ===
    UnitDeployCostModifier { value: f64 },
    FortificationCostModifier { value: f64 },
    ArtilleryCostModifier { value: f64 },
    ArtilleryFireCostModifier { value: f64 },
    ReconCostModifier { value: f64 },
    InfiltratorCostModifier { value: f64 },
    MoveUnitsCostModifier { value: f64 },
    MoveUnitsCostPerUnitModifier { value: f64 },
    MoveUnitsCnCostModifier { value: f64 },
    #[serde(rename_all = "camelCase")]
    TemporaryActionCostReduction { action_type: ActionKind, value: f64, duration: u32 },
    #[serde(rename_all = "camelCase")]
    TemporaryActionCostIncrease { action_type: ActionKind, value: f64, duration: u32 },

    // === ACTION AVAILABILITY ===
    #[serde(rename_all = "camelCase")]
    DisableAction { action_type: ActionKind },
    UnitDeployLimit { value: u32 },
    #[serde(rename_all = "camelCase")]
    MaxControlledNodeTypeLimit { node_type: NodeType, max_limit: u32 },
    MaxActiveReconArrayLimit { value: u32 },
    DisableNewInfiltrators,
    DisableAutoReinforcements,
    DisableNeutralNodeCaptureAdjacentEnemy,

    // === COMBAT ===
    CombatRollModifier { value: i32 },
    CombatRollModifierConditional { value: i32, condition: CombatCondition },
    CombatBonusNeutralTerritory { value: i32 },
    CombatPenaltyOwnFortressDefense { value: i32 },
    FortificationCombatBonusModifier { value: i32 },
    BattlefieldPromotionModifier { value: i32 },
    BattleRewardMat { value: f64 },
    GainMatOnCapture { value: f64 },
    PermanentNodeMatReductionOnCapture { value: f64 },
    RecoverLostUnitsAfterBattle { value: f64 },
    NeutralNodeCaptureBonusReduction { value: i32 },
    EnemyCombatPenaltyAdjacentReconArray { value: i32 },
    OwnReconArrayEnemyAttackBonus { value: i32 },

    // === CAPACITY AND REINFORCEMENT ===
    MaxUnitCapacityModifier { value: i32 },
    CnMaxUnitCapacityModifier { value: i32 },
    MaxUnitCapacityNonCnModifier { value: i32 },
    FreeUnitPerTurn { value: u32 },
    AutoReinforcementRateModifier { value: i32 },
    OverflowReinforcementsToReservePool,

    // === FORTIFICATION ===
    FortificationHpModifier { value: i32 },
    BuildFortificationsAdjacentNeutral,
    SuppressionIncrease { value: u32 },

    // === ARTILLERY ===
    ArtilleryRangeModifier { value: i32 },
    ArtilleryDamageModifier { value: i32 },
    ArtilleryStrikeFortHpDamage { value: u32 },
    ArtilleryStrikeOwnUnitDamageChance { value: f64 },

    // === MOVEMENT ===
    MoveUnitsTwoNodes,
    #[serde(rename_all = "camelCase")]
    MoveUnitsFromCnToAnyNode {
        #[serde(default)]
        cooldown: u32,
    },
    MoveUnitsLeaveZeroUnits,
    MoveUnitsSuppressionPenalty { value: u32 },
    EnemyUnitAttritionOnMove { value: u32 },
    FreeMoveIntoNeutralNode,

    // === RECON ===
    ReconPulseDurationModifier { value: u32 },
    EnemyReconPulseFailureChance { value: f64 },
    DecoyReconPulse,
    PermanentEnemyResourceVisibility,

    // === COVERT ===
    InfiltratorEffectivenessModifier { value: f64 },
    InfiltratorDetectionModifier { value: f64 },
    SabotageTargetsGlobalStockpile,
    GainMatOnEnemyDeployment { value: f64 },

    /// Tag this build does not know, or a known tag with an unusable payload
    #[serde(skip_deserializing)]
    Unknown { tag: String },
}

impl DoctrineEffect {
    /// Parse one effect, degrading to `Unknown` rather than failing
    pub fn parse(value: serde_json::Value) -> Self {
        let mut tag = value
            .get("type")
            .and_then(|t| t.as_str())
            .unwrap_or("<missing>")
            .to_string();
        // A serialized Unknown carries its original tag alongside
        if tag == "UNKNOWN" {
            if let Some(original) = value.get("tag").and_then(|t| t.as_str()) {
                tag = original.to_string();
            }
        }
        serde_json::from_value(value).unwrap_or(DoctrineEffect::Unknown { tag })
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, DoctrineEffect::Unknown { .. })
    }
}

/// `deserialize_with` helper for effect lists in doctrine content
pub fn deserialize_effects<'de, D>(deserializer: D) -> Result<Vec<DoctrineEffect>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw.into_iter().map(DoctrineEffect::parse).collect())
}
