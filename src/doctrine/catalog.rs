//! Doctrine library
//!
//! A catalog of buff/nerf bundles. The built-in set covers every theme; extra
//! doctrine packs can be loaded from JSON, where effects this build does not
//! recognise are kept as `Unknown` and skipped when applied.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::actions::ActionKind;
use crate::core::error::Result;
use crate::core::types::{NodeType, ResourceKind};
use crate::doctrine::effect::{
    deserialize_effects, CombatCondition, DoctrineEffect, ResourceConversion as Conversion,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DoctrineTheme {
    Economic,
    MilitaryOffense,
    MilitaryDefense,
    TerritorialControl,
    IntelligenceGathering,
    CounterIntelligence,
    Subterfuge,
    Logistics,
    StrategicFlexibility,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DoctrineTier {
    Low,
    Medium,
    High,
}

impl DoctrineTier {
    /// Nominal QR price, shown to the choosing side
    pub fn influence_cost(self) -> f64 {
        match self {
            DoctrineTier::Low => 250.0,
            DoctrineTier::Medium => 500.0,
            DoctrineTier::High => 1000.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctrineDefinition {
    pub id: String,
    pub name: String,
    pub theme: DoctrineTheme,
    pub tier: DoctrineTier,
    #[serde(deserialize_with = "deserialize_effects")]
    pub buffs: Vec<DoctrineEffect>,
    #[serde(deserialize_with = "deserialize_effects")]
    pub nerfs: Vec<DoctrineEffect>,
}

#[derive(Debug, Clone, Default)]
pub struct DoctrineCatalog {
    doctrines: Vec<DoctrineDefinition>,
}

impl DoctrineCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, doctrine: DoctrineDefinition) {
        self.doctrines.push(doctrine);
    }

    pub fn get(&self, id: &str) -> Option<&DoctrineDefinition> {
        self.doctrines.iter().find(|d| d.id == id)
    }

    pub fn all(&self) -> &[DoctrineDefinition] {
        &self.doctrines
    }

    pub fn len(&self) -> usize {
        self.doctrines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doctrines.is_empty()
    }

    /// Parse a JSON array of doctrine definitions
    pub fn parse_json(content: &str) -> Result<Self> {
        let doctrines: Vec<DoctrineDefinition> = serde_json::from_str(content)?;
        Ok(Self { doctrines })
    }

    /// Load a doctrine pack from disk
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse_json(&content)
    }

    /// Draw up to `count` distinct doctrines
    pub fn offer(&self, count: usize, rng: &mut impl Rng) -> Vec<DoctrineDefinition> {
        self.doctrines.choose_multiple(rng, count).cloned().collect()
    }

    /// The library shipped with the engine
    pub fn builtin() -> Self {
        use DoctrineEffect::*;

        let entries = vec![
            doctrine(
                "war-economy",
                "War Economy",
                DoctrineTheme::Economic,
                DoctrineTier::Medium,
                vec![FlatMatIncome { value: 25.0 }, PercentageMatIncomeModifier { value: 10.0 }],
                vec![PercentageQrIncomeModifier { value: -20.0 }],
            ),
            doctrine(
                "industrial-concentration",
                "Industrial Concentration",
                DoctrineTheme::Economic,
                DoctrineTier::Low,
                vec![MatIncomeModifierFromNodeType {
                    node_type: NodeType::IndustrialHub,
                    value: 10.0,
                }],
                vec![UnitUpkeepPercentageIncrease { value: 10.0 }],
            ),
            doctrine(
                "requisition-decree",
                "Requisition Decree",
                DoctrineTheme::Economic,
                DoctrineTier::High,
                vec![
                    GainMat { value: 200.0 },
                    ResourceConversion {
                        conversion_ratio: Conversion {
                            from: ResourceKind::Influence,
                            to: ResourceKind::Materiel,
                            ratio: 0.5,
                        },
                    },
                ],
                vec![DisableResourceType {
                    resource_type: ResourceKind::Influence,
                }],
            ),
            doctrine(
                "shock-assault",
                "Shock Assault",
                DoctrineTheme::MilitaryOffense,
                DoctrineTier::Medium,
                vec![
                    CombatRollModifierConditional {
                        value: 1,
                        condition: CombatCondition::Attacking,
                    },
                    BattleRewardMat { value: 20.0 },
                ],
                vec![DisableAction {
                    action_type: ActionKind::BuildFortifications,
                }],
            ),
            doctrine(
                "frontier-expansion",
                "Frontier Expansion",
                DoctrineTheme::TerritorialControl,
                DoctrineTier::Low,
                vec![CombatBonusNeutralTerritory { value: 1 }, GainMatOnCapture { value: 30.0 }],
                vec![PermanentNodeMatReductionOnCapture { value: 2.0 }],
            ),
            doctrine(
                "hedgehog-defense",
                "Hedgehog Defense",
                DoctrineTheme::MilitaryDefense,
                DoctrineTier::Medium,
                vec![
                    FortificationCombatBonusModifier { value: 1 },
                    FortificationHpModifier { value: 5 },
                    FortificationCostModifier { value: -25.0 },
                ],
                vec![MaxUnitCapacityNonCnModifier { value: -5 }],
            ),
            doctrine(
                "last-stand",
                "Last Stand",
                DoctrineTheme::MilitaryDefense,
                DoctrineTier::Low,
                vec![CombatRollModifierConditional {
                    value: 2,
                    condition: CombatCondition::LowFortHp,
                }],
                vec![CombatPenaltyOwnFortressDefense { value: 1 }],
            ),
            doctrine(
                "veteran-cadres",
                "Veteran Cadres",
                DoctrineTheme::MilitaryOffense,
                DoctrineTier::High,
                vec![BattlefieldPromotionModifier { value: 1 }, CombatRollModifier { value: 1 }],
                vec![UnitDeployCostModifier { value: 20.0 }, UnitDeployLimit { value: 6 }],
            ),
            doctrine(
                "deep-reserves",
                "Deep Reserves",
                DoctrineTheme::Logistics,
                DoctrineTier::Medium,
                vec![
                    AutoReinforcementRateModifier { value: 1 },
                    OverflowReinforcementsToReservePool,
                    CnMaxUnitCapacityModifier { value: 20 },
                ],
                vec![UnitUpkeepModifier { value: 10.0 }],
            ),
            doctrine(
                "mobile-warfare",
                "Mobile Warfare",
                DoctrineTheme::StrategicFlexibility,
                DoctrineTier::High,
                vec![MoveUnitsTwoNodes, ImmuneToLowSupplyPenalty],
                vec![MoveUnitsCostPerUnitModifier { value: 1.0 }],
            ),
            doctrine(
                "levy-system",
                "Levy System",
                DoctrineTheme::Logistics,
                DoctrineTier::Low,
                vec![FreeUnitPerTurn { value: 1 }],
                vec![DisableAutoReinforcements],
            ),
            doctrine(
                "signals-dominance",
                "Signals Dominance",
                DoctrineTheme::IntelligenceGathering,
                DoctrineTier::Medium,
                vec![
                    ReconCostModifier { value: -30.0 },
                    ReconPulseDurationModifier { value: 1 },
                    PermanentEnemyResourceVisibility,
                ],
                vec![ReconArrayUpkeepModifier { value: 50.0 }],
            ),
            doctrine(
                "electronic-masking",
                "Electronic Masking",
                DoctrineTheme::CounterIntelligence,
                DoctrineTier::Low,
                vec![EnemyReconPulseFailureChance { value: 0.25 }, DecoyReconPulse],
                vec![MaxActiveReconArrayLimit { value: 1 }],
            ),
            doctrine(
                "shadow-network",
                "Shadow Network",
                DoctrineTheme::Subterfuge,
                DoctrineTier::Medium,
                vec![
                    InfiltratorEffectivenessModifier { value: 10.0 },
                    InfiltratorDetectionModifier { value: -20.0 },
                    InfiltratorCostModifier { value: -20.0 },
                ],
                vec![FlatQrIncome { value: -5.0 }],
            ),
            doctrine(
                "counter-espionage-purge",
                "Counter-Espionage Purge",
                DoctrineTheme::CounterIntelligence,
                DoctrineTier::Low,
                vec![SuppressionIncrease { value: 1 }, GainMatOnEnemyDeployment { value: 2.0 }],
                vec![DisableNewInfiltrators],
            ),
            doctrine(
                "grand-battery",
                "Grand Battery",
                DoctrineTheme::MilitaryOffense,
                DoctrineTier::Medium,
                vec![
                    ArtilleryDamageModifier { value: 1 },
                    ArtilleryStrikeFortHpDamage { value: 10 },
                    ArtilleryFireCostModifier { value: -20.0 },
                ],
                vec![ArtilleryCostModifier { value: 15.0 }],
            ),
            doctrine(
                "rapid-mobilisation",
                "Rapid Mobilisation",
                DoctrineTheme::StrategicFlexibility,
                DoctrineTier::Low,
                vec![TemporaryActionCostReduction {
                    action_type: ActionKind::DeployUnits,
                    value: 50.0,
                    duration: 3,
                }],
                vec![TemporaryActionCostIncrease {
                    action_type: ActionKind::BuildFortifications,
                    value: 50.0,
                    duration: 3,
                }],
            ),
            doctrine(
                "strategic-garrison",
                "Strategic Garrison",
                DoctrineTheme::TerritorialControl,
                DoctrineTier::High,
                vec![MaxUnitCapacityModifier { value: 10 }, FlatQrIncome { value: 15.0 }],
                vec![MaxControlledNodeTypeLimit {
                    node_type: NodeType::Fortress,
                    max_limit: 2,
                }],
            ),
        ];

        let mut catalog = Self::new();
        for entry in entries {
            catalog.add(entry);
        }
        catalog
    }
}

fn doctrine(
    id: &str,
    name: &str,
    theme: DoctrineTheme,
    tier: DoctrineTier,
    buffs: Vec<DoctrineEffect>,
    nerfs: Vec<DoctrineEffect>,
) -> DoctrineDefinition {
    DoctrineDefinition {
        id: id.to_string(),
        name: name.to_string(),
        theme,
        tier,
        buffs,
        nerfs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::collections::HashSet;

    #[test]
    fn test_builtin_ids_unique() {
        let catalog = DoctrineCatalog::builtin();
        let ids: HashSet<_> = catalog.all().iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids.len(), catalog.len());
        assert!(catalog.len() >= 12);
    }

    #[test]
    fn test_builtin_has_no_unknown_effects() {
        for doctrine in DoctrineCatalog::builtin().all() {
            assert!(!doctrine.buffs.is_empty(), "{} has no buffs", doctrine.id);
            assert!(doctrine.buffs.iter().chain(&doctrine.nerfs).all(|e| !e.is_unknown()));
        }
    }

    #[test]
    fn test_offer_is_distinct_and_seeded() {
        let catalog = DoctrineCatalog::builtin();
        let mut rng_a = ChaCha8Rng::seed_from_u64(7);
        let mut rng_b = ChaCha8Rng::seed_from_u64(7);
        let a = catalog.offer(2, &mut rng_a);
        let b = catalog.offer(2, &mut rng_b);
        assert_eq!(a.len(), 2);
        assert_ne!(a[0].id, a[1].id);
        assert_eq!(a, b);
    }

    #[test]
    fn test_parse_pack_with_unknown_effect() {
        let pack = r#"[{
            "id": "experimental",
            "name": "Experimental",
            "theme": "ECONOMIC",
            "tier": "LOW",
            "buffs": [{"type": "FLAT_MAT_INCOME", "value": 5}, {"type": "TIME_DILATION", "value": 2}],
            "nerfs": []
        }]"#;
        let catalog = DoctrineCatalog::parse_json(pack).unwrap();
        let doctrine = catalog.get("experimental").unwrap();
        assert_eq!(doctrine.buffs.len(), 2);
        assert!(doctrine.buffs[1].is_unknown());
    }

    #[test]
    fn test_tier_costs() {
        assert_eq!(DoctrineTier::Low.influence_cost(), 250.0);
        assert_eq!(DoctrineTier::High.influence_cost(), 1000.0);
    }
}
