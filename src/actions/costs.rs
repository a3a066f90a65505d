//! Effective action costs after doctrine modifiers
//!
//! A cost is the rule constant scaled by the action's doctrine cost modifier
//! and any running temporary modifiers on the same action, never below zero.
//! Influence (QR) prices are not touched by doctrine.

use crate::actions::ActionKind;
use crate::core::constants::{
    ARTILLERY_COST_INFLUENCE, ARTILLERY_COST_MATERIEL, ARTILLERY_MOVE_COST_PER_PIECE, ARTILLERY_STRIKE_AMMO_COST,
    FORT_REPAIR_COST_PER_HP, FORT_UPGRADE_COST, INFILTRATOR_COST, RECON_ACTIVATION_COST_INFLUENCE,
    RECON_ACTIVATION_COST_MATERIEL, RECON_PULSE_COST_INFLUENCE, RECON_PULSE_COST_MATERIEL, UNIT_DEPLOY_COST,
    VETERAN_TRAINING_COST_PER_UNIT,
};
use crate::doctrine::modifiers::{apply_percentage, DoctrineModifiers};

/// A price in both pools
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Cost {
    pub influence: f64,
    pub materiel: f64,
}

impl Cost {
    pub fn materiel(materiel: f64) -> Self {
        Self {
            influence: 0.0,
            materiel,
        }
    }
}

/// Doctrine percentage that applies to an action's MAT price
fn doctrine_percentage(modifiers: &DoctrineModifiers, kind: ActionKind) -> f64 {
    match kind {
        ActionKind::DeployUnits => modifiers.unit_deploy_cost_modifier,
        ActionKind::BuildFortifications => modifiers.fortification_cost_modifier,
        ActionKind::PurchaseArtillery | ActionKind::MoveArtillery => modifiers.artillery_cost_modifier,
        ActionKind::ArtilleryStrike => modifiers.artillery_fire_cost_modifier,
        ActionKind::TrainInfiltrator => modifiers.infiltrator_cost_modifier,
        ActionKind::ActivateReconArray | ActionKind::PerformReconPulse => modifiers.recon_cost_modifier,
        _ => 0.0,
    }
}

/// Scale a base MAT price for `kind`
pub fn materiel_cost(modifiers: &DoctrineModifiers, kind: ActionKind, base: f64) -> f64 {
    let percent = doctrine_percentage(modifiers, kind) + modifiers.temporary_cost_percentage(kind);
    apply_percentage(base, percent)
}

pub fn unit_deploy_cost(modifiers: &DoctrineModifiers) -> f64 {
    materiel_cost(modifiers, ActionKind::DeployUnits, UNIT_DEPLOY_COST)
}

pub fn fort_repair_cost_per_hp(modifiers: &DoctrineModifiers) -> f64 {
    materiel_cost(modifiers, ActionKind::BuildFortifications, FORT_REPAIR_COST_PER_HP)
}

pub fn fort_upgrade_cost(modifiers: &DoctrineModifiers) -> f64 {
    materiel_cost(modifiers, ActionKind::BuildFortifications, FORT_UPGRADE_COST)
}

/// Price of one artillery piece
pub fn artillery_purchase_cost(modifiers: &DoctrineModifiers) -> Cost {
    Cost {
        influence: ARTILLERY_COST_INFLUENCE,
        materiel: materiel_cost(modifiers, ActionKind::PurchaseArtillery, ARTILLERY_COST_MATERIEL),
    }
}

pub fn artillery_move_cost(modifiers: &DoctrineModifiers, pieces: u32) -> f64 {
    materiel_cost(
        modifiers,
        ActionKind::MoveArtillery,
        ARTILLERY_MOVE_COST_PER_PIECE * pieces as f64,
    )
}

pub fn artillery_strike_cost(modifiers: &DoctrineModifiers) -> f64 {
    materiel_cost(modifiers, ActionKind::ArtilleryStrike, ARTILLERY_STRIKE_AMMO_COST)
}

pub fn infiltrator_cost(modifiers: &DoctrineModifiers) -> f64 {
    materiel_cost(modifiers, ActionKind::TrainInfiltrator, INFILTRATOR_COST)
}

pub fn recon_activation_cost(modifiers: &DoctrineModifiers) -> Cost {
    Cost {
        influence: RECON_ACTIVATION_COST_INFLUENCE,
        materiel: materiel_cost(modifiers, ActionKind::ActivateReconArray, RECON_ACTIVATION_COST_MATERIEL),
    }
}

pub fn recon_pulse_cost(modifiers: &DoctrineModifiers) -> Cost {
    Cost {
        influence: RECON_PULSE_COST_INFLUENCE,
        materiel: materiel_cost(modifiers, ActionKind::PerformReconPulse, RECON_PULSE_COST_MATERIEL),
    }
}

pub fn veteran_training_cost(modifiers: &DoctrineModifiers, quantity: u32) -> f64 {
    materiel_cost(
        modifiers,
        ActionKind::TrainVeterans,
        VETERAN_TRAINING_COST_PER_UNIT * quantity as f64,
    )
}

/// Moves are free unless a doctrine prices them
///
/// Flat and per-unit surcharges add up; a move out of a command node also
/// pays the command-node surcharge.
pub fn unit_move_cost(modifiers: &DoctrineModifiers, kind: ActionKind, units: u32, from_command_node: bool) -> f64 {
    let mut base = modifiers.move_units_cost_modifier + modifiers.move_units_cost_per_unit_modifier * units as f64;
    if from_command_node {
        base += modifiers.move_units_cn_cost_modifier;
    }
    materiel_cost(modifiers, kind, base.max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doctrine::modifiers::{CostModifierKind, TemporaryCostModifier};

    #[test]
    fn test_base_prices() {
        let modifiers = DoctrineModifiers::default();
        assert_eq!(unit_deploy_cost(&modifiers), 15.0);
        assert_eq!(fort_upgrade_cost(&modifiers), 25.0);
        assert_eq!(artillery_purchase_cost(&modifiers), Cost { influence: 30.0, materiel: 100.0 });
        assert_eq!(unit_move_cost(&modifiers, ActionKind::MoveUnits, 10, true), 0.0);
        assert_eq!(veteran_training_cost(&modifiers, 3), 30.0);
    }

    #[test]
    fn test_doctrine_and_temporary_modifiers_stack() {
        let mut modifiers = DoctrineModifiers {
            unit_deploy_cost_modifier: -20.0,
            ..Default::default()
        };
        modifiers.temporary_action_cost_modifiers.push(TemporaryCostModifier {
            action_type: ActionKind::DeployUnits,
            value: 30.0,
            turns_remaining: 1,
            modifier_type: CostModifierKind::PercentageDecrease,
        });
        assert_eq!(unit_deploy_cost(&modifiers), 7.5);
        assert_eq!(infiltrator_cost(&modifiers), 75.0);
    }

    #[test]
    fn test_cost_never_negative() {
        let modifiers = DoctrineModifiers {
            artillery_fire_cost_modifier: -250.0,
            ..Default::default()
        };
        assert_eq!(artillery_strike_cost(&modifiers), 0.0);
    }

    #[test]
    fn test_move_surcharges() {
        let modifiers = DoctrineModifiers {
            move_units_cost_modifier: 5.0,
            move_units_cost_per_unit_modifier: 0.5,
            move_units_cn_cost_modifier: 10.0,
            ..Default::default()
        };
        assert_eq!(unit_move_cost(&modifiers, ActionKind::MoveUnits, 4, false), 7.0);
        assert_eq!(unit_move_cost(&modifiers, ActionKind::MoveUnits, 4, true), 17.0);
    }
}
