//! Doctrine effect engine integration tests

use attrition_grid::actions::{apply_action, Action};
use attrition_grid::combat::resolve_combat_phase;
use attrition_grid::core::config::{DoctrineMode, EngineConfig};
use attrition_grid::core::types::{FactionId, NodeId, Phase};
use attrition_grid::covert::sabotage;
use attrition_grid::doctrine::{adopt_doctrine, apply_effect, DoctrineCatalog, DoctrineEffect, DoctrineModifiers};
use attrition_grid::map::MapType;
use attrition_grid::oracle::ScriptedOracle;
use attrition_grid::state::{GameState, PendingAttack};
use attrition_grid::turn::advance_phase;
use attrition_grid::visibility::intel_snapshot;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde_json::json;

fn lattice() -> GameState {
    GameState::new(MapType::ClassicLattice, EngineConfig::default())
}

fn volgograd() -> GameState {
    GameState::new(MapType::VolgogradCauldron, EngineConfig::default())
}

fn modifiers(state: &mut GameState, faction: FactionId) -> &mut DoctrineModifiers {
    &mut state.faction_mut(faction).unwrap().modifiers
}

fn queue_attack(state: &mut GameState, faction: FactionId, from: &str, to: &str, units: u32) {
    state.node_mut(&NodeId::from(to)).unwrap().pending_attackers.insert(
        faction,
        PendingAttack {
            units,
            from_node_id: NodeId::from(from),
        },
    );
}

fn fight_it_out(state: &mut GameState, seed: u64) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let events = resolve_combat_phase(state, &mut rng);
    state.commit_events(events);
}

fn units_at(state: &GameState, id: &str) -> u32 {
    state.node(&NodeId::from(id)).unwrap().total_units()
}

fn order(state: &mut GameState, faction: FactionId, action: Action) {
    let mut rng = ChaCha8Rng::seed_from_u64(0);
    let events = apply_action(state, faction, &action, &mut rng);
    state.commit_events(events);
}

#[test]
fn test_repeated_effects_accumulate() {
    let mut state = lattice();
    let effect = DoctrineEffect::FlatMatIncome { value: 20.0 };
    let faction = state.factions.get_mut(&FactionId::Axiom).unwrap();
    apply_effect(&mut state.map_nodes, faction, &effect);
    apply_effect(&mut state.map_nodes, faction, &effect);
    assert_eq!(faction.modifiers.flat_mat_income_bonus, 40.0);
}

#[test]
fn test_unknown_effect_changes_nothing() {
    let mut state = lattice();
    let effect = DoctrineEffect::parse(json!({"type": "SUMMON_WEATHER", "value": 3}));
    assert!(effect.is_unknown());

    let before = state.faction(FactionId::GemQ).unwrap().clone();
    let nodes_before = state.map_nodes.clone();
    let faction = state.factions.get_mut(&FactionId::GemQ).unwrap();
    let event = apply_effect(&mut state.map_nodes, faction, &effect);
    assert!(event.is_some());
    assert_eq!(state.faction(FactionId::GemQ).unwrap(), &before);
    assert_eq!(state.map_nodes, nodes_before);
}

#[test]
fn test_adoption_is_recorded() {
    let mut state = lattice();
    let catalog = DoctrineCatalog::builtin();
    let doctrine = catalog.all()[0].clone();
    let faction = state.factions.get_mut(&FactionId::Axiom).unwrap();
    adopt_doctrine(&mut state.map_nodes, faction, &doctrine, 5);
    let adopted = &state.faction(FactionId::Axiom).unwrap().active_doctrines[0];
    assert_eq!(adopted.id, doctrine.id);
    assert_eq!(adopted.adopted_turn, 5);
}

#[tokio::test]
async fn test_doctrine_phase_with_bad_choice_takes_first_offer() {
    let settings = EngineConfig {
        doctrine_mode: DoctrineMode::Anomalous,
        ..Default::default()
    };
    let mut state = GameState::new(MapType::ClassicLattice, settings);
    state.turn = state.settings.doctrine_start_turn();
    state.current_phase = Phase::Resource;

    let catalog = DoctrineCatalog::builtin();
    let mut oracle = ScriptedOracle::new();
    oracle.push_doctrine(FactionId::Axiom, "not-a-doctrine");

    state = advance_phase(&state, &mut oracle, &catalog).await.unwrap();
    assert_eq!(state.current_phase, Phase::Doctrine);
    let offered_to_axiom = state.doctrine_choices_pending[&FactionId::Axiom].clone();
    assert_eq!(offered_to_axiom.len(), 2);
    assert_ne!(offered_to_axiom[0], offered_to_axiom[1]);

    state = advance_phase(&state, &mut oracle, &catalog).await.unwrap();
    assert_eq!(state.current_phase, Phase::ManeuverAxiom);
    assert!(state.doctrine_choices_pending.is_empty());
    for faction in FactionId::PLAYABLE {
        assert_eq!(state.faction(faction).unwrap().active_doctrines.len(), 1);
    }
    assert_eq!(
        state.faction(FactionId::Axiom).unwrap().active_doctrines[0].id,
        offered_to_axiom[0]
    );
}

#[test]
fn test_battle_losses_are_recovered_at_the_source() {
    let mut state = volgograd();
    modifiers(&mut state, FactionId::Axiom).recover_lost_units_after_battle_percentage = 100.0;
    state.node_mut(&NodeId::from("MK")).unwrap().standard_units = 30;
    queue_attack(&mut state, FactionId::Axiom, "WG", "MK", 20);
    fight_it_out(&mut state, 11);

    let report = state.battle_log.last().unwrap().clone();
    assert!(report.attacker_losses > 0, "{:?}", report);
    let came_back = if report.node_captured { 0 } else { report.attacker_units_after };
    assert_eq!(units_at(&state, "WG"), 18 + report.attacker_losses + came_back);
    assert_eq!(state.faction(FactionId::Axiom).unwrap().stats.total_units_lost, 0);
}

#[test]
fn test_capture_applies_new_owner_node_doctrine() {
    let mut state = volgograd();
    let mk = state.node_mut(&NodeId::from("MK")).unwrap();
    mk.standard_units = 0;
    let axiom = modifiers(&mut state, FactionId::Axiom);
    axiom.max_unit_capacity_modifier = 10;
    axiom.max_unit_capacity_non_cn_modifier = -5;
    axiom.fortification_hp_modifier = 3;
    axiom.suppression_increase = 2;
    queue_attack(&mut state, FactionId::Axiom, "WG", "MK", 6);
    fight_it_out(&mut state, 1);

    let mk = state.node(&NodeId::from("MK")).unwrap();
    assert_eq!(mk.owner, FactionId::Axiom);
    assert_eq!(mk.max_units, 55);
    assert_eq!(mk.fortification_hp_modifier, 3);
    assert_eq!(mk.suppression, 2);
}

#[test]
fn test_neutral_capture_reduction_weakens_neutral_dice() {
    let mut state = volgograd();
    modifiers(&mut state, FactionId::Axiom).neutral_node_capture_bonus_reduction = 2;
    queue_attack(&mut state, FactionId::Axiom, "WG", "MK", 10);
    fight_it_out(&mut state, 4);

    let round = &state.battle_log.last().unwrap().rounds[0];
    for (raw, modified) in round.defender_dice_rolls.iter().zip(&round.defender_final_rolls) {
        assert_eq!(*modified, *raw as i32 - 2);
    }
    for (raw, modified) in round.attacker_dice_rolls.iter().zip(&round.attacker_final_rolls) {
        assert_eq!(*modified, *raw as i32);
    }
}

#[test]
fn test_held_recon_array_invites_attack() {
    let mut state = volgograd();
    state.node_mut(&NodeId::from("FBD")).unwrap().owner = FactionId::GemQ;
    modifiers(&mut state, FactionId::GemQ).own_recon_array_enemy_attack_bonus = 2;
    queue_attack(&mut state, FactionId::Axiom, "WG", "FBD", 10);
    fight_it_out(&mut state, 9);

    let round = &state.battle_log.last().unwrap().rounds[0];
    for (raw, modified) in round.attacker_dice_rolls.iter().zip(&round.attacker_final_rolls) {
        assert_eq!(*modified, *raw as i32 + 2);
    }
}

#[test]
fn test_free_move_into_neutral_ground() {
    let attack = Action::AttackNode {
        node_id: NodeId::from("WG"),
        target_node_id: NodeId::from("MK"),
        units: 5,
    };

    let mut paid = volgograd();
    modifiers(&mut paid, FactionId::Axiom).move_units_cost_per_unit_modifier = 2.0;
    order(&mut paid, FactionId::Axiom, attack.clone());
    assert_eq!(paid.faction(FactionId::Axiom).unwrap().materiel, 640.0);

    let mut free = volgograd();
    let axiom = modifiers(&mut free, FactionId::Axiom);
    axiom.move_units_cost_per_unit_modifier = 2.0;
    axiom.free_move_into_neutral_node = true;
    order(&mut free, FactionId::Axiom, attack);
    assert_eq!(free.faction(FactionId::Axiom).unwrap().materiel, 650.0);
    assert_eq!(free.node(&NodeId::from("MK")).unwrap().pending_attackers[&FactionId::Axiom].units, 5);
}

#[test]
fn test_enemy_attrition_bleeds_moves_onto_its_border() {
    let mut state = volgograd();
    state.node_mut(&NodeId::from("NB")).unwrap().owner = FactionId::Axiom;
    modifiers(&mut state, FactionId::GemQ).enemy_unit_attrition_on_move = 2;

    let to_border = Action::MoveUnits {
        node_id: NodeId::from("WG"),
        target_node_id: NodeId::from("NB"),
        units: 5,
    };
    order(&mut state, FactionId::Axiom, to_border);
    assert_eq!(units_at(&state, "NB"), 3);
    assert_eq!(units_at(&state, "WG"), 13);
    assert_eq!(state.faction(FactionId::Axiom).unwrap().stats.total_units_lost, 2);

    let inland = Action::MoveUnits {
        node_id: NodeId::from("WG"),
        target_node_id: NodeId::from("KA"),
        units: 5,
    };
    order(&mut state, FactionId::Axiom, inland);
    assert_eq!(units_at(&state, "KA"), 6);
}

#[test]
fn test_emptying_a_node_needs_doctrine() {
    let strip = Action::MoveUnits {
        node_id: NodeId::from("BA"),
        target_node_id: NodeId::from("WG"),
        units: 1,
    };

    let mut state = volgograd();
    order(&mut state, FactionId::Axiom, strip.clone());
    assert_eq!(units_at(&state, "BA"), 1);
    assert_eq!(units_at(&state, "WG"), 18);

    modifiers(&mut state, FactionId::Axiom).move_units_leave_zero_units = true;
    order(&mut state, FactionId::Axiom, strip);
    assert_eq!(units_at(&state, "BA"), 0);
    assert_eq!(units_at(&state, "WG"), 19);
}

#[test]
fn test_decoy_hides_garrisons_from_pulses() {
    let mut state = volgograd();
    state.faction_mut(FactionId::Axiom).unwrap().recon_pulse_expires_after_turn = Some(state.turn);
    modifiers(&mut state, FactionId::GemQ).decoy_recon_pulse = true;

    let snapshot = intel_snapshot(&state, FactionId::Axiom);
    let cn_e = snapshot.node(&NodeId::from("CN-E")).unwrap();
    assert_eq!(cn_e.owner, Some(FactionId::GemQ));
    assert_eq!(cn_e.standard_units, None);
    assert_eq!(cn_e.fortification_level, None);

    let neutral = snapshot.node(&NodeId::from("OP")).unwrap();
    assert_eq!(neutral.standard_units, Some(5));
}

#[test]
fn test_stockpile_sabotage_drains_any_node() {
    for (targets_stockpile, expected) in [(false, 650.0), (true, 575.0)] {
        let mut state = volgograd();
        let gh = NodeId::from("GH");
        state.node_mut(&gh).unwrap().infiltrators.insert(FactionId::Axiom, 1);
        let axiom = modifiers(&mut state, FactionId::Axiom);
        axiom.infiltrator_effectiveness_modifier = 100.0;
        axiom.sabotage_targets_global_stockpile = targets_stockpile;

        let mut rng = ChaCha8Rng::seed_from_u64(2);
        sabotage(&mut state, FactionId::Axiom, &gh, &mut rng).unwrap();
        assert_eq!(state.faction(FactionId::GemQ).unwrap().materiel, expected);
        assert_eq!(state.node(&gh).unwrap().interdicted_turns, 2);
    }
}

#[test]
fn test_suppressed_nodes_resist_sabotage() {
    for seed in 0..20 {
        let mut state = volgograd();
        let gh = NodeId::from("GH");
        let node = state.node_mut(&gh).unwrap();
        node.infiltrators.insert(FactionId::Axiom, 1);
        node.suppression = 20;

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        sabotage(&mut state, FactionId::Axiom, &gh, &mut rng).unwrap();
        assert_eq!(state.faction(FactionId::Axiom).unwrap().stats.successful_sabotage_attempts, 0);
    }
}

#[test]
fn test_unsupported_effects_degrade_to_unknown() {
    for tag in ["MAT_TO_GLOBAL_STOCKPILE", "TRAIN_INFILTRATOR_INSTANT", "ARTILLERY_SUPPORT_RANGE_MODIFIER"] {
        let effect = DoctrineEffect::parse(json!({"type": tag, "value": 1}));
        assert!(effect.is_unknown(), "{}", tag);
    }
}
