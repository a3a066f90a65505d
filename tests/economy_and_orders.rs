//! Economy, order validation and recon integration tests

use attrition_grid::actions::{apply_action, Action};
use attrition_grid::core::config::EngineConfig;
use attrition_grid::core::types::{FactionId, NodeId, Phase};
use attrition_grid::covert::{activate_recon_array, perform_recon_pulse};
use attrition_grid::doctrine::DoctrineCatalog;
use attrition_grid::economy::settle_upkeep;
use attrition_grid::fortification::fortify;
use attrition_grid::map::MapType;
use attrition_grid::oracle::HoldOracle;
use attrition_grid::state::GameState;
use attrition_grid::turn::advance_phase;
use attrition_grid::visibility::intel_snapshot;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn volgograd() -> GameState {
    GameState::new(MapType::VolgogradCauldron, EngineConfig::default())
}

#[test]
fn test_debt_is_not_clamped() {
    let mut state = volgograd();
    for node in state.map_nodes.values_mut() {
        if node.owner == FactionId::Axiom {
            node.materiel_output = 0.0;
        }
    }
    state.faction_mut(FactionId::Axiom).unwrap().materiel = -50.0;

    settle_upkeep(&mut state);
    let axiom = state.faction(FactionId::Axiom).unwrap();
    assert!(axiom.materiel < -50.0, "materiel was {}", axiom.materiel);
    assert!(axiom.influence > 100.0);
}

#[test]
fn test_unaffordable_deploy_is_a_logged_no_op() {
    let mut state = volgograd();
    state.faction_mut(FactionId::Axiom).unwrap().materiel = 10.0;
    let before = state.map_nodes.clone();
    let mut rng = ChaCha8Rng::seed_from_u64(1);

    let action = Action::DeployUnits {
        node_id: NodeId::from("CN-W"),
        quantity: 1,
    };
    let events = apply_action(&mut state, FactionId::Axiom, &action, &mut rng);
    assert_eq!(events.len(), 1);
    assert!(events[0].is_rejection());
    assert_eq!(state.map_nodes, before);
    assert_eq!(state.faction(FactionId::Axiom).unwrap().materiel, 10.0);

    state.commit_events(events);
    assert!(state.system_log.last().unwrap().message.starts_with("Action failed"));
}

#[test]
fn test_damaged_work_is_repaired_before_upgrade() {
    let mut state = volgograd();
    let cn = NodeId::from("CN-W");
    {
        let node = state.node_mut(&cn).unwrap();
        node.set_fortification_level(2);
        node.fortification_hp = 120;
    }

    fortify(&mut state, FactionId::Axiom, &cn).unwrap();
    let node = state.node(&cn).unwrap();
    assert_eq!(node.fortification_level, 2);
    assert_eq!(node.fortification_hp, 200);
    assert_eq!(state.faction(FactionId::Axiom).unwrap().materiel, 630.0);

    fortify(&mut state, FactionId::Axiom, &cn).unwrap();
    let node = state.node(&cn).unwrap();
    assert_eq!(node.fortification_level, 3);
    assert_eq!(node.fortification_hp, 300);
}

#[test]
fn test_attack_order_queues_and_spends_units() {
    let mut state = volgograd();
    let wg = NodeId::from("WG");
    let target = state.node(&wg).unwrap().connections
        .iter()
        .find(|id| state.node(id).is_some_and(|n| n.owner != FactionId::Axiom))
        .cloned()
        .unwrap();
    let before = state.node(&wg).unwrap().standard_units;
    let mut rng = ChaCha8Rng::seed_from_u64(1);

    let action = Action::AttackNode {
        node_id: wg.clone(),
        target_node_id: target.clone(),
        units: 5,
    };
    let events = apply_action(&mut state, FactionId::Axiom, &action, &mut rng);
    assert!(!events.iter().any(|e| e.is_rejection()));
    assert_eq!(state.node(&wg).unwrap().standard_units, before - 5);
    let pending = &state.node(&target).unwrap().pending_attackers[&FactionId::Axiom];
    assert_eq!(pending.units, 5);
    assert_eq!(pending.from_node_id, wg);
}

#[tokio::test]
async fn test_recon_pulse_lasts_one_turn() {
    let mut state = volgograd();
    let array = NodeId::from("FBD");
    state.node_mut(&array).unwrap().owner = FactionId::Axiom;
    activate_recon_array(&mut state, FactionId::Axiom, &array).unwrap();
    state.faction_mut(FactionId::Axiom).unwrap().influence = 100.0;
    let mut rng = ChaCha8Rng::seed_from_u64(2);
    perform_recon_pulse(&mut state, FactionId::Axiom, &array, &mut rng).unwrap();

    let seen = intel_snapshot(&state, FactionId::Axiom);
    assert!(seen.visible_node_ids.contains(&NodeId::from("CN-E")));

    state.current_phase = Phase::Upkeep;
    let next = advance_phase(&state, &mut HoldOracle, &DoctrineCatalog::builtin())
        .await
        .unwrap();
    assert_eq!(next.turn, 2);
    assert_eq!(next.faction(FactionId::Axiom).unwrap().recon_pulse_expires_after_turn, None);
    let seen = intel_snapshot(&next, FactionId::Axiom);
    assert!(!seen.visible_node_ids.contains(&NodeId::from("CN-E")));
}
