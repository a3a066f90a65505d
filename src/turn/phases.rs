//! Per-phase handlers
//!
//! Each handler mutates the working copy of the state and returns the events
//! it produced. Oracle round trips go through [`consult`], so a slow or
//! failing oracle turns into a fallback plus an ERROR log entry.

use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::actions::{apply_action, Action};
use crate::core::constants::{DOCTRINE_CHOICES_OFFERED, PLAN_HISTORY_LIMIT, REINFORCEMENTS_PER_COMMAND_NODE};
use crate::core::error::{GridError, Result};
use crate::core::types::{FactionId, NodeId, Phase, UnitType};
use crate::covert::expire_pulses;
use crate::doctrine::{adopt_doctrine, expire_temporary_modifiers, DoctrineCatalog, DoctrineDefinition};
use crate::economy::settle_upkeep;
use crate::events::{ActivityKind, CommTarget, GameEvent, LogKind};
use crate::oracle::PlanningOracle;
use crate::state::{GameState, Plan};
use crate::visibility::intel_snapshot;

/// Await an oracle call with a deadline
pub async fn consult<T>(limit: Duration, call: impl Future<Output = Result<T>>) -> Result<T> {
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(GridError::OracleError(format!("no answer within {}s", limit.as_secs()))),
    }
}

/// Request a plan and a communiqué per faction; clear last turn's activity
pub async fn fluctuation<O: PlanningOracle>(state: &mut GameState, oracle: &mut O, limit: Duration) -> Vec<GameEvent> {
    state.node_activity.clear();
    let mut events = Vec::new();

    for faction in FactionId::PLAYABLE {
        let intel = intel_snapshot(state, faction);
        let plan = match consult(limit, oracle.plan(&intel)).await {
            Ok(plan) => plan,
            Err(e) => {
                error!(%faction, error = %e, "Plan request failed, holding");
                events.push(GameEvent::error(Some(faction), format!("Plan unavailable ({}), holding and assessing", e)));
                Plan::fallback(state.turn)
            }
        };
        events.push(GameEvent::log(
            LogKind::AiPlan,
            Some(faction),
            format!("Plan: {} [{}]", plan.objective, plan.operation),
        ));

        if let Some(record) = state.faction_mut(faction) {
            if let Some(previous) = record.current_plan.replace(plan) {
                record.plan_history.push(previous);
                if record.plan_history.len() > PLAN_HISTORY_LIMIT {
                    let excess = record.plan_history.len() - PLAN_HISTORY_LIMIT;
                    record.plan_history.drain(..excess);
                }
            }
        }

        match consult(limit, oracle.communique(&intel)).await {
            Ok(Some(message)) => events.push(GameEvent::Communique {
                sender: faction,
                target: Some(CommTarget::BROADCAST),
                message,
            }),
            Ok(None) => {}
            Err(e) => warn!(%faction, error = %e, "Communique request failed"),
        }
    }
    events
}

/// Finish training orders and grant free units
///
/// On a doctrine turn the offers are drawn here so a human can answer them
/// before the Doctrine phase runs.
pub fn resource(state: &mut GameState, catalog: &DoctrineCatalog, rng: &mut impl Rng) -> Vec<GameEvent> {
    let mut events = Vec::new();

    for node in state.map_nodes.values_mut() {
        let Some(order) = node.training.as_mut() else {
            continue;
        };
        order.turns_remaining = order.turns_remaining.saturating_sub(1);
        if order.turns_remaining > 0 {
            continue;
        }
        let (unit_type, quantity) = (order.unit_type, order.quantity);
        node.training = None;
        if unit_type == UnitType::Veteran {
            let trained = quantity.min(node.standard_units);
            node.standard_units -= trained;
            node.veteran_units += trained;
            events.push(GameEvent::activity(
                &node.id,
                ActivityKind::Training,
                Some(node.owner),
                format!("{} veterans finished training", trained),
            ));
        }
    }

    for faction in FactionId::PLAYABLE {
        let free = state.faction(faction).map_or(0, |f| f.modifiers.free_unit_per_turn);
        if free == 0 {
            continue;
        }
        let Some(cn) = state
            .map_nodes
            .values_mut()
            .find(|n| n.owner == faction && n.is_command_node())
        else {
            continue;
        };
        let granted = free.min(cn.free_capacity());
        if granted > 0 {
            cn.standard_units += granted;
            events.push(GameEvent::activity(
                &cn.id,
                ActivityKind::UnitDeploy,
                Some(faction),
                format!("{} free units mustered", granted),
            ));
        }
    }

    if state.settings.is_doctrine_turn(state.turn) && !catalog.is_empty() {
        for faction in FactionId::PLAYABLE {
            let offered: Vec<String> = catalog
                .offer(DOCTRINE_CHOICES_OFFERED, rng)
                .into_iter()
                .map(|d| d.id)
                .collect();
            events.push(GameEvent::log(
                LogKind::Doctrine,
                Some(faction),
                format!("Doctrines offered: {}", offered.join(", ")),
            ));
            state.doctrine_choices_pending.insert(faction, offered);
        }
    }
    events
}

/// Adopt one of the doctrines offered to `faction`
///
/// Fails without touching the state if no choice is pending or the id was
/// not offered.
pub fn choose_pending_doctrine(
    state: &mut GameState,
    faction: FactionId,
    doctrine_id: &str,
    catalog: &DoctrineCatalog,
) -> Result<Vec<GameEvent>> {
    let offered = state
        .doctrine_choices_pending
        .get(&faction)
        .ok_or_else(|| GridError::BadRequest(format!("no doctrine choice pending for {}", faction)))?;
    if !offered.iter().any(|id| id == doctrine_id) {
        return Err(GridError::BadRequest(format!(
            "doctrine '{}' was not offered to {}",
            doctrine_id, faction
        )));
    }
    let doctrine = catalog
        .get(doctrine_id)
        .ok_or_else(|| GridError::BadRequest(format!("unknown doctrine '{}'", doctrine_id)))?;
    let record = state
        .factions
        .get_mut(&faction)
        .ok_or_else(|| GridError::BadRequest(format!("unknown faction {}", faction)))?;

    let events = adopt_doctrine(&mut state.map_nodes, record, doctrine, state.turn);
    state.doctrine_choices_pending.remove(&faction);
    info!(%faction, doctrine = %doctrine.id, "Doctrine adopted");
    Ok(events)
}

/// Settle every doctrine choice still pending
pub async fn doctrine<O: PlanningOracle>(
    state: &mut GameState,
    oracle: &mut O,
    catalog: &DoctrineCatalog,
    limit: Duration,
) -> Vec<GameEvent> {
    let mut events = Vec::new();
    let pending: Vec<(FactionId, Vec<String>)> = state
        .doctrine_choices_pending
        .iter()
        .map(|(f, ids)| (*f, ids.clone()))
        .collect();
    if pending.is_empty() {
        events.push(GameEvent::log(LogKind::Doctrine, None, "No doctrine choices pending."));
    }

    for (faction, offered_ids) in pending {
        let offered: Vec<DoctrineDefinition> = offered_ids.iter().filter_map(|id| catalog.get(id)).cloned().collect();
        let Some(first) = offered.first().map(|d| d.id.clone()) else {
            state.doctrine_choices_pending.remove(&faction);
            continue;
        };
        let intel = intel_snapshot(state, faction);
        let choice = match consult(limit, oracle.choose_doctrine(&intel, &offered)).await {
            Ok(id) if offered_ids.contains(&id) => id,
            Ok(id) => {
                events.push(GameEvent::error(
                    Some(faction),
                    format!("Doctrine '{}' was not offered, taking {}", id, first),
                ));
                first
            }
            Err(e) => {
                error!(%faction, error = %e, "Doctrine choice failed, taking first offer");
                events.push(GameEvent::error(Some(faction), format!("Doctrine choice unavailable ({}), taking {}", e, first)));
                first
            }
        };
        match choose_pending_doctrine(state, faction, &choice, catalog) {
            Ok(adopted) => events.extend(adopted),
            Err(e) => events.push(GameEvent::error(Some(faction), e.to_string())),
        }
    }
    events
}

/// Ask `faction` for its order and apply it
pub async fn maneuver<O: PlanningOracle>(
    state: &mut GameState,
    faction: FactionId,
    oracle: &mut O,
    rng: &mut impl Rng,
    limit: Duration,
) -> Vec<GameEvent> {
    let mut events = Vec::new();
    let intel = intel_snapshot(state, faction);
    let action = match consult(limit, oracle.choose_action(&intel, state.current_phase)).await {
        Ok(action) => action,
        Err(e) => {
            error!(%faction, error = %e, "Order request failed, holding position");
            events.push(GameEvent::error(Some(faction), format!("Order unavailable ({}), holding position", e)));
            Action::HoldPosition
        }
    };
    debug!(%faction, action = ?action, "Order received");
    events.extend(apply_action(state, faction, &action, rng));
    events
}

/// Optional fortification order, then automatic reinforcement
pub async fn fortify<O: PlanningOracle>(
    state: &mut GameState,
    faction: FactionId,
    oracle: &mut O,
    rng: &mut impl Rng,
    limit: Duration,
) -> Vec<GameEvent> {
    let mut events = Vec::new();
    let intel = intel_snapshot(state, faction);
    match consult(limit, oracle.choose_action(&intel, state.current_phase)).await {
        Ok(action @ Action::BuildFortifications { .. }) => events.extend(apply_action(state, faction, &action, rng)),
        Ok(Action::HoldPosition) => {}
        Ok(other) => events.push(GameEvent::log(
            LogKind::Info,
            Some(faction),
            format!("{:?} ignored during fortification", other.kind()),
        )),
        Err(e) => {
            error!(%faction, error = %e, "Fortification order failed");
            events.push(GameEvent::error(Some(faction), format!("Fortification order unavailable ({})", e)));
        }
    }
    events.extend(reinforce(state, faction));
    events
}

fn reinforce(state: &mut GameState, faction: FactionId) -> Vec<GameEvent> {
    let Some(record) = state.factions.get_mut(&faction) else {
        return Vec::new();
    };
    if record.modifiers.disable_auto_reinforcements {
        return Vec::new();
    }
    let per_node = (REINFORCEMENTS_PER_COMMAND_NODE as i32 + record.modifiers.auto_reinforcement_rate_modifier).max(0) as u32;
    let to_reserve = record.modifiers.overflow_reinforcements_to_reserve_pool;

    let mut events = Vec::new();
    let command_nodes: Vec<NodeId> = state
        .map_nodes
        .values()
        .filter(|n| n.owner == faction && n.is_command_node())
        .map(|n| n.id.clone())
        .collect();
    for node_id in command_nodes {
        let Some(node) = state.map_nodes.get_mut(&node_id) else {
            continue;
        };
        let available = per_node + if to_reserve { record.reserve_units } else { 0 };
        let placed = available.min(node.free_capacity());
        node.standard_units += placed;
        if to_reserve {
            record.reserve_units = available - placed;
        }
        if placed > 0 {
            events.push(GameEvent::activity(
                &node_id,
                ActivityKind::UnitDeploy,
                Some(faction),
                format!("{} reinforcements arrived", placed),
            ));
        }
    }
    events
}

/// Settle the economy and roll every counter over to the next turn
pub fn upkeep(state: &mut GameState) -> Vec<GameEvent> {
    let mut events = settle_upkeep(state);

    for node in state.map_nodes.values_mut() {
        node.interdicted_turns = node.interdicted_turns.saturating_sub(1);
    }
    let turn = state.turn;
    for record in state.factions.values_mut() {
        events.extend(expire_temporary_modifiers(record));
        if record.has_active_pulse(turn) {
            record.stats.intel_advantage_turns += 1;
        }
        record.stats.current_turn_units_deployed = 0;
        record.stats.current_turn_units_lost = 0;
    }
    expire_pulses(state, turn + 1);
    state.recompute_stats();
    events
}

/// Phase that follows `phase`; `doctrine_turn` opens the doctrine window after Resource
pub fn next_phase(phase: Phase, doctrine_turn: bool) -> Phase {
    match phase {
        Phase::Fluctuation => Phase::Resource,
        Phase::Resource if doctrine_turn => Phase::Doctrine,
        // The doctrine window always closes into the first maneuver phase
        Phase::Resource | Phase::Doctrine => Phase::ManeuverAxiom,
        Phase::ManeuverAxiom => Phase::ManeuverGemq,
        Phase::ManeuverGemq => Phase::Combat,
        Phase::Combat => Phase::FortifyAxiom,
        Phase::FortifyAxiom => Phase::FortifyGemq,
        Phase::FortifyGemq => Phase::Upkeep,
        Phase::Upkeep => Phase::Fluctuation,
        Phase::GameOver => Phase::GameOver,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::EngineConfig;
    use crate::map::MapType;
    use crate::oracle::ScriptedOracle;
    use crate::state::TrainingOrder;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn game() -> GameState {
        GameState::new(MapType::VolgogradCauldron, EngineConfig::default())
    }

    #[test]
    fn test_phase_order() {
        assert_eq!(next_phase(Phase::Resource, false), Phase::ManeuverAxiom);
        assert_eq!(next_phase(Phase::Resource, true), Phase::Doctrine);
        assert_eq!(next_phase(Phase::Doctrine, true), Phase::ManeuverAxiom);
        assert_eq!(next_phase(Phase::Upkeep, false), Phase::Fluctuation);
    }

    #[test]
    fn test_training_completes() {
        let mut state = game();
        let ns = NodeId::from("NS");
        {
            let node = state.node_mut(&ns).unwrap();
            node.training = Some(TrainingOrder {
                unit_type: UnitType::Veteran,
                quantity: 4,
                turns_remaining: 2,
            });
        }
        let catalog = DoctrineCatalog::builtin();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let before = state.node(&ns).unwrap().standard_units;

        resource(&mut state, &catalog, &mut rng);
        assert_eq!(state.node(&ns).unwrap().veteran_units, 0);
        resource(&mut state, &catalog, &mut rng);
        let node = state.node(&ns).unwrap();
        assert!(node.training.is_none());
        assert_eq!(node.veteran_units, 4);
        assert_eq!(node.standard_units, before - 4);
    }

    #[test]
    fn test_reinforcement_overflow_to_reserve() {
        let mut state = game();
        let cn = NodeId::from("CN-W");
        let capacity = state.node(&cn).unwrap().max_units;
        {
            let node = state.node_mut(&cn).unwrap();
            node.standard_units = capacity - 1;
            node.veteran_units = 0;
        }
        state
            .faction_mut(FactionId::Axiom)
            .unwrap()
            .modifiers
            .overflow_reinforcements_to_reserve_pool = true;

        reinforce(&mut state, FactionId::Axiom);
        assert_eq!(state.node(&cn).unwrap().total_units(), capacity);
        assert_eq!(state.faction(FactionId::Axiom).unwrap().reserve_units, 1);
    }

    #[test]
    fn test_disabled_reinforcements() {
        let mut state = game();
        state
            .faction_mut(FactionId::GemQ)
            .unwrap()
            .modifiers
            .disable_auto_reinforcements = true;
        let before = state.node(&NodeId::from("CN-E")).unwrap().standard_units;
        assert!(reinforce(&mut state, FactionId::GemQ).is_empty());
        assert_eq!(state.node(&NodeId::from("CN-E")).unwrap().standard_units, before);
    }

    #[tokio::test]
    async fn test_failed_plan_falls_back() {
        let mut state = game();
        let mut oracle = ScriptedOracle::new();
        oracle.push_plan_error(FactionId::Axiom, "connection refused");
        let events = fluctuation(&mut state, &mut oracle, Duration::from_secs(1)).await;

        let axiom = state.faction(FactionId::Axiom).unwrap();
        assert_eq!(axiom.current_plan.as_ref().unwrap().objective, "hold and assess");
        assert!(events.iter().any(|e| matches!(e, GameEvent::Log { kind: LogKind::Error, .. })));
    }

    #[test]
    fn test_choose_unoffered_doctrine_is_rejected() {
        let mut state = game();
        let catalog = DoctrineCatalog::builtin();
        let offered: Vec<String> = catalog.all().iter().take(2).map(|d| d.id.clone()).collect();
        let other = catalog.all()[2].id.clone();
        state.doctrine_choices_pending.insert(FactionId::Axiom, offered.clone());

        assert!(choose_pending_doctrine(&mut state, FactionId::Axiom, &other, &catalog).is_err());
        assert!(choose_pending_doctrine(&mut state, FactionId::GemQ, &offered[0], &catalog).is_err());
        choose_pending_doctrine(&mut state, FactionId::Axiom, &offered[1], &catalog).unwrap();
        assert!(state.doctrine_choices_pending.is_empty());
        assert_eq!(state.faction(FactionId::Axiom).unwrap().active_doctrines[0].id, offered[1]);
    }
}
