//! Turn orchestration: one phase transition per call
//!
//! [`advance_phase`] works on a copy of the state and only hands it back once
//! the whole phase has run, so a caller never sees a half-applied phase.

pub mod phases;

pub use phases::{choose_pending_doctrine, consult, next_phase};

use std::time::Duration;
use tracing::info;

use crate::combat::resolve_combat_phase;
use crate::core::error::{GridError, Result};
use crate::core::types::Phase;
use crate::doctrine::DoctrineCatalog;
use crate::events::{GameEvent, LogKind};
use crate::oracle::PlanningOracle;
use crate::state::GameState;

/// Run the current phase and move to the next one
///
/// The Upkeep phase rolls the turn counter. Game-over detection is left to
/// the caller (see [`crate::victory::check_game_over`]).
pub async fn advance_phase<O: PlanningOracle>(
    state: &GameState,
    oracle: &mut O,
    catalog: &DoctrineCatalog,
) -> Result<GameState> {
    if state.is_game_over() {
        return Err(GridError::InvalidPhase(Phase::GameOver));
    }

    let mut next = state.clone();
    let mut rng = next.phase_rng();
    let limit = Duration::from_secs(next.settings.oracle.timeout_secs);
    let phase = next.current_phase;

    let events = match phase {
        Phase::Fluctuation => phases::fluctuation(&mut next, oracle, limit).await,
        Phase::Resource => phases::resource(&mut next, catalog, &mut rng),
        Phase::Doctrine => phases::doctrine(&mut next, oracle, catalog, limit).await,
        Phase::ManeuverAxiom | Phase::ManeuverGemq => match phase.acting_faction() {
            Some(faction) => phases::maneuver(&mut next, faction, oracle, &mut rng, limit).await,
            None => Vec::new(),
        },
        Phase::Combat => resolve_combat_phase(&mut next, &mut rng),
        Phase::FortifyAxiom | Phase::FortifyGemq => match phase.acting_faction() {
            Some(faction) => phases::fortify(&mut next, faction, oracle, &mut rng, limit).await,
            None => Vec::new(),
        },
        Phase::Upkeep => phases::upkeep(&mut next),
        Phase::GameOver => Vec::new(),
    };
    next.commit_events(events);

    let following = next_phase(phase, !next.doctrine_choices_pending.is_empty());
    if following == Phase::Fluctuation {
        next.turn += 1;
    }
    next.current_phase = following;
    next.active_maneuvering_faction = match following {
        Phase::ManeuverAxiom | Phase::ManeuverGemq => following.acting_faction(),
        _ => None,
    };

    info!(turn = next.turn, from = ?phase, to = ?following, "Phase advanced");
    next.commit_events(vec![GameEvent::log(
        LogKind::PhaseTransition,
        None,
        format!("Turn {}: {:?} -> {:?}", next.turn, phase, following),
    )]);
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::EngineConfig;
    use crate::map::MapType;
    use crate::oracle::HoldOracle;

    #[tokio::test]
    async fn test_full_turn_cycle() {
        let mut state = GameState::new(MapType::ClassicLattice, EngineConfig::default());
        let catalog = DoctrineCatalog::builtin();
        let mut oracle = HoldOracle;
        let expected = [
            Phase::Resource,
            Phase::ManeuverAxiom,
            Phase::ManeuverGemq,
            Phase::Combat,
            Phase::FortifyAxiom,
            Phase::FortifyGemq,
            Phase::Upkeep,
            Phase::Fluctuation,
        ];
        for phase in expected {
            state = advance_phase(&state, &mut oracle, &catalog).await.unwrap();
            assert_eq!(state.current_phase, phase);
        }
        assert_eq!(state.turn, 2);
        assert!(state.system_log.iter().any(|e| e.kind == LogKind::PhaseTransition));
    }

    #[tokio::test]
    async fn test_maneuver_sets_active_faction() {
        let mut state = GameState::new(MapType::ClassicLattice, EngineConfig::default());
        let catalog = DoctrineCatalog::builtin();
        let mut oracle = HoldOracle;
        state = advance_phase(&state, &mut oracle, &catalog).await.unwrap();
        state = advance_phase(&state, &mut oracle, &catalog).await.unwrap();
        assert_eq!(state.active_maneuvering_faction, Some(crate::core::types::FactionId::Axiom));
    }

    #[tokio::test]
    async fn test_game_over_is_terminal() {
        let mut state = GameState::new(MapType::ClassicLattice, EngineConfig::default());
        state.current_phase = Phase::GameOver;
        let result = advance_phase(&state, &mut HoldOracle, &DoctrineCatalog::builtin()).await;
        assert!(matches!(result, Err(GridError::InvalidPhase(Phase::GameOver))));
    }
}
