//! End-of-game detection

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core::types::{FactionId, Phase};
use crate::events::{GameEvent, LogKind};
use crate::state::GameState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VictoryReason {
    /// The loser holds no command node
    CommandNetworkDestroyed,
    /// Both sides survived past the turn limit
    TurnLimit,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameOutcome {
    /// `None` for a draw
    pub winner: Option<FactionId>,
    pub reason: VictoryReason,
    pub turn: u32,
}

fn holds_command_node(state: &GameState, faction: FactionId) -> bool {
    state
        .map_nodes
        .values()
        .any(|n| n.owner == faction && n.is_command_node())
}

/// Decide whether the game has ended, without changing anything
pub fn evaluate(state: &GameState) -> Option<GameOutcome> {
    let alive: Vec<FactionId> = FactionId::PLAYABLE
        .into_iter()
        .filter(|&f| holds_command_node(state, f))
        .collect();

    match alive.as_slice() {
        [winner] => Some(GameOutcome {
            winner: Some(*winner),
            reason: VictoryReason::CommandNetworkDestroyed,
            turn: state.turn,
        }),
        [] => Some(GameOutcome {
            winner: None,
            reason: VictoryReason::CommandNetworkDestroyed,
            turn: state.turn,
        }),
        _ if state.turn > state.settings.max_turns => Some(GameOutcome {
            winner: None,
            reason: VictoryReason::TurnLimit,
            turn: state.turn,
        }),
        _ => None,
    }
}

/// Move the game to GAME_OVER if it has ended
///
/// Called by the service after the Combat and Upkeep phases.
pub fn check_game_over(state: &mut GameState) -> Option<GameOutcome> {
    if state.is_game_over() {
        return state.outcome.clone();
    }
    let outcome = evaluate(state)?;
    let message = match outcome.winner {
        Some(winner) => format!("{} wins: enemy command network destroyed", winner),
        None => match outcome.reason {
            VictoryReason::TurnLimit => "Draw: turn limit reached".to_string(),
            VictoryReason::CommandNetworkDestroyed => "Draw: both command networks destroyed".to_string(),
        },
    };
    info!(winner = ?outcome.winner, reason = ?outcome.reason, "Game over");
    state.current_phase = Phase::GameOver;
    state.active_maneuvering_faction = None;
    state.outcome = Some(outcome.clone());
    state.commit_events(vec![GameEvent::log(LogKind::PhaseTransition, None, message)]);
    Some(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::EngineConfig;
    use crate::core::types::NodeId;
    use crate::map::MapType;

    fn game() -> GameState {
        GameState::new(MapType::VolgogradCauldron, EngineConfig::default())
    }

    #[test]
    fn test_ongoing_game() {
        let mut state = game();
        assert_eq!(check_game_over(&mut state), None);
        assert_eq!(state.current_phase, Phase::Fluctuation);
    }

    #[test]
    fn test_command_node_loss_ends_game() {
        let mut state = game();
        state.node_mut(&NodeId::from("CN-E")).unwrap().owner = FactionId::Axiom;
        let outcome = check_game_over(&mut state).unwrap();
        assert_eq!(outcome.winner, Some(FactionId::Axiom));
        assert!(state.is_game_over());
    }

    #[test]
    fn test_turn_limit_is_a_draw() {
        let mut state = game();
        state.turn = state.settings.max_turns + 1;
        let outcome = check_game_over(&mut state).unwrap();
        assert_eq!(outcome.winner, None);
        assert_eq!(outcome.reason, VictoryReason::TurnLimit);
    }
}
