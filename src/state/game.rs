//! Root aggregate
//!
//! One `GameState` per running game. Engines work on a clone and hand back
//! events; only the turn orchestrator commits a new version.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;
use uuid::Uuid;

use crate::combat::BattleReport;
use crate::core::config::EngineConfig;
use crate::core::constants::COMM_LOG_LIMIT;
use crate::core::types::{FactionId, NodeId, Phase};
use crate::events::{CommLogEntry, CommTarget, GameEvent, LogKind, NodeActivityEntry, SystemLogEntry};
use crate::map::graph::NodeMap;
use crate::map::templates::{build_nodes, MapType};
use crate::state::{Faction, Node};
use crate::victory::GameOutcome;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub game_id: Uuid,
    pub map_type: MapType,
    pub turn: u32,
    pub current_phase: Phase,
    pub active_maneuvering_faction: Option<FactionId>,

    pub map_nodes: NodeMap,
    pub factions: BTreeMap<FactionId, Faction>,

    // === LOGS (append-only) ===
    pub battle_log: Vec<BattleReport>,
    pub system_log: Vec<SystemLogEntry>,
    /// Activity since the last Fluctuation phase
    pub node_activity: Vec<NodeActivityEntry>,
    /// Last `COMM_LOG_LIMIT` communiqués and directives
    pub comm_log: Vec<CommLogEntry>,

    /// Doctrine ids offered to each faction and not yet decided
    pub doctrine_choices_pending: BTreeMap<FactionId, Vec<String>>,

    pub settings: EngineConfig,
    pub outcome: Option<GameOutcome>,
    next_log_id: u64,
}

impl GameState {
    /// Fresh game on a built-in map, starting at turn 1 Fluctuation
    pub fn new(map_type: MapType, settings: EngineConfig) -> Self {
        let map_nodes = build_nodes(map_type, settings.fog_of_war);
        let factions = FactionId::PLAYABLE
            .into_iter()
            .map(|id| (id, Faction::new(id)))
            .collect();

        let mut state = Self {
            game_id: Uuid::new_v4(),
            map_type,
            turn: 1,
            current_phase: Phase::Fluctuation,
            active_maneuvering_faction: None,
            map_nodes,
            factions,
            battle_log: Vec::new(),
            system_log: Vec::new(),
            node_activity: Vec::new(),
            comm_log: Vec::new(),
            doctrine_choices_pending: BTreeMap::new(),
            settings,
            outcome: None,
            next_log_id: 1,
        };
        state.recompute_stats();
        state.commit_events(vec![GameEvent::log(
            LogKind::Info,
            None,
            format!("New game on {}", map_type.display_name()),
        )]);
        state
    }

    pub fn faction(&self, id: FactionId) -> Option<&Faction> {
        self.factions.get(&id)
    }

    pub fn faction_mut(&mut self, id: FactionId) -> Option<&mut Faction> {
        self.factions.get_mut(&id)
    }

    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.map_nodes.get(id)
    }

    pub fn node_mut(&mut self, id: &NodeId) -> Option<&mut Node> {
        self.map_nodes.get_mut(id)
    }

    pub fn is_game_over(&self) -> bool {
        self.current_phase == Phase::GameOver
    }

    /// RNG for the current phase
    ///
    /// Derived from the game seed, turn and phase so a replay with the same
    /// seed and inputs rolls the same dice.
    pub fn phase_rng(&self) -> ChaCha8Rng {
        let phase = self.current_phase as u64;
        let seed = self
            .settings
            .seed
            .wrapping_mul(0x9E37_79B9_7F4A_7C15)
            .wrapping_add(((self.turn as u64) << 8) | phase);
        ChaCha8Rng::seed_from_u64(seed)
    }

    fn take_log_id(&mut self) -> u64 {
        let id = self.next_log_id;
        self.next_log_id += 1;
        id
    }

    /// Append a communiqué, dropping the oldest past the limit
    pub fn push_comm(&mut self, sender: FactionId, target: Option<CommTarget>, message: impl Into<String>) {
        let id = self.take_log_id();
        self.comm_log.push(CommLogEntry {
            id,
            turn: self.turn,
            sender,
            target,
            message: message.into(),
        });
        if self.comm_log.len() > COMM_LOG_LIMIT {
            let excess = self.comm_log.len() - COMM_LOG_LIMIT;
            self.comm_log.drain(..excess);
        }
    }

    /// Append emitted events to the logs, in order
    pub fn commit_events(&mut self, events: Vec<GameEvent>) {
        for event in events {
            match event {
                GameEvent::Log { kind, source, message } => {
                    let id = self.take_log_id();
                    self.system_log.push(SystemLogEntry {
                        id,
                        turn: self.turn,
                        phase: self.current_phase,
                        kind,
                        source,
                        message,
                    });
                }
                GameEvent::ActionRejected { faction, message } => {
                    let id = self.take_log_id();
                    self.system_log.push(SystemLogEntry {
                        id,
                        turn: self.turn,
                        phase: self.current_phase,
                        kind: LogKind::Error,
                        source: Some(faction),
                        message: format!("Action failed: {}", message),
                    });
                }
                GameEvent::NodeActivity {
                    node_id,
                    kind,
                    faction,
                    message,
                } => {
                    let id = self.take_log_id();
                    self.node_activity.push(NodeActivityEntry {
                        id,
                        turn: self.turn,
                        node_id,
                        kind,
                        faction,
                        message,
                    });
                }
                GameEvent::Battle(report) => self.battle_log.push(*report),
                GameEvent::Communique { sender, target, message } => self.push_comm(sender, target, message),
            }
        }
    }

    /// Refresh the snapshot counters in every faction's stats
    pub fn recompute_stats(&mut self) {
        for (id, faction) in self.factions.iter_mut() {
            let owned = self.map_nodes.values().filter(|n| n.owner == *id);
            let stats = &mut faction.stats;
            stats.nodes_controlled = 0;
            stats.total_units = 0;
            stats.total_veteran_units = 0;
            stats.total_artillery = 0;
            stats.total_fortified_nodes = 0;
            for node in owned {
                stats.nodes_controlled += 1;
                stats.total_units += node.total_units();
                stats.total_veteran_units += node.veteran_units;
                stats.total_artillery += node.artillery;
                if node.fortification_level > 0 {
                    stats.total_fortified_nodes += 1;
                }
            }
            stats.total_infiltrators = self.map_nodes.values().map(|n| n.infiltrators_of(*id)).sum();
        }
    }

    /// Check every node's structural invariants
    pub fn check_invariants(&self) -> Result<(), String> {
        for node in self.map_nodes.values() {
            if let Err(e) = node.check_invariants() {
                warn!(error = %e, "Node invariant violated");
                return Err(e);
            }
        }
        Ok(())
    }
}
