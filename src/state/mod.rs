//! Authoritative game state: nodes, factions and the root aggregate

pub mod faction;
pub mod game;
pub mod node;

pub use faction::{ActiveDoctrine, Faction, FactionStats, Plan, PlanPriority};
pub use game::GameState;
pub use node::{Node, PendingAttack, TrainingOrder};
