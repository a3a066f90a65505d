pub mod config;
pub mod constants;
pub mod error;
pub mod types;

pub use config::{DoctrineMode, EngineConfig, OracleSettings};
pub use error::{GridError, Result};
pub use types::{FactionId, NodeId, NodeType, Phase, UnitType};
