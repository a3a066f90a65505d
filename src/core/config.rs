//! Per-game engine configuration
//!
//! Rule numbers live in `core::constants`. This struct carries the knobs a
//! caller picks when starting a game: fog of war, doctrine pacing, game length,
//! RNG seed and how the planning oracle is reached.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::constants::{
    DOCTRINE_ANOMALOUS_START_TURN, DOCTRINE_PHASE_INTERVAL, DOCTRINE_STANDARD_START_TURN, MAX_TURNS,
};
use crate::core::error::{GridError, Result};

/// When the first doctrine window opens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DoctrineMode {
    /// First doctrine phase at turn 20
    #[default]
    Standard,
    /// First doctrine phase at turn 5
    Anomalous,
}

/// How the planning oracle is reached
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OracleSettings {
    /// Use the LLM-backed oracle when an API key is available
    pub use_llm: bool,

    /// Model name override; `LLM_MODEL` wins when unset
    pub model: Option<String>,

    /// Upper bound on a single oracle round trip, in seconds
    ///
    /// A call that exceeds this degrades to the hold-position fallback.
    pub timeout_secs: u64,
}

impl Default for OracleSettings {
    fn default() -> Self {
        Self {
            use_llm: false,
            model: None,
            timeout_secs: 30,
        }
    }
}

/// Settings chosen when a game is created
///
/// Accepted as the `settings` payload of the new-game and next-phase
/// requests, or loaded from a TOML file by the binaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    // === VISIBILITY ===
    /// Mask the board at setup and restrict oracle snapshots to what each
    /// faction can see
    pub fog_of_war: bool,

    // === DOCTRINE PACING ===
    /// Picks the first doctrine turn
    pub doctrine_mode: DoctrineMode,

    /// Turns between doctrine phases once they start
    pub doctrine_interval: u32,

    // === GAME LENGTH ===
    /// The game ends in a draw after this many turns if both command
    /// networks survive
    pub max_turns: u32,

    // === DETERMINISM ===
    /// Seed for the game's RNG; combat and sabotage replay exactly under
    /// the same seed and inputs
    pub seed: u64,

    // === ORACLE ===
    pub oracle: OracleSettings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fog_of_war: true,
            doctrine_mode: DoctrineMode::Standard,
            doctrine_interval: DOCTRINE_PHASE_INTERVAL,
            max_turns: MAX_TURNS,
            seed: 42,
            oracle: OracleSettings::default(),
        }
    }
}

impl EngineConfig {
    /// First turn on which a doctrine phase can occur
    pub fn doctrine_start_turn(&self) -> u32 {
        match self.doctrine_mode {
            DoctrineMode::Standard => DOCTRINE_STANDARD_START_TURN,
            DoctrineMode::Anomalous => DOCTRINE_ANOMALOUS_START_TURN,
        }
    }

    /// True if the Resource phase of `turn` detours into Doctrine
    pub fn is_doctrine_turn(&self, turn: u32) -> bool {
        let start = self.doctrine_start_turn();
        turn >= start && (turn - start) % self.doctrine_interval == 0
    }

    /// Validate configuration values
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.doctrine_interval == 0 {
            return Err("doctrine_interval must be positive".into());
        }
        if self.max_turns == 0 {
            return Err("max_turns must be positive".into());
        }
        if self.oracle.timeout_secs == 0 {
            return Err("oracle.timeout_secs must be positive".into());
        }
        Ok(())
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(contents)?;
        config.validate().map_err(GridError::ConfigError)?;
        Ok(config)
    }

    /// Load from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }
}
