//! The game service: the four request shapes the outside world uses
//!
//! One game per service. Requests that would overlap an in-flight request
//! are turned away with `Busy` (409) rather than queued, and every mutating
//! request works on a copy so a rejected request leaves the game untouched.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{info, warn};

use crate::core::config::EngineConfig;
use crate::core::error::GridError;
use crate::core::types::{FactionId, Phase};
use crate::doctrine::DoctrineCatalog;
use crate::events::{CommTarget, GameEvent, LogKind};
use crate::map::MapType;
use crate::oracle::ConfiguredOracle;
use crate::state::GameState;
use crate::turn::{advance_phase, choose_pending_doctrine};
use crate::victory::check_game_over;

/// A rejected request, as the boundary reports it
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{status}: {message}")]
pub struct ServiceError {
    pub status: u16,
    pub message: String,
}

impl From<GridError> for ServiceError {
    fn from(e: GridError) -> Self {
        Self {
            status: e.status(),
            message: e.to_string(),
        }
    }
}

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

struct Session {
    game: Option<GameState>,
    oracle: ConfiguredOracle,
}

pub struct GameService {
    session: Mutex<Session>,
    catalog: DoctrineCatalog,
    /// Keep the injected oracle instead of rebuilding it from game settings
    pinned_oracle: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DoctrineChoicePayload {
    faction_id: Option<String>,
    doctrine_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DirectivePayload {
    message: Option<String>,
    target: Option<CommTarget>,
}

impl Default for GameService {
    fn default() -> Self {
        Self::new()
    }
}

impl GameService {
    /// Service whose oracle follows each game's settings
    pub fn new() -> Self {
        Self {
            session: Mutex::new(Session {
                game: None,
                oracle: ConfiguredOracle::from_settings(&Default::default()),
            }),
            catalog: DoctrineCatalog::builtin(),
            pinned_oracle: false,
        }
    }

    /// Service that always consults `oracle`
    pub fn with_oracle(oracle: ConfiguredOracle) -> Self {
        Self {
            session: Mutex::new(Session { game: None, oracle }),
            catalog: DoctrineCatalog::builtin(),
            pinned_oracle: true,
        }
    }

    pub fn with_catalog(mut self, catalog: DoctrineCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    fn guard(&self) -> ServiceResult<MutexGuard<'_, Session>> {
        self.session.try_lock().map_err(|_| GridError::Busy.into())
    }

    /// `POST /game/new`
    pub async fn new_game(&self, map_type: &str, settings: Option<EngineConfig>) -> ServiceResult<GameState> {
        let map_type: MapType = map_type.parse()?;
        let settings = settings.unwrap_or_default();
        settings.validate().map_err(GridError::ConfigError)?;

        let mut session = self.guard()?;
        if !self.pinned_oracle {
            session.oracle = ConfiguredOracle::from_settings(&settings.oracle);
        }
        let game = GameState::new(map_type, settings);
        info!(game_id = %game.game_id, map = ?map_type, oracle = session.oracle.name(), "New game");
        session.game = Some(game.clone());
        Ok(game)
    }

    /// `GET /game/state`
    pub async fn state(&self) -> ServiceResult<GameState> {
        let session = self.guard()?;
        session.game.clone().ok_or_else(|| GridError::NoGame.into())
    }

    /// `POST /game/next-phase`
    ///
    /// Settings sent with the request replace the game's settings before
    /// the phase runs.
    pub async fn next_phase(&self, settings: Option<EngineConfig>) -> ServiceResult<GameState> {
        if let Some(settings) = &settings {
            settings.validate().map_err(GridError::ConfigError)?;
        }
        let mut guard = self.guard()?;
        let session = &mut *guard;
        let current = session.game.as_ref().ok_or(GridError::NoGame)?;

        let mut working = current.clone();
        if let Some(settings) = settings {
            if !self.pinned_oracle && settings.oracle != working.settings.oracle {
                session.oracle = ConfiguredOracle::from_settings(&settings.oracle);
            }
            working.settings = settings;
        }

        let ran = working.current_phase;
        let mut next = advance_phase(&working, &mut session.oracle, &self.catalog).await?;
        if matches!(ran, Phase::Combat | Phase::Upkeep) {
            check_game_over(&mut next);
        }
        session.game = Some(next.clone());
        Ok(next)
    }

    /// `POST /game/action`
    pub async fn action(&self, action_type: &str, payload: Value) -> ServiceResult<GameState> {
        let mut session = self.guard()?;
        let current = session.game.as_ref().ok_or(GridError::NoGame)?;
        let mut working = current.clone();

        match action_type {
            "chooseDoctrine" => {
                let payload: DoctrineChoicePayload =
                    serde_json::from_value(payload).map_err(|e| GridError::BadRequest(e.to_string()))?;
                let doctrine_id = payload.doctrine_id.ok_or(GridError::MissingField("doctrineId"))?;
                if working.current_phase != Phase::Doctrine {
                    return Err(GridError::InvalidPhase(working.current_phase).into());
                }
                let faction = match payload.faction_id {
                    Some(raw) => FactionId::parse(&raw)
                        .filter(|f| f.is_playable())
                        .ok_or_else(|| GridError::BadRequest(format!("unknown faction '{}'", raw)))?,
                    None => *working
                        .doctrine_choices_pending
                        .keys()
                        .next()
                        .ok_or_else(|| GridError::BadRequest("no doctrine choice pending".into()))?,
                };
                let mut events = choose_pending_doctrine(&mut working, faction, &doctrine_id, &self.catalog)?;
                events.insert(
                    0,
                    GameEvent::log(
                        LogKind::Doctrine,
                        Some(FactionId::CommandConsole),
                        format!("Command console chose {} for {}", doctrine_id, faction),
                    ),
                );
                working.commit_events(events);
            }
            "sendDirective" => {
                let payload: DirectivePayload =
                    serde_json::from_value(payload).map_err(|e| GridError::BadRequest(e.to_string()))?;
                let message = payload
                    .message
                    .map(|m| m.trim().to_string())
                    .filter(|m| !m.is_empty())
                    .ok_or(GridError::MissingField("message"))?;
                let target = payload.target.unwrap_or(CommTarget::BROADCAST);
                working.commit_events(vec![
                    GameEvent::log(
                        LogKind::Directive,
                        Some(FactionId::CommandConsole),
                        format!("Directive sent: {}", message),
                    ),
                    GameEvent::Communique {
                        sender: FactionId::CommandConsole,
                        target: Some(target),
                        message,
                    },
                ]);
            }
            other => {
                warn!(action_type = other, "Unknown action type");
                return Err(GridError::BadRequest(format!("unknown action type '{}'", other)).into());
            }
        }

        session.game = Some(working.clone());
        Ok(working)
    }
}
