//! Planning oracles: where plans, orders and doctrine picks come from
//!
//! The engine asks an oracle for each faction's plan, its single order, and
//! its doctrine pick. Whatever comes back is only a suggestion: the turn
//! orchestrator wraps every call in a timeout, and any error becomes the
//! fallback (hold and assess, HOLD_POSITION, first doctrine offered).

pub mod client;
pub mod heuristic;
pub mod llm;
pub mod parser;
pub mod prompts;

pub use client::{ApiFormat, LlmClient};
pub use heuristic::HeuristicOracle;
pub use llm::LlmOracle;

use std::collections::{BTreeMap, VecDeque};
use std::future::Future;

use tracing::warn;

use crate::actions::Action;
use crate::core::config::OracleSettings;
use crate::core::error::{GridError, Result};
use crate::core::types::{FactionId, Phase};
use crate::doctrine::DoctrineDefinition;
use crate::state::Plan;
use crate::visibility::IntelSnapshot;

/// A source of decisions for the playable factions
///
/// Every method sees the board through the asking faction's
/// [`IntelSnapshot`], so fog of war applies to the oracle too.
pub trait PlanningOracle: Send {
    fn plan(&mut self, intel: &IntelSnapshot) -> impl Future<Output = Result<Plan>> + Send;

    /// One order for a Maneuver or Fortify phase
    fn choose_action(&mut self, intel: &IntelSnapshot, phase: Phase) -> impl Future<Output = Result<Action>> + Send;

    /// Id of one of `offered`
    fn choose_doctrine(
        &mut self,
        intel: &IntelSnapshot,
        offered: &[DoctrineDefinition],
    ) -> impl Future<Output = Result<String>> + Send;

    /// Optional line for the comm log during Fluctuation
    fn communique(&mut self, _intel: &IntelSnapshot) -> impl Future<Output = Result<Option<String>>> + Send {
        async { Ok(None) }
    }
}

fn first_offered(offered: &[DoctrineDefinition]) -> Result<String> {
    offered
        .first()
        .map(|d| d.id.clone())
        .ok_or_else(|| GridError::OracleError("no doctrines offered".into()))
}

/// Always answers with the fallback
#[derive(Debug, Clone, Copy, Default)]
pub struct HoldOracle;

impl PlanningOracle for HoldOracle {
    async fn plan(&mut self, intel: &IntelSnapshot) -> Result<Plan> {
        Ok(Plan::fallback(intel.turn))
    }

    async fn choose_action(&mut self, _intel: &IntelSnapshot, _phase: Phase) -> Result<Action> {
        Ok(Action::HoldPosition)
    }

    async fn choose_doctrine(&mut self, _intel: &IntelSnapshot, offered: &[DoctrineDefinition]) -> Result<String> {
        first_offered(offered)
    }
}

/// Replays queued answers per faction, then holds
///
/// Used for tests and replays. A queued `Err` is returned as-is so fallback
/// paths can be exercised.
#[derive(Debug, Default)]
pub struct ScriptedOracle {
    plans: BTreeMap<FactionId, VecDeque<Result<Plan>>>,
    actions: BTreeMap<FactionId, VecDeque<Result<Action>>>,
    doctrines: BTreeMap<FactionId, VecDeque<String>>,
    communiques: BTreeMap<FactionId, VecDeque<String>>,
    /// Every order request as (faction, phase), oldest first
    pub requests: Vec<(FactionId, Phase)>,
}

impl ScriptedOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_plan(&mut self, faction: FactionId, plan: Plan) -> &mut Self {
        self.plans.entry(faction).or_default().push_back(Ok(plan));
        self
    }

    pub fn push_action(&mut self, faction: FactionId, action: Action) -> &mut Self {
        self.actions.entry(faction).or_default().push_back(Ok(action));
        self
    }

    /// Queue a failing order request
    pub fn push_action_error(&mut self, faction: FactionId, message: &str) -> &mut Self {
        self.actions
            .entry(faction)
            .or_default()
            .push_back(Err(GridError::OracleError(message.to_string())));
        self
    }

    pub fn push_plan_error(&mut self, faction: FactionId, message: &str) -> &mut Self {
        self.plans
            .entry(faction)
            .or_default()
            .push_back(Err(GridError::OracleError(message.to_string())));
        self
    }

    pub fn push_doctrine(&mut self, faction: FactionId, doctrine_id: &str) -> &mut Self {
        self.doctrines
            .entry(faction)
            .or_default()
            .push_back(doctrine_id.to_string());
        self
    }

    pub fn push_communique(&mut self, faction: FactionId, message: &str) -> &mut Self {
        self.communiques
            .entry(faction)
            .or_default()
            .push_back(message.to_string());
        self
    }
}

impl PlanningOracle for ScriptedOracle {
    async fn plan(&mut self, intel: &IntelSnapshot) -> Result<Plan> {
        match self.plans.get_mut(&intel.viewer).and_then(VecDeque::pop_front) {
            Some(Ok(mut plan)) => {
                plan.turn_generated = intel.turn;
                Ok(plan)
            }
            Some(Err(e)) => Err(e),
            None => Ok(Plan::fallback(intel.turn)),
        }
    }

    async fn choose_action(&mut self, intel: &IntelSnapshot, phase: Phase) -> Result<Action> {
        self.requests.push((intel.viewer, phase));
        self.actions
            .get_mut(&intel.viewer)
            .and_then(VecDeque::pop_front)
            .unwrap_or(Ok(Action::HoldPosition))
    }

    async fn choose_doctrine(&mut self, intel: &IntelSnapshot, offered: &[DoctrineDefinition]) -> Result<String> {
        match self.doctrines.get_mut(&intel.viewer).and_then(VecDeque::pop_front) {
            Some(id) => Ok(id),
            None => first_offered(offered),
        }
    }

    async fn communique(&mut self, intel: &IntelSnapshot) -> Result<Option<String>> {
        Ok(self.communiques.get_mut(&intel.viewer).and_then(VecDeque::pop_front))
    }
}

/// The oracle a service runs with, picked from settings
pub enum ConfiguredOracle {
    Hold(HoldOracle),
    Heuristic(HeuristicOracle),
    Scripted(ScriptedOracle),
    Llm(LlmOracle),
}

impl ConfiguredOracle {
    /// LLM when enabled and an API key is present, heuristic otherwise
    pub fn from_settings(settings: &OracleSettings) -> Self {
        if !settings.use_llm {
            return ConfiguredOracle::Heuristic(HeuristicOracle);
        }
        match LlmClient::from_env(settings) {
            Ok(client) => ConfiguredOracle::Llm(LlmOracle::new(client)),
            Err(e) => {
                warn!(error = %e, "LLM oracle unavailable, using heuristic orders");
                ConfiguredOracle::Heuristic(HeuristicOracle)
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ConfiguredOracle::Hold(_) => "hold",
            ConfiguredOracle::Heuristic(_) => "heuristic",
            ConfiguredOracle::Scripted(_) => "scripted",
            ConfiguredOracle::Llm(_) => "llm",
        }
    }
}

impl PlanningOracle for ConfiguredOracle {
    async fn plan(&mut self, intel: &IntelSnapshot) -> Result<Plan> {
        match self {
            ConfiguredOracle::Hold(o) => o.plan(intel).await,
            ConfiguredOracle::Heuristic(o) => o.plan(intel).await,
            ConfiguredOracle::Scripted(o) => o.plan(intel).await,
            ConfiguredOracle::Llm(o) => o.plan(intel).await,
        }
    }

    async fn choose_action(&mut self, intel: &IntelSnapshot, phase: Phase) -> Result<Action> {
        match self {
            ConfiguredOracle::Hold(o) => o.choose_action(intel, phase).await,
            ConfiguredOracle::Heuristic(o) => o.choose_action(intel, phase).await,
            ConfiguredOracle::Scripted(o) => o.choose_action(intel, phase).await,
            ConfiguredOracle::Llm(o) => o.choose_action(intel, phase).await,
        }
    }

    async fn choose_doctrine(&mut self, intel: &IntelSnapshot, offered: &[DoctrineDefinition]) -> Result<String> {
        match self {
            ConfiguredOracle::Hold(o) => o.choose_doctrine(intel, offered).await,
            ConfiguredOracle::Heuristic(o) => o.choose_doctrine(intel, offered).await,
            ConfiguredOracle::Scripted(o) => o.choose_doctrine(intel, offered).await,
            ConfiguredOracle::Llm(o) => o.choose_doctrine(intel, offered).await,
        }
    }

    async fn communique(&mut self, intel: &IntelSnapshot) -> Result<Option<String>> {
        match self {
            ConfiguredOracle::Hold(o) => o.communique(intel).await,
            ConfiguredOracle::Heuristic(o) => o.communique(intel).await,
            ConfiguredOracle::Scripted(o) => o.communique(intel).await,
            ConfiguredOracle::Llm(o) => o.communique(intel).await,
        }
    }
}
