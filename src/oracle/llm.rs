//! LLM-backed oracle

use tracing::debug;

use super::client::LlmClient;
use super::parser::{parse_action, parse_communique, parse_doctrine_choice, parse_plan};
use super::prompts::{
    action_prompt, doctrine_prompt, situation, ACTION_SYSTEM_PROMPT, COMMUNIQUE_SYSTEM_PROMPT, DOCTRINE_SYSTEM_PROMPT,
    PLAN_SYSTEM_PROMPT,
};
use super::PlanningOracle;
use crate::actions::Action;
use crate::core::error::Result;
use crate::core::types::Phase;
use crate::doctrine::DoctrineDefinition;
use crate::state::Plan;
use crate::visibility::IntelSnapshot;

pub struct LlmOracle {
    client: LlmClient,
}

impl LlmOracle {
    pub fn new(client: LlmClient) -> Self {
        Self { client }
    }

    pub fn model(&self) -> &str {
        self.client.model()
    }
}

impl PlanningOracle for LlmOracle {
    async fn plan(&mut self, intel: &IntelSnapshot) -> Result<Plan> {
        let user = format!("{}\nYour plan as JSON:", situation(intel));
        let reply = self.client.complete(PLAN_SYSTEM_PROMPT, &user).await?;
        debug!(faction = %intel.viewer, reply = %reply, "Plan reply");
        parse_plan(&reply, intel.turn)
    }

    async fn choose_action(&mut self, intel: &IntelSnapshot, phase: Phase) -> Result<Action> {
        let reply = self
            .client
            .complete(ACTION_SYSTEM_PROMPT, &action_prompt(intel, phase))
            .await?;
        debug!(faction = %intel.viewer, reply = %reply, "Action reply");
        parse_action(&reply)
    }

    async fn choose_doctrine(&mut self, intel: &IntelSnapshot, offered: &[DoctrineDefinition]) -> Result<String> {
        let reply = self
            .client
            .complete(DOCTRINE_SYSTEM_PROMPT, &doctrine_prompt(intel.viewer, offered))
            .await?;
        parse_doctrine_choice(&reply)
    }

    async fn communique(&mut self, intel: &IntelSnapshot) -> Result<Option<String>> {
        let reply = self
            .client
            .complete(COMMUNIQUE_SYSTEM_PROMPT, &situation(intel))
            .await?;
        let message = parse_communique(&reply)?;
        Ok((!message.is_empty()).then_some(message))
    }
}
