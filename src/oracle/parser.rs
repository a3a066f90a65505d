//! Turn oracle replies into typed plans, actions and doctrine choices
//!
//! Replies are free text with a JSON object somewhere inside. The object is
//! cut out, deserialized loosely, and coerced once into engine types.

use serde::Deserialize;

use crate::actions::{Action, RawAction};
use crate::core::error::{GridError, Result};
use crate::core::types::NodeId;
use crate::state::{Plan, PlanPriority};

/// The outermost `{ ... }` in a reply
pub fn extract_json(response: &str) -> Result<&str> {
    let start = response
        .find('{')
        .ok_or_else(|| GridError::OracleError("no JSON object in response".into()))?;
    let end = response
        .rfind('}')
        .filter(|&end| end > start)
        .ok_or_else(|| GridError::OracleError("unterminated JSON object in response".into()))?;
    Ok(&response[start..=end])
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawPlan {
    objective: String,
    operation: String,
    tasks: Vec<String>,
    priority: Option<String>,
    target_node_ids: Vec<String>,
}

/// Parse a plan reply; unknown priority tags are dropped rather than fatal
pub fn parse_plan(response: &str, turn: u32) -> Result<Plan> {
    let raw: RawPlan = serde_json::from_str(extract_json(response)?)
        .map_err(|e| GridError::OracleError(format!("malformed plan: {}", e)))?;
    if raw.objective.trim().is_empty() {
        return Err(GridError::OracleError("plan has no objective".into()));
    }
    let priority = raw.priority.and_then(|tag| {
        serde_json::from_value::<PlanPriority>(serde_json::Value::String(tag.trim().to_ascii_uppercase())).ok()
    });

    Ok(Plan {
        turn_generated: turn,
        objective: raw.objective,
        operation: raw.operation,
        tasks: raw.tasks,
        priority,
        target_node_ids: raw.target_node_ids.into_iter().map(NodeId::new).collect(),
    })
}

/// Parse an action reply into a typed action
pub fn parse_action(response: &str) -> Result<Action> {
    let raw: RawAction = serde_json::from_str(extract_json(response)?)
        .map_err(|e| GridError::OracleError(format!("malformed action: {}", e)))?;
    raw.into_action().map_err(GridError::OracleError)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDoctrineChoice {
    doctrine_id: String,
}

pub fn parse_doctrine_choice(response: &str) -> Result<String> {
    let raw: RawDoctrineChoice = serde_json::from_str(extract_json(response)?)
        .map_err(|e| GridError::OracleError(format!("malformed doctrine choice: {}", e)))?;
    Ok(raw.doctrine_id.trim().to_string())
}

#[derive(Debug, Deserialize)]
struct RawCommunique {
    message: String,
}

pub fn parse_communique(response: &str) -> Result<String> {
    let raw: RawCommunique = serde_json::from_str(extract_json(response)?)
        .map_err(|e| GridError::OracleError(format!("malformed communique: {}", e)))?;
    Ok(raw.message.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::ActionKind;

    #[test]
    fn test_extract_json_with_chatter() {
        let reply = "Here is my order:\n{\"type\": \"HOLD_POSITION\"}\nGood luck.";
        assert_eq!(extract_json(reply).unwrap(), "{\"type\": \"HOLD_POSITION\"}");
        assert!(extract_json("no braces here").is_err());
        assert!(extract_json("} backwards {").is_err());
    }

    #[test]
    fn test_parse_plan() {
        let reply = r#"{"objective": "Take the factory", "operation": "Iron Fist",
            "tasks": ["mass at WG"], "priority": "military_offense", "targetNodeIds": ["TF"]}"#;
        let plan = parse_plan(reply, 4).unwrap();
        assert_eq!(plan.turn_generated, 4);
        assert_eq!(plan.priority, Some(PlanPriority::MilitaryOffense));
        assert_eq!(plan.target_node_ids, vec![NodeId::from("TF")]);
    }

    #[test]
    fn test_plan_with_odd_priority_survives() {
        let plan = parse_plan(r#"{"objective": "dig in", "priority": "PANIC"}"#, 1).unwrap();
        assert_eq!(plan.priority, None);
        assert!(parse_plan(r#"{"operation": "nothing"}"#, 1).is_err());
    }

    #[test]
    fn test_parse_action() {
        let reply = r#"I will attack. {"type": "ATTACK_NODE", "params": {"nodeId": "WG", "targetNodeId": "MK", "unitsToMove": 6}, "reasoning": "weak garrison"}"#;
        let action = parse_action(reply).unwrap();
        assert_eq!(action.kind(), ActionKind::AttackNode);
        assert!(parse_action(r#"{"type": "ATTACK_NODE", "params": {}}"#).is_err());
    }

    #[test]
    fn test_parse_choices() {
        assert_eq!(parse_doctrine_choice(r#"{"doctrineId": " war-economy "}"#).unwrap(), "war-economy");
        assert_eq!(parse_communique(r#"{"message": "Hold the line."}"#).unwrap(), "Hold the line.");
    }
}
