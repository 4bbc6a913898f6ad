//! Agent definitions.
//!
//! An agent is a named persona (system instruction plus display metadata)
//! the user can chat with. Exactly one default agent always exists; it is
//! seeded on first startup and can be neither edited nor deleted.

use serde::{Deserialize, Serialize};

/// Conversation mode of an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AgentKind {
    /// Keeps the full conversation history in context.
    #[default]
    MultiTurn,
    /// Each message starts a fresh context.
    SingleTurn,
}

/// A chat agent persona.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    /// Unique identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Short descriptive title shown under the name.
    pub title: String,
    /// System instruction sent with every generation request.
    pub persona: String,
    /// Accent color for the sidebar icon (CSS hex).
    pub color: String,
    #[serde(rename = "type")]
    pub kind: AgentKind,
    /// Whether this is the seeded default agent.
    #[serde(default)]
    pub is_default: bool,
    /// Model the agent was created with, if pinned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Per-agent overrides of the user settings (decoding and speech),
    /// stored as an opaque JSON object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<serde_json::Value>,
}

impl Agent {
    /// The agent seeded on first startup.
    pub fn default_agent() -> Self {
        Self {
            id: "assistant".to_string(),
            name: "Ai Assistant".to_string(),
            title: "A friendly Ai Assistant".to_string(),
            persona: "You are a friendly and helpful assistant. Do not use emojis. \
                      Use LaTeX notation for mathematical or scientific expressions only."
                .to_string(),
            color: "#4f46e5".to_string(),
            kind: AgentKind::MultiTurn,
            is_default: true,
            model: None,
            settings: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_agent_is_marked_default() {
        let agent = Agent::default_agent();
        assert!(agent.is_default);
        assert_eq!(agent.id, "assistant");
        assert_eq!(agent.kind, AgentKind::MultiTurn);
    }

    #[test]
    fn agent_kind_serializes_kebab_case() {
        assert_eq!(
            serde_json::to_value(AgentKind::MultiTurn).unwrap(),
            "multi-turn"
        );
        assert_eq!(
            serde_json::to_value(AgentKind::SingleTurn).unwrap(),
            "single-turn"
        );
    }

    #[test]
    fn agent_serializes_type_field() {
        let agent = Agent::default_agent();
        let json = serde_json::to_value(&agent).unwrap();
        assert_eq!(json["type"], "multi-turn");
        assert_eq!(json["isDefault"], true);
    }
}
