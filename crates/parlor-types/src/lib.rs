//! Shared types and constants for the Parlor chat console.
//!
//! This crate provides the foundational types used across all Parlor crates:
//! conversation turns, decoding options, speech settings, agents, saved chat
//! sessions, and user settings.
//!
//! No crate in the workspace depends on anything *except* `parlor-types` for
//! cross-cutting type definitions. This keeps the dependency graph clean and
//! prevents circular dependencies.

use serde::{Deserialize, Serialize};

mod agent;
mod settings;

pub use agent::{Agent, AgentKind};
pub use settings::{DecodingDefaults, SpeechSettings, UploadLimits, UserSettings};

/// Default model context window (tokens).
pub const DEFAULT_NUM_CTX: u32 = 16_000;

/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f32 = 0.4;

/// Default nucleus-sampling threshold.
pub const DEFAULT_TOP_P: f32 = 0.95;

/// The role of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// A message written by the user.
    User,
    /// A message produced by the model.
    Assistant,
}

impl ChatRole {
    /// Returns the wire label used by the inference server.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One turn of a conversation.
///
/// Turns are ordered; insertion order determines the model context. A turn
/// may reference previously uploaded attachments by their opaque ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
    /// Opaque handles to uploaded image/PDF-page data, if any.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachment_ids: Vec<String>,
}

impl ChatTurn {
    /// Creates a text-only turn.
    pub fn text(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            attachment_ids: Vec::new(),
        }
    }
}

/// Decoding parameters for one generation request.
///
/// Immutable once submitted. Parameters the local inference server is known
/// to reject for some model families (repeat penalty, top-k) are deliberately
/// not exposed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodingOptions {
    /// Context window size in tokens.
    #[serde(default = "default_num_ctx")]
    pub num_ctx: u32,
    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Nucleus-sampling threshold.
    #[serde(default = "default_top_p")]
    pub top_p: f32,
}

fn default_num_ctx() -> u32 {
    DEFAULT_NUM_CTX
}

fn default_temperature() -> f32 {
    DEFAULT_TEMPERATURE
}

fn default_top_p() -> f32 {
    DEFAULT_TOP_P
}

impl Default for DecodingOptions {
    fn default() -> Self {
        Self {
            num_ctx: default_num_ctx(),
            temperature: default_temperature(),
            top_p: default_top_p(),
        }
    }
}

/// A saved chat session for one agent.
///
/// The full turn history is carried as-is; the server treats it as an opaque
/// ordered list and never rewrites individual turns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    /// Client-assigned chat id, unique per agent.
    pub id: String,
    /// RFC 3339 timestamp of the last update.
    pub timestamp: String,
    /// Display title.
    pub title: String,
    /// Ordered turn history.
    pub history: Vec<ChatTurn>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_role_wire_labels() {
        assert_eq!(ChatRole::User.as_str(), "user");
        assert_eq!(ChatRole::Assistant.as_str(), "assistant");
    }

    #[test]
    fn chat_turn_serializes_camel_case() {
        let turn = ChatTurn {
            role: ChatRole::User,
            content: "hello".to_string(),
            attachment_ids: vec!["att-1".to_string()],
        };

        let json = serde_json::to_value(&turn).expect("serialization should not fail");
        assert_eq!(json["role"], "user");
        assert!(json.get("attachmentIds").is_some(), "expected camelCase attachmentIds");
        assert!(json.get("attachment_ids").is_none());
    }

    #[test]
    fn chat_turn_attachment_ids_default_empty() {
        let turn: ChatTurn =
            serde_json::from_str(r#"{"role":"assistant","content":"hi"}"#).unwrap();
        assert!(turn.attachment_ids.is_empty());
    }

    #[test]
    fn decoding_options_defaults() {
        let opts = DecodingOptions::default();
        assert_eq!(opts.num_ctx, DEFAULT_NUM_CTX);
        assert_eq!(opts.temperature, DEFAULT_TEMPERATURE);
        assert_eq!(opts.top_p, DEFAULT_TOP_P);
    }

    #[test]
    fn partial_decoding_options_fill_in() {
        let opts: DecodingOptions = serde_json::from_str(r#"{"numCtx":32000}"#).unwrap();
        assert_eq!(opts.num_ctx, 32_000);
        assert_eq!(opts.temperature, DEFAULT_TEMPERATURE);
        assert_eq!(opts.top_p, DEFAULT_TOP_P);
    }
}
