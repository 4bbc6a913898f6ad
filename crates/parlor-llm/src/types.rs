//! Wire types for the inference server's chat API.

use parlor_types::DecodingOptions;
use serde::{Deserialize, Serialize};

/// One message in the model context.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    /// `system`, `user`, or `assistant`.
    pub role: String,
    pub content: String,
    /// Base64-encoded images attached to this message (vision models).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
            images: None,
        }
    }
}

/// Decoding options in the field names the inference server expects.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct WireOptions {
    pub num_ctx: u32,
    pub temperature: f32,
    pub top_p: f32,
}

impl From<DecodingOptions> for WireOptions {
    fn from(opts: DecodingOptions) -> Self {
        Self {
            num_ctx: opts.num_ctx,
            temperature: opts.temperature,
            top_p: opts.top_p,
        }
    }
}

/// A streaming chat completion request.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
    pub options: WireOptions,
}

/// One newline-delimited JSON chunk of the streaming response.
///
/// Token chunks carry `message.content` with `done == false`; the terminal
/// chunk carries `done == true` plus evaluation statistics.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamChunk {
    #[serde(default)]
    pub message: Option<ChunkMessage>,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub prompt_eval_count: u64,
    #[serde(default)]
    pub eval_count: u64,
    /// Completion evaluation wall time in nanoseconds.
    #[serde(default)]
    pub eval_duration: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChunkMessage {
    #[serde(default)]
    pub content: String,
}

impl StreamChunk {
    /// The token text carried by this chunk, if any.
    pub fn token(&self) -> Option<&str> {
        self.message
            .as_ref()
            .map(|m| m.content.as_str())
            .filter(|c| !c.is_empty())
    }

    /// Final statistics, present only on the terminal chunk.
    pub fn stats(&self) -> Option<FinalStats> {
        if !self.done {
            return None;
        }
        Some(FinalStats {
            prompt_tokens: self.prompt_eval_count,
            completion_tokens: self.eval_count,
            eval_duration_ns: self.eval_duration,
        })
    }
}

/// Token accounting reported by the terminal stream chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinalStats {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub eval_duration_ns: u64,
}

impl FinalStats {
    /// Prompt plus completion tokens.
    pub fn total_tokens(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }

    /// Completion throughput, if the server reported a duration.
    pub fn tokens_per_second(&self) -> Option<f64> {
        if self.eval_duration_ns == 0 {
            return None;
        }
        Some(self.completion_tokens as f64 / (self.eval_duration_ns as f64 / 1e9))
    }
}
