//! Client for the local inference server.
//!
//! The inference server (an Ollama-style HTTP API) is an external
//! collaborator: this crate only lists its models (`GET /api/tags`) and
//! opens streaming chat completions (`POST /api/chat`, newline-delimited
//! JSON). The stream is exposed as an async chunk iterator the streaming
//! coordinator polls one chunk at a time, which keeps cancellation
//! cooperative — dropping the stream aborts the underlying request.
//!
//! The configured endpoint must be local: Parlor never sends conversation
//! content over the network, so startup refuses any endpoint that does not
//! resolve to the loopback host on the expected port.

mod client;
mod endpoint;
mod error;
mod types;

pub use client::{LlmClient, TokenStream};
pub use endpoint::is_local_endpoint;
pub use error::LlmError;
pub use types::{ChatMessage, ChatRequest, FinalStats, StreamChunk, WireOptions};
