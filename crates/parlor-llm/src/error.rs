use thiserror::Error;

/// Errors returned by the inference-server client.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Transport-level failure (connection refused, reset mid-stream, ...).
    #[error("inference server request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("inference server returned {status}: {body}")]
    Api { status: u16, body: String },

    /// A stream line was not valid JSON in the expected shape.
    #[error("malformed stream chunk: {0}")]
    Decode(#[from] serde_json::Error),

    /// The configured endpoint is not a loopback address.
    #[error("inference endpoint is not local: {0}")]
    NotLocal(String),
}
