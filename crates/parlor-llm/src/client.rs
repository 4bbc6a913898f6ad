//! HTTP client for model listing and streaming chat.

use crate::endpoint::is_local_endpoint;
use crate::error::LlmError;
use crate::types::{ChatRequest, StreamChunk};
use serde::Deserialize;
use std::time::Duration;

/// Timeout for the model-listing request. Listing is a small metadata call;
/// a slow answer means the server is down and the caller should move on.
const LIST_TIMEOUT: Duration = Duration::from_secs(3);

/// Connect timeout for the streaming chat request. No overall timeout is
/// set: a generation legitimately runs for minutes.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TaggedModel>,
}

#[derive(Debug, Deserialize)]
struct TaggedModel {
    name: String,
}

/// Client for the local inference server.
#[derive(Debug, Clone)]
pub struct LlmClient {
    http: reqwest::Client,
    base_url: String,
}

impl LlmClient {
    /// Creates a client for the given endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::NotLocal`] if the endpoint does not point at the
    /// loopback inference server, and [`LlmError::Http`] if the underlying
    /// HTTP client cannot be constructed.
    pub fn new(base_url: &str) -> Result<Self, LlmError> {
        if !is_local_endpoint(base_url) {
            return Err(LlmError::NotLocal(base_url.to_string()));
        }

        let base_url = if base_url.trim().is_empty() {
            "http://127.0.0.1:11434".to_string()
        } else if base_url.contains("://") {
            base_url.trim_end_matches('/').to_string()
        } else {
            format!("http://{}", base_url.trim_end_matches('/'))
        };

        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;

        Ok(Self { http, base_url })
    }

    /// The resolved base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Lists the models the inference server offers, sorted by name.
    ///
    /// Failures degrade to an empty list — the caller falls back to its
    /// configured default model.
    pub async fn list_models(&self) -> Vec<String> {
        let url = format!("{}/api/tags", self.base_url);
        let result = async {
            let resp = self
                .http
                .get(&url)
                .timeout(LIST_TIMEOUT)
                .send()
                .await?
                .error_for_status()?;
            let tags: TagsResponse = resp.json().await?;
            Ok::<_, reqwest::Error>(tags)
        }
        .await;

        match result {
            Ok(tags) => {
                let mut names: Vec<String> = tags.models.into_iter().map(|m| m.name).collect();
                names.sort();
                names
            }
            Err(e) => {
                tracing::warn!("failed to list models from inference server: {}", e);
                Vec::new()
            }
        }
    }

    /// Opens a streaming chat completion.
    ///
    /// The returned [`TokenStream`] yields one parsed chunk per NDJSON line.
    /// Dropping it aborts the request.
    pub async fn chat_stream(&self, request: &ChatRequest) -> Result<TokenStream, LlmError> {
        let url = format!("{}/api/chat", self.base_url);
        let resp = self.http.post(&url).json(request).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(TokenStream {
            resp: Some(resp),
            buf: Vec::new(),
        })
    }
}

/// Async iterator over the NDJSON chunks of one streaming chat completion.
pub struct TokenStream {
    /// `None` once the response body is exhausted.
    resp: Option<reqwest::Response>,
    buf: Vec<u8>,
}

impl TokenStream {
    /// Returns the next parsed chunk, or `None` when the stream ends.
    pub async fn next_chunk(&mut self) -> Option<Result<StreamChunk, LlmError>> {
        loop {
            if let Some(line) = take_line(&mut self.buf) {
                if line.is_empty() {
                    continue;
                }
                return Some(parse_chunk(&line));
            }

            let resp = self.resp.as_mut()?;
            match resp.chunk().await {
                Ok(Some(bytes)) => self.buf.extend_from_slice(&bytes),
                Ok(None) => {
                    self.resp = None;
                    // Flush a final unterminated line, if any.
                    if self.buf.is_empty() {
                        return None;
                    }
                    let line = std::mem::take(&mut self.buf);
                    let line = String::from_utf8_lossy(&line).trim().to_string();
                    if line.is_empty() {
                        return None;
                    }
                    return Some(parse_chunk(&line));
                }
                Err(e) => {
                    self.resp = None;
                    return Some(Err(LlmError::Http(e)));
                }
            }
        }
    }
}

/// Removes and returns the first complete line from `buf`, if one exists.
fn take_line(buf: &mut Vec<u8>) -> Option<String> {
    let pos = buf.iter().position(|&b| b == b'\n')?;
    let rest = buf.split_off(pos + 1);
    let mut line = std::mem::replace(buf, rest);
    line.truncate(pos);
    Some(String::from_utf8_lossy(&line).trim().to_string())
}

fn parse_chunk(line: &str) -> Result<StreamChunk, LlmError> {
    serde_json::from_str(line).map_err(LlmError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_line_splits_on_newline() {
        let mut buf = b"{\"done\":false}\n{\"done\":tr".to_vec();
        assert_eq!(take_line(&mut buf).as_deref(), Some("{\"done\":false}"));
        assert_eq!(take_line(&mut buf), None);
        assert_eq!(buf, b"{\"done\":tr");
    }

    #[test]
    fn take_line_handles_crlf() {
        let mut buf = b"{\"done\":true}\r\n".to_vec();
        assert_eq!(take_line(&mut buf).as_deref(), Some("{\"done\":true}"));
        assert!(buf.is_empty());
    }

    #[test]
    fn parse_chunk_rejects_garbage() {
        assert!(parse_chunk("not json").is_err());
    }

    #[test]
    fn client_rejects_remote_endpoint() {
        let err = LlmClient::new("http://example.com:11434").unwrap_err();
        assert!(matches!(err, LlmError::NotLocal(_)));
    }

    #[test]
    fn client_normalizes_base_url() {
        let client = LlmClient::new("").unwrap();
        assert_eq!(client.base_url(), "http://127.0.0.1:11434");

        let client = LlmClient::new("localhost:11434").unwrap();
        assert_eq!(client.base_url(), "http://localhost:11434");

        let client = LlmClient::new("http://127.0.0.1:11434/").unwrap();
        assert_eq!(client.base_url(), "http://127.0.0.1:11434");
    }
}
