//! Loopback-only endpoint guard.
//!
//! Conversation content must never leave the machine, so the inference
//! endpoint is required to be the loopback host on the standard inference
//! port. Startup aborts when the configured endpoint fails this check.

/// The port the local inference server is expected to listen on.
const INFERENCE_PORT: u16 = 11434;

/// Returns `true` if the endpoint points at the local inference server.
///
/// An empty string is accepted: it means "use the built-in default", which
/// is local. A bare `host:port` without a scheme is tolerated.
pub fn is_local_endpoint(raw: &str) -> bool {
    let raw = raw.trim();
    if raw.is_empty() {
        return true;
    }

    let with_scheme = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("http://{raw}")
    };

    let parsed = match url::Url::parse(&with_scheme) {
        Ok(url) => url,
        Err(_) => return false,
    };

    let host_ok = matches!(parsed.host_str(), Some("127.0.0.1") | Some("localhost"));
    let port_ok = parsed.port().unwrap_or(INFERENCE_PORT) == INFERENCE_PORT;

    host_ok && port_ok
}
