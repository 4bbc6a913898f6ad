//! Server configuration loading from file and environment variables.

use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use thiserror::Error;

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server network settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Database settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Inference server settings.
    #[serde(default)]
    pub inference: InferenceConfig,

    /// Speech engine settings.
    #[serde(default)]
    pub speech: SpeechConfig,

    /// PDF rendering settings.
    #[serde(default)]
    pub pdf: PdfConfig,
}

/// Network configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Whether to open the default browser once the server is listening.
    #[serde(default = "default_open_browser")]
    pub open_browser: bool,

    /// Age at which an unconsumed attachment is swept, in seconds.
    /// 0 disables the sweeper.
    #[serde(default = "default_attachment_ttl_secs")]
    pub attachment_ttl_secs: u64,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,

    /// SQLite busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Maximum number of pooled connections.
    #[serde(default = "default_pool_max_size")]
    pub pool_max_size: u32,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "parlor_server=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

/// Inference server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct InferenceConfig {
    /// Base URL of the local inference server. Must be a loopback
    /// endpoint; startup aborts otherwise.
    #[serde(default = "default_inference_url")]
    pub base_url: String,

    /// Model to fall back to when the server offers none or the
    /// last-selected model is gone.
    #[serde(default = "default_model")]
    pub default_model: String,
}

/// Speech engine configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SpeechConfig {
    /// Path to the whisper.cpp-style STT binary.
    #[serde(default = "default_stt_binary")]
    pub stt_binary: String,

    /// Path to the STT model file.
    #[serde(default = "default_stt_model")]
    pub stt_model: String,

    /// Path to the piper-style TTS binary.
    #[serde(default = "default_tts_binary")]
    pub tts_binary: String,

    /// Directory holding TTS voice models.
    #[serde(default = "default_voices_dir")]
    pub voices_dir: String,

    /// Sample rate of the TTS engine's raw PCM output.
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
}

/// PDF rendering configuration. Page probing and rendering are delegated
/// to external poppler-style binaries.
#[derive(Debug, Clone, Deserialize)]
pub struct PdfConfig {
    /// Binary reporting PDF metadata (`pdfinfo`-compatible output).
    #[serde(default = "default_pdf_info_binary")]
    pub info_binary: String,

    /// Binary rendering PDF pages to PNG (`pdftoppm`-compatible flags).
    #[serde(default = "default_pdf_render_binary")]
    pub render_binary: String,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    5000
}

fn default_open_browser() -> bool {
    true
}

fn default_attachment_ttl_secs() -> u64 {
    3600
}

fn default_db_path() -> String {
    "parlor.db".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_pool_max_size() -> u32 {
    8
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_inference_url() -> String {
    "http://127.0.0.1:11434".to_string()
}

fn default_model() -> String {
    "gemma3:4b".to_string()
}

fn default_stt_binary() -> String {
    "whisper-cli".to_string()
}

fn default_stt_model() -> String {
    "models/ggml-base.bin".to_string()
}

fn default_tts_binary() -> String {
    "piper".to_string()
}

fn default_voices_dir() -> String {
    "voices".to_string()
}

fn default_sample_rate() -> u32 {
    22_050
}

fn default_pdf_info_binary() -> String {
    "pdfinfo".to_string()
}

fn default_pdf_render_binary() -> String {
    "pdftoppm".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            open_browser: default_open_browser(),
            attachment_ttl_secs: default_attachment_ttl_secs(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
            pool_max_size: default_pool_max_size(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            base_url: default_inference_url(),
            default_model: default_model(),
        }
    }
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            stt_binary: default_stt_binary(),
            stt_model: default_stt_model(),
            tts_binary: default_tts_binary(),
            voices_dir: default_voices_dir(),
            sample_rate: default_sample_rate(),
        }
    }
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            info_binary: default_pdf_info_binary(),
            render_binary: default_pdf_render_binary(),
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `PARLOR_HOST` overrides `server.host`
/// - `PARLOR_PORT` overrides `server.port`
/// - `PARLOR_DB_PATH` overrides `database.path`
/// - `PARLOR_LOG_LEVEL` overrides `logging.level`
/// - `PARLOR_LOG_JSON` overrides `logging.json` (set to "true" to enable)
/// - `PARLOR_INFERENCE_URL` overrides `inference.base_url`
/// - `PARLOR_DEFAULT_MODEL` overrides `inference.default_model`
/// - `PARLOR_OPEN_BROWSER` overrides `server.open_browser`
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    // Environment variable overrides
    if let Ok(host) = std::env::var("PARLOR_HOST") {
        if let Ok(parsed) = host.parse() {
            config.server.host = parsed;
        }
    }
    if let Ok(port) = std::env::var("PARLOR_PORT") {
        if let Ok(parsed) = port.parse() {
            config.server.port = parsed;
        }
    }
    if let Ok(db_path) = std::env::var("PARLOR_DB_PATH") {
        config.database.path = db_path;
    }
    if let Ok(level) = std::env::var("PARLOR_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Ok(json) = std::env::var("PARLOR_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
    if let Ok(url) = std::env::var("PARLOR_INFERENCE_URL") {
        config.inference.base_url = url;
    }
    if let Ok(model) = std::env::var("PARLOR_DEFAULT_MODEL") {
        config.inference.default_model = model;
    }
    if let Ok(open) = std::env::var("PARLOR_OPEN_BROWSER") {
        config.server.open_browser = open == "true" || open == "1";
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = Config::default();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.inference.base_url, "http://127.0.0.1:11434");
        assert_eq!(config.speech.sample_rate, 22_050);
        assert!(config.server.open_browser);
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let config: Config = toml::from_str(
            r#"
            [server]
            port = 8123

            [inference]
            default_model = "qwen3:8b"
            "#,
        )
        .expect("valid toml");

        assert_eq!(config.server.port, 8123);
        assert_eq!(config.inference.default_model, "qwen3:8b");
        assert_eq!(config.database.path, "parlor.db");
        assert_eq!(config.pdf.info_binary, "pdfinfo");
    }
}
