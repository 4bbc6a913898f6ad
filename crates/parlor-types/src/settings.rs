//! User settings: speech output, decoding defaults, and upload limits.
//!
//! Settings are persisted as a whole; any key missing from storage falls
//! back to the compiled default, so older setting records keep working
//! after new keys are added.

use crate::{DEFAULT_NUM_CTX, DEFAULT_TEMPERATURE, DEFAULT_TOP_P};
use serde::{Deserialize, Serialize};

/// Speech-output (text-to-speech) settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechSettings {
    /// Whether synthesized speech is sent alongside the token stream.
    #[serde(default = "default_speech_enabled")]
    pub enabled: bool,
    /// Voice identifier, resolved against the configured voices directory.
    #[serde(default = "default_voice")]
    pub voice: String,
    /// BCP-47-ish language code handed to the synthesis engine.
    #[serde(default = "default_lang")]
    pub lang: String,
    /// Speed multiplier (1.0 is normal).
    #[serde(default = "default_speed")]
    pub speed: f32,
}

fn default_speech_enabled() -> bool {
    true
}

fn default_voice() -> String {
    "en_US-lessac-medium".to_string()
}

fn default_lang() -> String {
    "en-us".to_string()
}

fn default_speed() -> f32 {
    1.0
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            enabled: default_speech_enabled(),
            voice: default_voice(),
            lang: default_lang(),
            speed: default_speed(),
        }
    }
}

/// Upload limits enforced by the upload endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadLimits {
    /// Maximum upload size in MiB.
    #[serde(default = "default_max_file_mb")]
    pub max_file_mb: u32,
    /// Maximum number of PDF pages accepted per upload.
    #[serde(default = "default_max_pdf_pages")]
    pub max_pdf_pages: u32,
    /// Zoom factor PDF pages are rendered at (1.0 = 72 dpi).
    #[serde(default = "default_pdf_render_scale")]
    pub pdf_render_scale: f32,
}

fn default_max_file_mb() -> u32 {
    20
}

fn default_max_pdf_pages() -> u32 {
    15
}

fn default_pdf_render_scale() -> f32 {
    1.5
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_file_mb: default_max_file_mb(),
            max_pdf_pages: default_max_pdf_pages(),
            pdf_render_scale: default_pdf_render_scale(),
        }
    }
}

/// The full user settings record.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    #[serde(default)]
    pub speech: SpeechSettings,
    #[serde(default)]
    pub decoding: DecodingDefaults,
    #[serde(default)]
    pub upload: UploadLimits,
}

/// Default decoding parameters applied when a chat request omits them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodingDefaults {
    #[serde(default = "default_num_ctx")]
    pub num_ctx: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
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

impl Default for DecodingDefaults {
    fn default() -> Self {
        Self {
            num_ctx: default_num_ctx(),
            temperature: default_temperature(),
            top_p: default_top_p(),
        }
    }
}
