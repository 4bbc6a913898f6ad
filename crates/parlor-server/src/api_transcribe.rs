//! Speech-to-text endpoint.
//!
//! `POST /api/transcribe` with multipart fields `audio` (a WAV recording)
//! and optional `language` (hint, default `en`). Evidently garbled
//! transcripts are discarded and reported as a `no_speech` status rather
//! than an error — the known engine failure mode on silence or noise must
//! not reach the model.

use crate::{api::ApiError, AppState};
use axum::{
    extract::{Extension, Multipart},
    Json,
};
use parlor_voice::is_garbled;
use std::sync::Arc;
use std::time::Instant;

/// Handler for `POST /api/transcribe`.
pub async fn transcribe_handler(
    Extension(state): Extension<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mut audio: Option<Vec<u8>> = None;
    let mut language = "en".to_string();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("multipart error: {}", e)))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("audio") => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("failed to read audio: {}", e)))?;
                audio = Some(bytes.to_vec());
            }
            Some("language") => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("failed to read language: {}", e)))?;
                if !value.trim().is_empty() {
                    language = value.trim().to_string();
                }
            }
            _ => {}
        }
    }

    let audio = audio.ok_or_else(|| ApiError::BadRequest("no audio file".to_string()))?;

    let started = Instant::now();
    let transcript = state.stt.transcribe(&audio, &language).await.map_err(|e| {
        tracing::error!("transcription failed: {}", e);
        ApiError::InternalServerError("internal server error during transcription".to_string())
    })?;
    tracing::info!(
        duration_ms = started.elapsed().as_millis() as u64,
        language = %language,
        "transcription complete"
    );

    if transcript.is_empty() || is_garbled(&transcript) {
        if !transcript.is_empty() {
            tracing::info!(transcript = %transcript, "garbled transcript discarded");
        }
        return Ok(Json(serde_json::json!({ "status": "no_speech" })));
    }

    Ok(Json(serde_json::json!({ "transcribedText": transcript })))
}
