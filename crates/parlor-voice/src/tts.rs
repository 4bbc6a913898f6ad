use crate::error::VoiceError;
use parlor_types::SpeechSettings;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Maximum text input size for TTS (64 KiB). Prevents resource exhaustion from
/// oversized synthesis requests.
const MAX_TTS_INPUT_BYTES: usize = 64 * 1024;

/// Timeout for TTS process execution.
const TTS_TIMEOUT: Duration = Duration::from_secs(60);

/// Raw synthesized audio plus its sample rate.
#[derive(Debug, Clone)]
pub struct SynthesizedAudio {
    /// PCM samples, s16le mono.
    pub pcm: Vec<u8>,
    pub sample_rate: u32,
}

impl SynthesizedAudio {
    /// Wraps the PCM data in a WAV container for transport to the browser.
    pub fn to_wav(&self) -> Result<Vec<u8>, VoiceError> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec)
                .map_err(|e| VoiceError::Tts(format!("Failed to start WAV writer: {}", e)))?;
            for sample in self.pcm.chunks_exact(2) {
                let value = i16::from_le_bytes([sample[0], sample[1]]);
                writer
                    .write_sample(value)
                    .map_err(|e| VoiceError::Tts(format!("Failed to write WAV sample: {}", e)))?;
            }
            writer
                .finalize()
                .map_err(|e| VoiceError::Tts(format!("Failed to finalize WAV: {}", e)))?;
        }
        Ok(cursor.into_inner())
    }
}

/// Synthesis service wrapping a piper-style binary.
///
/// Voices are ONNX models under `voices_dir`; a voice id resolves to
/// `<voices_dir>/<lang>/<voice>.onnx` when a language subdirectory exists,
/// falling back to `<voices_dir>/<voice>.onnx`.
#[derive(Debug, Clone)]
pub struct TtsService {
    binary_path: PathBuf,
    voices_dir: PathBuf,
    sample_rate: u32,
}

impl TtsService {
    pub fn new(
        binary_path: impl AsRef<Path>,
        voices_dir: impl AsRef<Path>,
        sample_rate: u32,
    ) -> Self {
        Self {
            binary_path: binary_path.as_ref().to_path_buf(),
            voices_dir: voices_dir.as_ref().to_path_buf(),
            sample_rate,
        }
    }

    fn resolve_voice(&self, voice: &str, lang: &str) -> PathBuf {
        let by_lang = self.voices_dir.join(lang).join(format!("{voice}.onnx"));
        if by_lang.exists() {
            return by_lang;
        }
        self.voices_dir.join(format!("{voice}.onnx"))
    }

    /// Synthesizes speech for one sentence.
    ///
    /// Returns raw PCM audio (s16le) at the service's configured rate.
    pub async fn synthesize(
        &self,
        text: &str,
        settings: &SpeechSettings,
    ) -> Result<SynthesizedAudio, VoiceError> {
        if text.len() > MAX_TTS_INPUT_BYTES {
            return Err(VoiceError::Tts(format!(
                "text exceeds maximum size: {} bytes (limit: {} bytes)",
                text.len(),
                MAX_TTS_INPUT_BYTES
            )));
        }

        if settings.speed < 0.1 || settings.speed > 10.0 {
            return Err(VoiceError::Config(
                "Speed must be between 0.1 and 10.0".to_string(),
            ));
        }

        let model_path = self.resolve_voice(&settings.voice, &settings.lang);
        if !model_path.exists() {
            return Err(VoiceError::Tts(format!(
                "Voice model not found: {:?}",
                model_path
            )));
        }

        let mut command = Command::new(&self.binary_path);
        command
            .arg("--model")
            .arg(model_path)
            .arg("--output_raw")
            // Length scale is inverse of speed (roughly).
            // If speed is 2.0 (faster), length_scale should be 0.5 (shorter).
            .arg("--length_scale")
            .arg((1.0 / settings.speed).to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = command
            .spawn()
            .map_err(|e| VoiceError::Tts(format!("Failed to spawn TTS binary: {}", e)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| VoiceError::Tts("Failed to open stdin".to_string()))?;
        let text_owned = text.to_string();

        // Spawn a task to write to stdin to avoid deadlock if output buffer fills up
        let write_task = tokio::spawn(async move { stdin.write_all(text_owned.as_bytes()).await });

        let output = tokio::time::timeout(TTS_TIMEOUT, child.wait_with_output())
            .await
            .map_err(|_| {
                VoiceError::Tts(format!(
                    "TTS process timed out after {} seconds",
                    TTS_TIMEOUT.as_secs()
                ))
            })?
            .map_err(|e| VoiceError::Tts(format!("Failed to wait for TTS binary: {}", e)))?;

        // Ensure writing finished successfully (or propagate error)
        match write_task.await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                return Err(VoiceError::Tts(format!(
                    "Failed to write to TTS stdin: {}",
                    e
                )))
            }
            Err(e) => return Err(VoiceError::Tts(format!("Stdin task failed: {}", e))),
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(VoiceError::Tts(format!("TTS binary failed: {}", stderr)));
        }

        Ok(SynthesizedAudio {
            pcm: output.stdout,
            sample_rate: self.sample_rate,
        })
    }
}
