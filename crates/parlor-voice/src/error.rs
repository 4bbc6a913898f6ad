use thiserror::Error;

#[derive(Error, Debug)]
pub enum VoiceError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("TTS error: {0}")]
    Tts(String),

    #[error("STT error: {0}")]
    Stt(String),
}
