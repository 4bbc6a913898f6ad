//! Speech engines and text utilities for the Parlor chat console.
//!
//! The actual speech work is delegated to external engines: STT runs a
//! whisper.cpp-style binary, TTS runs a piper-style binary. This crate
//! wraps those processes and provides the pure text functions the
//! streaming pipeline needs around them:
//!
//! - [`split_sentences`]: sentence segmentation for incremental synthesis
//! - [`clean_for_speech`]: markdown/emoji stripping before synthesis
//! - [`is_garbled`]: post-filter for evidently broken transcriptions

pub mod filter;
pub mod sanitize;
pub mod segment;

mod error;
mod stt;
mod tts;

pub use error::VoiceError;
pub use filter::is_garbled;
pub use sanitize::clean_for_speech;
pub use segment::split_sentences;
pub use stt::SttService;
pub use tts::{SynthesizedAudio, TtsService};
