//! The streaming response coordinator.
//!
//! Drives one request/response cycle of model generation: resolves
//! attachment references, opens the token stream, forwards each token to
//! the client, segments the accumulating text into sentences for
//! incremental speech synthesis, polls the session's cancellation flag
//! between tokens, warns when the conversation approaches the context
//! window, and emits the terminal `end` event. Consumed attachments are
//! released unconditionally — on success, error, and cancellation alike.

use crate::api_ws::ServerEvent;
use crate::attachments::AttachmentStore;
use crate::sessions::CancelFlag;
use crate::AppState;
use base64::Engine;
use parlor_llm::{ChatMessage, ChatRequest, LlmError, StreamChunk, TokenStream};
use parlor_types::{ChatTurn, DecodingOptions, SpeechSettings};
use parlor_voice::{clean_for_speech, split_sentences, TtsService};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Warn the client once total token usage reaches this share of the
/// requested context window.
const CONTEXT_WARNING_RATIO: f64 = 0.9;

/// Inputs for one generation turn. Immutable once submitted.
#[derive(Debug, Clone)]
pub struct TurnRequest {
    pub history: Vec<ChatTurn>,
    pub system_message: String,
    pub model: String,
    pub options: DecodingOptions,
    pub speech: SpeechSettings,
}

/// Source of streaming chunks. [`TokenStream`] in production; tests script
/// their own sequences.
pub(crate) trait TokenSource {
    async fn next_chunk(&mut self) -> Option<Result<StreamChunk, LlmError>>;
}

impl TokenSource for TokenStream {
    async fn next_chunk(&mut self) -> Option<Result<StreamChunk, LlmError>> {
        TokenStream::next_chunk(self).await
    }
}

/// Runs one full chat turn for a session.
///
/// Never returns an error: every failure mode ends in events on the
/// session channel and unconditional attachment cleanup.
pub async fn run_chat_turn(
    state: &AppState,
    session_id: Uuid,
    request: TurnRequest,
    cancel: CancelFlag,
    events: &mpsc::Sender<ServerEvent>,
) {
    let (messages, consumed) = resolve_attachments(
        &state.attachments,
        session_id,
        &request.system_message,
        &request.history,
    );

    tracing::info!(
        session_id = %session_id,
        model = %request.model,
        num_ctx = request.options.num_ctx,
        temperature = request.options.temperature,
        top_p = request.options.top_p,
        speech = request.speech.enabled,
        turns = request.history.len(),
        "starting generation"
    );

    let wire_request = ChatRequest {
        model: request.model.clone(),
        messages,
        stream: true,
        options: request.options.into(),
    };

    let outcome = match state.llm.chat_stream(&wire_request).await {
        Ok(stream) => drive_stream(stream, &request, state.tts.as_ref(), &cancel, events).await,
        Err(e) => Err(e),
    };

    if let Err(e) = outcome {
        tracing::error!(session_id = %session_id, "generation failed: {}", e);
        let _ = events
            .send(ServerEvent::Error {
                message: "An error occurred with the AI model.".to_string(),
            })
            .await;
    }

    release_attachments(&state.attachments, session_id, &consumed);
}

/// Resolves attachment ids in the history into inference-server messages.
///
/// Missing or expired ids are logged and skipped; the turn proceeds
/// text-only. Returns the messages (system instruction first) plus the
/// deduplicated list of every referenced attachment id — including missing
/// ones, so cleanup stays unconditional.
fn resolve_attachments(
    store: &AttachmentStore,
    session_id: Uuid,
    system_message: &str,
    history: &[ChatTurn],
) -> (Vec<ChatMessage>, Vec<String>) {
    let mut messages = vec![ChatMessage::system(system_message)];
    let mut consumed: Vec<String> = Vec::new();

    for turn in history {
        let mut images = Vec::new();
        for id in &turn.attachment_ids {
            if !consumed.contains(id) {
                consumed.push(id.clone());
            }
            match store.resolve(id, session_id) {
                Some(pages) => images.extend(pages),
                None => {
                    tracing::warn!(
                        session_id = %session_id,
                        attachment_id = %id,
                        "attachment missing or expired, continuing without it"
                    );
                }
            }
        }

        messages.push(ChatMessage {
            role: turn.role.as_str().to_string(),
            content: turn.content.clone(),
            images: if images.is_empty() { None } else { Some(images) },
        });
    }

    (messages, consumed)
}

/// Deletes every consumed attachment from the store. Idempotent — entries
/// already removed (e.g. by a racing disconnect) are logged and skipped.
fn release_attachments(store: &AttachmentStore, session_id: Uuid, consumed: &[String]) {
    for id in consumed {
        if store.remove(id) {
            tracing::debug!(session_id = %session_id, attachment_id = %id, "released consumed attachment");
        } else {
            tracing::debug!(session_id = %session_id, attachment_id = %id, "attachment already gone");
        }
    }
}

/// Consumes the token stream, multiplexing text and audio to the client.
///
/// Returns `Err` only for inference failures, which the caller turns into
/// a single `error` event. Completion, exhaustion, and cancellation all
/// end with a final sentence-buffer flush and an `end` event.
async fn drive_stream<S: TokenSource>(
    mut stream: S,
    request: &TurnRequest,
    tts: &TtsService,
    cancel: &CancelFlag,
    events: &mpsc::Sender<ServerEvent>,
) -> Result<(), LlmError> {
    let mut full_response = String::new();
    let mut sentence_buffer = String::new();

    while let Some(chunk) = stream.next_chunk().await {
        let chunk = chunk?;

        // Polled between token-emission steps: the current token finishes,
        // nothing further starts. Partial output is kept.
        if cancel.is_cancelled() {
            tracing::info!("generation cancelled by client");
            break;
        }

        if chunk.done {
            finish_stream(&chunk, request.options.num_ctx, events).await;
            break;
        }

        let Some(token) = chunk.token() else {
            continue;
        };

        full_response.push_str(token);
        sentence_buffer.push_str(token);

        if events
            .send(ServerEvent::Token {
                token: token.to_string(),
            })
            .await
            .is_err()
        {
            // Receiver gone: the client disconnected mid-stream.
            break;
        }

        if request.speech.enabled {
            let (sentences, remainder) = split_sentences(&sentence_buffer);
            for sentence in &sentences {
                speak_sentence(tts, &request.speech, sentence, events).await;
            }
            sentence_buffer = remainder;
        }
    }

    // Stream over — whether done, exhausted, or cancelled. Flush whatever
    // is left in the sentence buffer as a final audio chunk.
    if request.speech.enabled && !sentence_buffer.trim().is_empty() {
        speak_sentence(tts, &request.speech, &sentence_buffer, events).await;
    }

    let _ = events
        .send(ServerEvent::End {
            final_message: full_response.trim().to_string(),
        })
        .await;

    Ok(())
}

/// Handles the terminal stream chunk: logs usage statistics and emits a
/// context warning when the conversation is close to the window.
async fn finish_stream(chunk: &StreamChunk, num_ctx: u32, events: &mpsc::Sender<ServerEvent>) {
    let Some(stats) = chunk.stats() else {
        return;
    };

    match stats.tokens_per_second() {
        Some(tps) => tracing::info!(
            prompt_tokens = stats.prompt_tokens,
            completion_tokens = stats.completion_tokens,
            total_tokens = stats.total_tokens(),
            tokens_per_second = %format_args!("{:.2}", tps),
            "finished streaming response"
        ),
        None => tracing::info!(
            prompt_tokens = stats.prompt_tokens,
            completion_tokens = stats.completion_tokens,
            total_tokens = stats.total_tokens(),
            "finished streaming response"
        ),
    }

    let total = stats.total_tokens();
    if (total as f64) >= (num_ctx as f64) * CONTEXT_WARNING_RATIO {
        let message = format!(
            "Context Warning: The chat has used {total} tokens, which is over 90% of the \
             {num_ctx} token limit. The AI may soon lose track of the conversation. \
             Please start a new chat."
        );
        tracing::warn!("{}", message);
        let _ = events.send(ServerEvent::ContextWarning { message }).await;
    }
}

/// Synthesizes one sentence and emits it as an audio chunk.
///
/// Synthesis failure is non-fatal: the sentence's audio is skipped and
/// text streaming continues unaffected.
async fn speak_sentence(
    tts: &TtsService,
    speech: &SpeechSettings,
    sentence: &str,
    events: &mpsc::Sender<ServerEvent>,
) {
    let cleaned = clean_for_speech(sentence);
    if cleaned.is_empty() {
        return;
    }

    let audio = match tts.synthesize(&cleaned, speech).await {
        Ok(audio) => audio,
        Err(e) => {
            tracing::warn!("speech synthesis failed, skipping audio for this sentence: {}", e);
            return;
        }
    };

    let wav = match audio.to_wav() {
        Ok(wav) => wav,
        Err(e) => {
            tracing::warn!("WAV encoding failed, skipping audio for this sentence: {}", e);
            return;
        }
    };

    let encoded = base64::engine::general_purpose::STANDARD.encode(wav);
    let _ = events.send(ServerEvent::AudioChunk { audio: encoded }).await;
}
