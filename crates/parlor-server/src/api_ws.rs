//! WebSocket chat endpoint.
//!
//! Each connection gets a session (registered in [`SessionRegistry`]) and a
//! bounded event channel. A forwarding task serializes [`ServerEvent`]s to
//! the socket; the receive loop handles client commands. Chat turns run in
//! a spawned task so the receive loop stays free to deliver `stop` signals
//! while a generation is in flight.

use crate::chat::{self, TurnRequest};
use crate::AppState;
use axum::{
    extract::{
        ws::{Message as AxumMessage, WebSocket},
        Extension, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use parlor_types::{ChatTurn, DecodingOptions, SpeechSettings};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, PoisonError};
use tokio::sync::mpsc;
use uuid::Uuid;

fn default_system_message() -> String {
    "You are a helpful assistant.".to_string()
}

/// Incoming WebSocket commands.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientCommand {
    /// Start a generation turn.
    Chat {
        history: Vec<ChatTurn>,
        #[serde(rename = "systemMessage", default = "default_system_message")]
        system_message: String,
        /// Model override; the server's current model when absent.
        #[serde(default)]
        model: Option<String>,
        #[serde(default)]
        options: DecodingOptions,
        #[serde(default)]
        speech: SpeechSettings,
    },
    /// Cooperatively stop the in-flight generation.
    Stop,
}

/// Outgoing WebSocket events.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Issued once after connect; uploads must carry this id.
    #[serde(rename_all = "camelCase")]
    Session { session_id: String },
    /// One incremental text fragment.
    Token { token: String },
    /// One sentence of synthesized speech, base64-encoded WAV.
    AudioChunk { audio: String },
    /// Advisory: conversation is close to the context window.
    ContextWarning { message: String },
    /// Terminal failure for the current request.
    Error { message: String },
    /// Terminal event carrying the full consolidated response text.
    #[serde(rename_all = "camelCase")]
    End { final_message: String },
}

/// Capacity of the per-session event channel. Audio chunks are large but
/// few; 256 events buffers normal operation, beyond that the client is too
/// slow and the generation loop back-pressures on `send`.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// WebSocket handler: `GET /ws`.
pub async fn ws_handler(
    Extension(state): Extension<Arc<AppState>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handles one WebSocket connection for its whole lifetime.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    let (tx, mut rx) = mpsc::channel::<ServerEvent>(EVENT_CHANNEL_CAPACITY);
    let session_id = state.sessions.register(tx.clone()).await;
    tracing::info!(session_id = %session_id, "client connected");

    // Forward events from the session channel to the socket.
    let send_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match serde_json::to_string(&event) {
                Ok(json) => {
                    if sender.send(AxumMessage::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::error!("failed to serialize server event: {}", e);
                }
            }
        }
    });

    // Tell the client its session id so uploads can be scoped to it.
    let _ = tx
        .send(ServerEvent::Session {
            session_id: session_id.to_string(),
        })
        .await;

    while let Some(Ok(msg)) = receiver.next().await {
        match msg {
            AxumMessage::Text(text) => {
                match serde_json::from_str::<ClientCommand>(&text.to_string()) {
                    Ok(ClientCommand::Chat {
                        history,
                        system_message,
                        model,
                        options,
                        speech,
                    }) => {
                        start_chat_turn(
                            &state,
                            session_id,
                            &tx,
                            history,
                            system_message,
                            model,
                            options,
                            speech,
                        )
                        .await;
                    }
                    Ok(ClientCommand::Stop) => {
                        tracing::info!(session_id = %session_id, "stop requested");
                        state.sessions.trigger_stop(session_id).await;
                    }
                    Err(e) => {
                        tracing::warn!(session_id = %session_id, "unparseable client command: {}", e);
                        let _ = tx
                            .send(ServerEvent::Error {
                                message: "invalid message format".to_string(),
                            })
                            .await;
                    }
                }
            }
            AxumMessage::Close(_) => break,
            _ => {}
        }
    }

    // Disconnect cleanup: stop any in-flight generation, unregister the
    // session, and drop its attachments.
    state.sessions.trigger_stop(session_id).await;
    state.sessions.remove(session_id).await;
    let purged = state.attachments.purge_session(session_id);
    if purged > 0 {
        tracing::info!(session_id = %session_id, count = purged, "dropped attachments on disconnect");
    }
    send_task.abort();
    tracing::info!(session_id = %session_id, "client disconnected");
}

/// Claims the session's generation slot and spawns the coordinator task.
#[allow(clippy::too_many_arguments)]
async fn start_chat_turn(
    state: &Arc<AppState>,
    session_id: Uuid,
    tx: &mpsc::Sender<ServerEvent>,
    history: Vec<ChatTurn>,
    system_message: String,
    model: Option<String>,
    options: DecodingOptions,
    speech: SpeechSettings,
) {
    let Some(cancel) = state.sessions.begin_generation(session_id).await else {
        let _ = tx
            .send(ServerEvent::Error {
                message: "A response is already being generated.".to_string(),
            })
            .await;
        return;
    };

    let model = model.filter(|m| !m.is_empty()).unwrap_or_else(|| {
        state
            .current_model
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    });

    let request = TurnRequest {
        history,
        system_message,
        model,
        options,
        speech,
    };

    let state = state.clone();
    let events = tx.clone();
    tokio::spawn(async move {
        chat::run_chat_turn(&state, session_id, request, cancel, &events).await;
        state.sessions.end_generation(session_id).await;
    });
}
