//! Parlor server library logic.

pub mod api;
pub mod api_agents;
pub mod api_conversations;
pub mod api_models;
pub mod api_settings;
pub mod api_transcribe;
pub mod api_upload;
pub mod api_ws;
pub mod attachments;
pub mod background;
pub mod chat;
pub mod config;
pub mod pdf;
pub mod sessions;

use attachments::AttachmentStore;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Extension, Json, Router,
};
use parlor_db::DbPool;
use parlor_llm::LlmClient;
use parlor_voice::{SttService, TtsService};
use pdf::PdfRenderer;
use serde_json::{json, Value};
use sessions::SessionRegistry;
use std::sync::{Arc, RwLock};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: DbPool,
    /// Inference server client.
    pub llm: LlmClient,
    /// Speech-to-text service.
    pub stt: Arc<SttService>,
    /// Text-to-speech service.
    pub tts: Arc<TtsService>,
    /// PDF page probe/renderer.
    pub pdf: PdfRenderer,
    /// In-memory store for uploaded attachments.
    pub attachments: AttachmentStore,
    /// Registry of live WebSocket sessions.
    pub sessions: SessionRegistry,
    /// Model names offered by the inference server, fetched at startup.
    ///
    /// Uses `std::sync::RwLock` intentionally: all lock acquisitions are
    /// brief reads or writes that never span `.await` points, making a
    /// synchronous lock safe and more efficient than `tokio::sync::RwLock`.
    pub models: Arc<RwLock<Vec<String>>>,
    /// The currently selected model.
    pub current_model: Arc<RwLock<String>>,
}

/// Maximum request body size (2 MiB) for the regular JSON API.
const MAX_REQUEST_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Hard ceiling for upload/transcription bodies (64 MiB). The upload
/// handler enforces the user-configured limit below this.
const MAX_UPLOAD_BODY_BYTES: usize = 64 * 1024 * 1024;

/// Health check handler.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    // Upload and transcription need a larger body limit for media payloads.
    let media_routes = Router::new()
        .route("/api/upload", post(api_upload::upload_handler))
        .route("/api/transcribe", post(api_transcribe::transcribe_handler))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BODY_BYTES));

    let router = Router::new()
        .route("/health", get(health))
        .route(
            "/api/agents",
            get(api_agents::list_agents_handler).post(api_agents::create_agent_handler),
        )
        .route(
            "/api/agents/reorder",
            post(api_agents::reorder_agents_handler),
        )
        .route(
            "/api/agents/{agentId}",
            put(api_agents::update_agent_handler).delete(api_agents::delete_agent_handler),
        )
        .route(
            "/api/agents/{agentId}/settings",
            post(api_agents::update_agent_settings_handler),
        )
        .route(
            "/api/conversations",
            get(api_conversations::list_conversations_handler),
        )
        .route(
            "/api/conversations/{agentId}",
            post(api_conversations::save_conversation_handler),
        )
        .route(
            "/api/conversations/{agentId}/{chatId}",
            put(api_conversations::update_conversation_handler)
                .delete(api_conversations::delete_conversation_handler),
        )
        .route(
            "/api/conversations/{agentId}/{chatId}/title",
            put(api_conversations::rename_conversation_handler),
        )
        .route(
            "/api/settings",
            get(api_settings::get_settings_handler).put(api_settings::update_settings_handler),
        )
        .route("/api/models", get(api_models::list_models_handler))
        .route("/api/models/select", post(api_models::select_model_handler))
        .merge(media_routes)
        .route("/ws", get(api_ws::ws_handler));

    // Serve client static files if the directory exists.
    // Configured via PARLOR_CLIENT_DIR env var; defaults to "client/dist".
    let client_dir =
        std::env::var("PARLOR_CLIENT_DIR").unwrap_or_else(|_| "client/dist".to_string());
    let router = if std::path::Path::new(&client_dir).join("index.html").exists() {
        tracing::info!(path = %client_dir, "serving client static files");
        let index = format!("{}/index.html", client_dir);
        router.fallback_service(ServeDir::new(&client_dir).fallback(ServeFile::new(index)))
    } else {
        tracing::info!(path = %client_dir, "client directory not found, skipping static file serving");
        router
    };

    router
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(Extension(Arc::new(state)))
}
