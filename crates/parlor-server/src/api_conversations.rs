//! Conversation persistence endpoints.

use crate::{api::ApiError, AppState};
use axum::{
    extract::{Extension, Path},
    Json,
};
use parlor_types::{ChatSession, ChatTurn};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Handler for `GET /api/conversations`.
///
/// Returns all saved chats grouped by agent id, newest first.
pub async fn list_conversations_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<BTreeMap<String, Vec<ChatSession>>>, ApiError> {
    let pool = state.pool.clone();
    let grouped = tokio::task::spawn_blocking(move || {
        let conn = pool
            .get()
            .map_err(|e| ApiError::InternalServerError(format!("db connection failed: {}", e)))?;
        parlor_db::list_conversations(&conn).map_err(ApiError::from)
    })
    .await
    .map_err(|e| ApiError::InternalServerError(format!("task join error: {}", e)))??;

    Ok(Json(grouped))
}

/// Handler for `POST /api/conversations/{agentId}`.
pub async fn save_conversation_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(agent_id): Path<String>,
    Json(session): Json<ChatSession>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let pool = state.pool.clone();
    tokio::task::spawn_blocking(move || {
        let conn = pool
            .get()
            .map_err(|e| ApiError::InternalServerError(format!("db connection failed: {}", e)))?;
        parlor_db::save_conversation(&conn, &agent_id, &session).map_err(ApiError::from)
    })
    .await
    .map_err(|e| ApiError::InternalServerError(format!("task join error: {}", e)))??;

    Ok(Json(serde_json::json!({ "status": "saved" })))
}

/// Request body for a history update.
#[derive(Debug, Deserialize)]
pub struct UpdateConversationRequest {
    pub history: Vec<ChatTurn>,
}

/// Handler for `PUT /api/conversations/{agentId}/{chatId}`.
pub async fn update_conversation_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path((agent_id, chat_id)): Path<(String, String)>,
    Json(payload): Json<UpdateConversationRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let pool = state.pool.clone();
    tokio::task::spawn_blocking(move || {
        let conn = pool
            .get()
            .map_err(|e| ApiError::InternalServerError(format!("db connection failed: {}", e)))?;
        parlor_db::update_conversation_history(&conn, &agent_id, &chat_id, &payload.history)
            .map_err(ApiError::from)
    })
    .await
    .map_err(|e| ApiError::InternalServerError(format!("task join error: {}", e)))??;

    Ok(Json(serde_json::json!({ "status": "updated" })))
}

/// Request body for a title change.
#[derive(Debug, Deserialize)]
pub struct RenameRequest {
    pub title: String,
}

/// Handler for `PUT /api/conversations/{agentId}/{chatId}/title`.
pub async fn rename_conversation_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path((agent_id, chat_id)): Path<(String, String)>,
    Json(payload): Json<RenameRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let title = payload.title.trim().to_string();
    if title.is_empty() {
        return Err(ApiError::BadRequest("invalid or missing title".to_string()));
    }

    let pool = state.pool.clone();
    let response_title = title.clone();
    tokio::task::spawn_blocking(move || {
        let conn = pool
            .get()
            .map_err(|e| ApiError::InternalServerError(format!("db connection failed: {}", e)))?;
        parlor_db::rename_conversation(&conn, &agent_id, &chat_id, &title).map_err(ApiError::from)
    })
    .await
    .map_err(|e| ApiError::InternalServerError(format!("task join error: {}", e)))??;

    Ok(Json(serde_json::json!({
        "status": "title updated",
        "newTitle": response_title,
    })))
}

/// Handler for `DELETE /api/conversations/{agentId}/{chatId}`.
pub async fn delete_conversation_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path((agent_id, chat_id)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let pool = state.pool.clone();
    tokio::task::spawn_blocking(move || {
        let conn = pool
            .get()
            .map_err(|e| ApiError::InternalServerError(format!("db connection failed: {}", e)))?;
        parlor_db::delete_conversation(&conn, &agent_id, &chat_id).map_err(ApiError::from)
    })
    .await
    .map_err(|e| ApiError::InternalServerError(format!("task join error: {}", e)))??;

    Ok(Json(serde_json::json!({ "status": "deleted" })))
}
