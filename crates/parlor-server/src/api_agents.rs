//! Agent CRUD endpoints.

use crate::{api::ApiError, AppState};
use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    Json,
};
use parlor_db::AgentUpdate;
use parlor_types::{Agent, AgentKind};
use serde::Deserialize;
use std::sync::{Arc, PoisonError};

/// Handler for `GET /api/agents`.
pub async fn list_agents_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Vec<Agent>>, ApiError> {
    let pool = state.pool.clone();
    let agents = tokio::task::spawn_blocking(move || {
        let conn = pool
            .get()
            .map_err(|e| ApiError::InternalServerError(format!("db connection failed: {}", e)))?;
        parlor_db::list_agents(&conn).map_err(ApiError::from)
    })
    .await
    .map_err(|e| ApiError::InternalServerError(format!("task join error: {}", e)))??;

    Ok(Json(agents))
}

/// Request body for agent creation.
#[derive(Debug, Deserialize)]
pub struct CreateAgentRequest {
    pub id: String,
    pub name: String,
    pub title: String,
    pub persona: String,
    #[serde(rename = "type")]
    pub kind: AgentKind,
    #[serde(default)]
    pub color: Option<String>,
}

/// Handler for `POST /api/agents`.
///
/// New agents are inserted at the front of the sidebar and snapshot the
/// current model and user settings as their starting configuration.
pub async fn create_agent_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<CreateAgentRequest>,
) -> Result<(StatusCode, Json<Agent>), ApiError> {
    if payload.id.trim().is_empty() || payload.name.trim().is_empty() {
        return Err(ApiError::BadRequest("missing agent data".to_string()));
    }

    let current_model = state
        .current_model
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone();

    let pool = state.pool.clone();
    let agent = tokio::task::spawn_blocking(move || {
        let conn = pool
            .get()
            .map_err(|e| ApiError::InternalServerError(format!("db connection failed: {}", e)))?;

        let settings = parlor_db::load_settings(&conn).map_err(ApiError::from)?;
        let agent = Agent {
            id: payload.id,
            name: payload.name,
            title: payload.title,
            persona: payload.persona,
            color: payload.color.unwrap_or_else(|| "#4f46e5".to_string()),
            kind: payload.kind,
            is_default: false,
            model: Some(current_model),
            settings: Some(
                serde_json::to_value(&settings)
                    .map_err(|e| ApiError::InternalServerError(e.to_string()))?,
            ),
        };
        parlor_db::create_agent(&conn, &agent).map_err(ApiError::from)?;
        Ok::<_, ApiError>(agent)
    })
    .await
    .map_err(|e| ApiError::InternalServerError(format!("task join error: {}", e)))??;

    Ok((StatusCode::CREATED, Json(agent)))
}

/// Request body for agent updates. Absent fields are unchanged.
#[derive(Debug, Deserialize)]
pub struct UpdateAgentRequest {
    pub name: Option<String>,
    pub title: Option<String>,
    pub persona: Option<String>,
    pub color: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<AgentKind>,
    pub model: Option<String>,
}

/// Handler for `PUT /api/agents/{agentId}`.
pub async fn update_agent_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(agent_id): Path<String>,
    Json(payload): Json<UpdateAgentRequest>,
) -> Result<Json<Agent>, ApiError> {
    let pool = state.pool.clone();
    let agent = tokio::task::spawn_blocking(move || {
        let conn = pool
            .get()
            .map_err(|e| ApiError::InternalServerError(format!("db connection failed: {}", e)))?;
        let update = AgentUpdate {
            name: payload.name,
            title: payload.title,
            persona: payload.persona,
            color: payload.color,
            kind: payload.kind,
            model: payload.model,
        };
        parlor_db::update_agent(&conn, &agent_id, &update).map_err(ApiError::from)
    })
    .await
    .map_err(|e| ApiError::InternalServerError(format!("task join error: {}", e)))??;

    Ok(Json(agent))
}

/// Handler for `POST /api/agents/{agentId}/settings`.
///
/// Replaces the agent's settings overrides with the given JSON object.
pub async fn update_agent_settings_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(agent_id): Path<String>,
    Json(settings): Json<serde_json::Value>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let pool = state.pool.clone();
    tokio::task::spawn_blocking(move || {
        let conn = pool
            .get()
            .map_err(|e| ApiError::InternalServerError(format!("db connection failed: {}", e)))?;
        parlor_db::update_agent_settings(&conn, &agent_id, &settings).map_err(ApiError::from)
    })
    .await
    .map_err(|e| ApiError::InternalServerError(format!("task join error: {}", e)))??;

    Ok(Json(serde_json::json!({ "status": "success" })))
}

/// Request body for agent reordering.
#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    pub order: Vec<String>,
}

/// Handler for `POST /api/agents/reorder`.
pub async fn reorder_agents_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<ReorderRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let pool = state.pool.clone();
    tokio::task::spawn_blocking(move || {
        let conn = pool
            .get()
            .map_err(|e| ApiError::InternalServerError(format!("db connection failed: {}", e)))?;
        parlor_db::reorder_agents(&conn, &payload.order).map_err(ApiError::from)
    })
    .await
    .map_err(|e| ApiError::InternalServerError(format!("task join error: {}", e)))??;

    Ok(Json(serde_json::json!({ "status": "success" })))
}

/// Handler for `DELETE /api/agents/{agentId}`.
pub async fn delete_agent_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(agent_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let pool = state.pool.clone();
    tokio::task::spawn_blocking(move || {
        let conn = pool
            .get()
            .map_err(|e| ApiError::InternalServerError(format!("db connection failed: {}", e)))?;
        parlor_db::delete_agent(&conn, &agent_id).map_err(ApiError::from)
    })
    .await
    .map_err(|e| ApiError::InternalServerError(format!("task join error: {}", e)))??;

    Ok(Json(serde_json::json!({ "status": "deleted" })))
}
