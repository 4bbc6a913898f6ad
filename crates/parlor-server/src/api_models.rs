//! Model listing and selection endpoints.

use crate::{api::ApiError, AppState};
use axum::{extract::Extension, Json};
use serde::Deserialize;
use std::sync::{Arc, PoisonError};

#[derive(Debug, Deserialize)]
pub struct SelectModelRequest {
    pub model: String,
}

/// Handler for `GET /api/models`.
///
/// Returns the model names fetched from the inference server at startup
/// plus the currently selected model.
pub async fn list_models_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Json<serde_json::Value> {
    let models = state
        .models
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone();
    let current = state
        .current_model
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone();

    Json(serde_json::json!({
        "models": models,
        "current": current,
    }))
}

/// Handler for `POST /api/models/select`.
///
/// Switches the active model. The choice must be one of the listed models
/// and is persisted so a restart re-selects it.
pub async fn select_model_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<SelectModelRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let known = state
        .models
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .contains(&payload.model);

    if !known {
        return Err(ApiError::BadRequest(format!(
            "Model '{}' not found in the available list.",
            payload.model
        )));
    }

    {
        let mut current = state
            .current_model
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *current = payload.model.clone();
    }

    let pool = state.pool.clone();
    let model = payload.model.clone();
    tokio::task::spawn_blocking(move || {
        let conn = pool
            .get()
            .map_err(|e| ApiError::InternalServerError(format!("db connection failed: {}", e)))?;
        parlor_db::save_last_model(&conn, &model).map_err(|e| {
            ApiError::InternalServerError(format!("failed to persist model choice: {}", e))
        })
    })
    .await
    .map_err(|e| ApiError::InternalServerError(format!("task join error: {}", e)))??;

    tracing::info!(model = %payload.model, "model changed");

    Ok(Json(serde_json::json!({
        "status": "success",
        "currentModel": payload.model,
    })))
}
