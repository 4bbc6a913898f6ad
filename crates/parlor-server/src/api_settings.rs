//! User settings endpoints.
//!
//! Updates are merged: the client may send only the keys it changed and
//! everything else keeps its stored value. The merged result must still
//! deserialize into a valid settings record before it is persisted.

use crate::{api::ApiError, AppState};
use axum::{extract::Extension, Json};
use parlor_types::UserSettings;
use std::sync::Arc;

/// Recursively merges `patch` into `base`. Objects merge key-by-key;
/// everything else is replaced.
fn merge_json(base: &mut serde_json::Value, patch: serde_json::Value) {
    match (base, patch) {
        (serde_json::Value::Object(base_map), serde_json::Value::Object(patch_map)) => {
            for (key, value) in patch_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge_json(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base_slot, patch_value) => *base_slot = patch_value,
    }
}

/// Handler for `GET /api/settings`.
pub async fn get_settings_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<UserSettings>, ApiError> {
    let pool = state.pool.clone();
    let settings = tokio::task::spawn_blocking(move || {
        let conn = pool
            .get()
            .map_err(|e| ApiError::InternalServerError(format!("db connection failed: {}", e)))?;
        parlor_db::load_settings(&conn).map_err(ApiError::from)
    })
    .await
    .map_err(|e| ApiError::InternalServerError(format!("task join error: {}", e)))??;

    Ok(Json(settings))
}

/// Handler for `PUT /api/settings`.
pub async fn update_settings_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(patch): Json<serde_json::Value>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let pool = state.pool.clone();
    tokio::task::spawn_blocking(move || {
        let conn = pool
            .get()
            .map_err(|e| ApiError::InternalServerError(format!("db connection failed: {}", e)))?;

        let current = parlor_db::load_settings(&conn).map_err(ApiError::from)?;
        let mut merged = serde_json::to_value(&current)
            .map_err(|e| ApiError::InternalServerError(e.to_string()))?;
        merge_json(&mut merged, patch);

        let settings: UserSettings = serde_json::from_value(merged)
            .map_err(|e| ApiError::BadRequest(format!("invalid settings: {}", e)))?;

        parlor_db::save_settings(&conn, &settings).map_err(ApiError::from)?;
        tracing::info!("saved new user settings");
        Ok::<_, ApiError>(())
    })
    .await
    .map_err(|e| ApiError::InternalServerError(format!("task join error: {}", e)))??;

    Ok(Json(serde_json::json!({ "status": "success" })))
}
