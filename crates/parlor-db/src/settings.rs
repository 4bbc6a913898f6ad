//! Query helpers for the user settings record and last-selected model.

use crate::StoreError;
use parlor_types::UserSettings;
use rusqlite::{params, Connection, OptionalExtension};

const SETTINGS_KEY: &str = "user_settings";
const LAST_MODEL_KEY: &str = "last_model";

/// Loads the user settings, falling back to defaults when the record is
/// missing or unreadable.
pub fn load_settings(conn: &Connection) -> Result<UserSettings, StoreError> {
    let json: Option<String> = conn
        .query_row(
            "SELECT value FROM app_state WHERE key = ?1",
            [SETTINGS_KEY],
            |row| row.get(0),
        )
        .optional()?;

    match json {
        Some(json) => match serde_json::from_str(&json) {
            Ok(settings) => Ok(settings),
            Err(e) => {
                tracing::warn!("stored settings unreadable, using defaults: {}", e);
                Ok(UserSettings::default())
            }
        },
        None => Ok(UserSettings::default()),
    }
}

/// Persists the full user settings record.
pub fn save_settings(conn: &Connection, settings: &UserSettings) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO app_state (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        params![SETTINGS_KEY, serde_json::to_string(settings)?],
    )?;
    Ok(())
}

/// Returns the last-selected model name, if one was persisted.
pub fn load_last_model(conn: &Connection) -> Result<Option<String>, StoreError> {
    let model: Option<String> = conn
        .query_row(
            "SELECT value FROM app_state WHERE key = ?1",
            [LAST_MODEL_KEY],
            |row| row.get(0),
        )
        .optional()?;
    Ok(model)
}

/// Persists the selected model name so a restart re-selects it.
pub fn save_last_model(conn: &Connection, model: &str) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO app_state (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        params![LAST_MODEL_KEY, model],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run_migrations;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().expect("in-memory db");
        run_migrations(&conn).expect("migrations");
        conn
    }

    #[test]
    fn missing_settings_yield_defaults() {
        let conn = test_conn();
        let settings = load_settings(&conn).unwrap();
        assert_eq!(settings, UserSettings::default());
    }

    #[test]
    fn settings_round_trip() {
        let conn = test_conn();
        let mut settings = UserSettings::default();
        settings.speech.enabled = false;
        settings.decoding.num_ctx = 32_000;

        save_settings(&conn, &settings).unwrap();
        let loaded = load_settings(&conn).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn corrupt_settings_fall_back_to_defaults() {
        let conn = test_conn();
        conn.execute(
            "INSERT INTO app_state (key, value) VALUES ('user_settings', 'not json')",
            [],
        )
        .unwrap();

        let settings = load_settings(&conn).unwrap();
        assert_eq!(settings, UserSettings::default());
    }

    #[test]
    fn last_model_round_trip() {
        let conn = test_conn();
        assert_eq!(load_last_model(&conn).unwrap(), None);

        save_last_model(&conn, "gemma3:4b").unwrap();
        save_last_model(&conn, "qwen3:8b").unwrap();
        assert_eq!(load_last_model(&conn).unwrap().as_deref(), Some("qwen3:8b"));
    }
}
