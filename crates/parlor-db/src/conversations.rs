//! Query helpers for saved conversations.

use crate::StoreError;
use parlor_types::{ChatSession, ChatTurn};
use rusqlite::{params, Connection};
use std::collections::BTreeMap;

/// Lists all saved chats, grouped by agent, newest first within each agent.
pub fn list_conversations(
    conn: &Connection,
) -> Result<BTreeMap<String, Vec<ChatSession>>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT agent_id, chat_id, title, updated_at, history_json
         FROM conversations
         ORDER BY agent_id, updated_at DESC",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
        ))
    })?;

    let mut grouped: BTreeMap<String, Vec<ChatSession>> = BTreeMap::new();
    for row in rows {
        let (agent_id, chat_id, title, updated_at, history_json) = row?;
        let history: Vec<ChatTurn> = serde_json::from_str(&history_json)?;
        grouped.entry(agent_id).or_default().push(ChatSession {
            id: chat_id,
            timestamp: updated_at,
            title,
            history,
        });
    }
    Ok(grouped)
}

/// Saves a new chat session under an agent.
pub fn save_conversation(
    conn: &Connection,
    agent_id: &str,
    session: &ChatSession,
) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO conversations (agent_id, chat_id, title, updated_at, history_json)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            agent_id,
            session.id,
            session.title,
            session.timestamp,
            serde_json::to_string(&session.history)?,
        ],
    )?;
    Ok(())
}

/// Replaces a chat's history and bumps its timestamp so it sorts first.
pub fn update_conversation_history(
    conn: &Connection,
    agent_id: &str,
    chat_id: &str,
    history: &[ChatTurn],
) -> Result<(), StoreError> {
    let updated = conn.execute(
        "UPDATE conversations SET history_json = ?3, updated_at = ?4
         WHERE agent_id = ?1 AND chat_id = ?2",
        params![
            agent_id,
            chat_id,
            serde_json::to_string(history)?,
            chrono::Utc::now().to_rfc3339(),
        ],
    )?;
    if updated == 0 {
        return Err(StoreError::NotFound(format!("chat {agent_id}/{chat_id}")));
    }
    Ok(())
}

/// Renames a chat. The timestamp is deliberately untouched — renaming
/// should not reorder the history panel.
pub fn rename_conversation(
    conn: &Connection,
    agent_id: &str,
    chat_id: &str,
    title: &str,
) -> Result<(), StoreError> {
    let updated = conn.execute(
        "UPDATE conversations SET title = ?3 WHERE agent_id = ?1 AND chat_id = ?2",
        params![agent_id, chat_id, title],
    )?;
    if updated == 0 {
        return Err(StoreError::NotFound(format!("chat {agent_id}/{chat_id}")));
    }
    Ok(())
}

/// Deletes a chat.
pub fn delete_conversation(
    conn: &Connection,
    agent_id: &str,
    chat_id: &str,
) -> Result<(), StoreError> {
    let deleted = conn.execute(
        "DELETE FROM conversations WHERE agent_id = ?1 AND chat_id = ?2",
        params![agent_id, chat_id],
    )?;
    if deleted == 0 {
        return Err(StoreError::NotFound(format!("chat {agent_id}/{chat_id}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_agent, run_migrations};
    use parlor_types::{Agent, AgentKind, ChatRole};

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().expect("in-memory db");
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        run_migrations(&conn).expect("migrations");
        create_agent(
            &conn,
            &Agent {
                id: "assistant".to_string(),
                name: "A".to_string(),
                title: "t".to_string(),
                persona: "p".to_string(),
                color: "#000".to_string(),
                kind: AgentKind::MultiTurn,
                is_default: false,
                model: None,
                settings: None,
            },
        )
        .unwrap();
        conn
    }

    fn sample_session(id: &str, timestamp: &str) -> ChatSession {
        ChatSession {
            id: id.to_string(),
            timestamp: timestamp.to_string(),
            title: "First chat".to_string(),
            history: vec![
                ChatTurn::text(ChatRole::User, "hi"),
                ChatTurn::text(ChatRole::Assistant, "hello"),
            ],
        }
    }

    #[test]
    fn save_and_list_round_trip() {
        let conn = test_conn();
        save_conversation(&conn, "assistant", &sample_session("c1", "2026-01-01T00:00:00Z"))
            .unwrap();
        save_conversation(&conn, "assistant", &sample_session("c2", "2026-01-02T00:00:00Z"))
            .unwrap();

        let grouped = list_conversations(&conn).unwrap();
        let chats = &grouped["assistant"];
        assert_eq!(chats.len(), 2);
        // Newest first
        assert_eq!(chats[0].id, "c2");
        assert_eq!(chats[1].history.len(), 2);
    }

    #[test]
    fn update_history_moves_chat_to_front() {
        let conn = test_conn();
        save_conversation(&conn, "assistant", &sample_session("c1", "2026-01-01T00:00:00Z"))
            .unwrap();
        save_conversation(&conn, "assistant", &sample_session("c2", "2026-01-02T00:00:00Z"))
            .unwrap();

        let new_history = vec![ChatTurn::text(ChatRole::User, "again")];
        update_conversation_history(&conn, "assistant", "c1", &new_history).unwrap();

        let grouped = list_conversations(&conn).unwrap();
        let chats = &grouped["assistant"];
        assert_eq!(chats[0].id, "c1");
        assert_eq!(chats[0].history, new_history);
    }

    #[test]
    fn rename_does_not_reorder() {
        let conn = test_conn();
        save_conversation(&conn, "assistant", &sample_session("c1", "2026-01-01T00:00:00Z"))
            .unwrap();
        save_conversation(&conn, "assistant", &sample_session("c2", "2026-01-02T00:00:00Z"))
            .unwrap();

        rename_conversation(&conn, "assistant", "c1", "Renamed").unwrap();

        let grouped = list_conversations(&conn).unwrap();
        let chats = &grouped["assistant"];
        assert_eq!(chats[0].id, "c2");
        assert_eq!(chats[1].title, "Renamed");
    }

    #[test]
    fn delete_unknown_chat_is_not_found() {
        let conn = test_conn();
        let err = delete_conversation(&conn, "assistant", "ghost").unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn deleting_agent_cascades_conversations() {
        let conn = test_conn();
        save_conversation(&conn, "assistant", &sample_session("c1", "2026-01-01T00:00:00Z"))
            .unwrap();

        crate::delete_agent(&conn, "assistant").unwrap();

        let grouped = list_conversations(&conn).unwrap();
        assert!(grouped.is_empty());
    }
}
