//! Query helpers for agent personas.

use crate::StoreError;
use parlor_types::{Agent, AgentKind};
use rusqlite::{params, Connection, OptionalExtension, Row};

fn kind_to_str(kind: AgentKind) -> &'static str {
    match kind {
        AgentKind::MultiTurn => "multi-turn",
        AgentKind::SingleTurn => "single-turn",
    }
}

fn kind_from_str(s: &str) -> AgentKind {
    match s {
        "single-turn" => AgentKind::SingleTurn,
        _ => AgentKind::MultiTurn,
    }
}

fn agent_from_row(row: &Row<'_>) -> rusqlite::Result<(Agent, Option<String>)> {
    let kind: String = row.get(5)?;
    let settings_json: Option<String> = row.get(8)?;
    Ok((
        Agent {
            id: row.get(0)?,
            name: row.get(1)?,
            title: row.get(2)?,
            persona: row.get(3)?,
            color: row.get(4)?,
            kind: kind_from_str(&kind),
            is_default: row.get(6)?,
            model: row.get(7)?,
            settings: None,
        },
        settings_json,
    ))
}

const AGENT_COLUMNS: &str =
    "id, name, title, persona, color, kind, is_default, model, settings_json";

/// Seeds the default agent if no default row exists yet.
///
/// Returns `true` if the row was inserted.
pub fn seed_default_agent(conn: &Connection) -> Result<bool, StoreError> {
    let exists: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM agents WHERE is_default = 1",
        [],
        |row| row.get(0),
    )?;
    if exists {
        return Ok(false);
    }

    let agent = Agent::default_agent();
    let position: i64 = conn.query_row(
        "SELECT COALESCE(MIN(position), 1) - 1 FROM agents",
        [],
        |row| row.get(0),
    )?;
    conn.execute(
        "INSERT INTO agents (id, name, title, persona, color, kind, is_default, position)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1, ?7)",
        params![
            agent.id,
            agent.name,
            agent.title,
            agent.persona,
            agent.color,
            kind_to_str(agent.kind),
            position,
        ],
    )?;
    tracing::info!(agent_id = %agent.id, "seeded default agent");
    Ok(true)
}

/// Lists all agents in sidebar order.
pub fn list_agents(conn: &Connection) -> Result<Vec<Agent>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {AGENT_COLUMNS} FROM agents ORDER BY position ASC"
    ))?;
    let rows = stmt.query_map([], agent_from_row)?;

    let mut agents = Vec::new();
    for row in rows {
        let (mut agent, settings_json) = row?;
        if let Some(json) = settings_json {
            agent.settings = Some(serde_json::from_str(&json)?);
        }
        agents.push(agent);
    }
    Ok(agents)
}

/// Inserts a new agent at the front of the sidebar order.
pub fn create_agent(conn: &Connection, agent: &Agent) -> Result<(), StoreError> {
    let position: i64 = conn.query_row(
        "SELECT COALESCE(MIN(position), 1) - 1 FROM agents",
        [],
        |row| row.get(0),
    )?;
    let settings_json = agent
        .settings
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;
    conn.execute(
        "INSERT INTO agents (id, name, title, persona, color, kind, is_default, position, model, settings_json)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7, ?8, ?9)",
        params![
            agent.id,
            agent.name,
            agent.title,
            agent.persona,
            agent.color,
            kind_to_str(agent.kind),
            position,
            agent.model,
            settings_json,
        ],
    )?;
    Ok(())
}

/// Mutable fields of an agent. Fields left `None` are unchanged.
#[derive(Debug, Clone, Default)]
pub struct AgentUpdate {
    pub name: Option<String>,
    pub title: Option<String>,
    pub persona: Option<String>,
    pub color: Option<String>,
    pub kind: Option<AgentKind>,
    pub model: Option<String>,
}

fn is_default_agent(conn: &Connection, agent_id: &str) -> Result<bool, StoreError> {
    conn.query_row(
        "SELECT is_default FROM agents WHERE id = ?1",
        [agent_id],
        |row| row.get(0),
    )
    .optional()?
    .ok_or_else(|| StoreError::NotFound(format!("agent {agent_id}")))
}

/// Applies an update to a non-default agent.
pub fn update_agent(
    conn: &Connection,
    agent_id: &str,
    update: &AgentUpdate,
) -> Result<Agent, StoreError> {
    if is_default_agent(conn, agent_id)? {
        return Err(StoreError::DefaultAgentProtected);
    }

    conn.execute(
        "UPDATE agents SET
            name    = COALESCE(?2, name),
            title   = COALESCE(?3, title),
            persona = COALESCE(?4, persona),
            color   = COALESCE(?5, color),
            kind    = COALESCE(?6, kind),
            model   = COALESCE(?7, model)
         WHERE id = ?1",
        params![
            agent_id,
            update.name,
            update.title,
            update.persona,
            update.color,
            update.kind.map(kind_to_str),
            update.model,
        ],
    )?;

    get_agent(conn, agent_id)
}

/// Replaces a non-default agent's settings overrides.
pub fn update_agent_settings(
    conn: &Connection,
    agent_id: &str,
    settings: &serde_json::Value,
) -> Result<(), StoreError> {
    if is_default_agent(conn, agent_id)? {
        return Err(StoreError::DefaultAgentProtected);
    }

    conn.execute(
        "UPDATE agents SET settings_json = ?2 WHERE id = ?1",
        params![agent_id, serde_json::to_string(settings)?],
    )?;
    Ok(())
}

fn get_agent(conn: &Connection, agent_id: &str) -> Result<Agent, StoreError> {
    let result = conn
        .query_row(
            &format!("SELECT {AGENT_COLUMNS} FROM agents WHERE id = ?1"),
            [agent_id],
            agent_from_row,
        )
        .optional()?;

    match result {
        Some((mut agent, settings_json)) => {
            if let Some(json) = settings_json {
                agent.settings = Some(serde_json::from_str(&json)?);
            }
            Ok(agent)
        }
        None => Err(StoreError::NotFound(format!("agent {agent_id}"))),
    }
}

/// Rewrites the sidebar order from an explicit id list.
///
/// The list must name every stored agent exactly once.
pub fn reorder_agents(conn: &Connection, ordered_ids: &[String]) -> Result<(), StoreError> {
    let count: usize = conn.query_row("SELECT COUNT(*) FROM agents", [], |row| row.get(0))?;
    if ordered_ids.len() != count {
        return Err(StoreError::InvalidReorder(format!(
            "expected {count} agent ids, got {}",
            ordered_ids.len()
        )));
    }

    let tx = conn.unchecked_transaction()?;
    for (position, agent_id) in ordered_ids.iter().enumerate() {
        let updated = tx.execute(
            "UPDATE agents SET position = ?2 WHERE id = ?1",
            params![agent_id, position as i64],
        )?;
        if updated == 0 {
            return Err(StoreError::InvalidReorder(format!(
                "unknown agent id {agent_id}"
            )));
        }
    }
    tx.commit()?;
    Ok(())
}

/// Deletes a non-default agent. Its conversations cascade.
pub fn delete_agent(conn: &Connection, agent_id: &str) -> Result<(), StoreError> {
    if is_default_agent(conn, agent_id)? {
        return Err(StoreError::DefaultAgentProtected);
    }
    conn.execute("DELETE FROM agents WHERE id = ?1", [agent_id])?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run_migrations;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().expect("in-memory db");
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        run_migrations(&conn).expect("migrations");
        conn
    }

    fn sample_agent(id: &str) -> Agent {
        Agent {
            id: id.to_string(),
            name: "Pirate".to_string(),
            title: "Talks like a pirate".to_string(),
            persona: "You are a pirate.".to_string(),
            color: "#112233".to_string(),
            kind: AgentKind::MultiTurn,
            is_default: false,
            model: Some("gemma3:4b".to_string()),
            settings: None,
        }
    }

    #[test]
    fn seed_is_idempotent() {
        let conn = test_conn();
        assert!(seed_default_agent(&conn).unwrap());
        assert!(!seed_default_agent(&conn).unwrap());

        let agents = list_agents(&conn).unwrap();
        assert_eq!(agents.len(), 1);
        assert!(agents[0].is_default);
    }

    #[test]
    fn create_inserts_at_front() {
        let conn = test_conn();
        seed_default_agent(&conn).unwrap();
        create_agent(&conn, &sample_agent("pirate")).unwrap();

        let agents = list_agents(&conn).unwrap();
        assert_eq!(agents[0].id, "pirate");
        assert_eq!(agents[1].id, "assistant");
    }

    #[test]
    fn default_agent_is_protected() {
        let conn = test_conn();
        seed_default_agent(&conn).unwrap();

        let err = update_agent(&conn, "assistant", &AgentUpdate::default()).unwrap_err();
        assert!(matches!(err, StoreError::DefaultAgentProtected));

        let err = delete_agent(&conn, "assistant").unwrap_err();
        assert!(matches!(err, StoreError::DefaultAgentProtected));
    }

    #[test]
    fn update_changes_only_given_fields() {
        let conn = test_conn();
        create_agent(&conn, &sample_agent("pirate")).unwrap();

        let updated = update_agent(
            &conn,
            "pirate",
            &AgentUpdate {
                name: Some("Corsair".to_string()),
                ..AgentUpdate::default()
            },
        )
        .unwrap();

        assert_eq!(updated.name, "Corsair");
        assert_eq!(updated.title, "Talks like a pirate");
        assert_eq!(updated.model.as_deref(), Some("gemma3:4b"));
    }

    #[test]
    fn reorder_requires_permutation() {
        let conn = test_conn();
        seed_default_agent(&conn).unwrap();
        create_agent(&conn, &sample_agent("pirate")).unwrap();

        let err = reorder_agents(&conn, &["assistant".to_string()]).unwrap_err();
        assert!(matches!(err, StoreError::InvalidReorder(_)));

        reorder_agents(&conn, &["assistant".to_string(), "pirate".to_string()]).unwrap();
        let agents = list_agents(&conn).unwrap();
        assert_eq!(agents[0].id, "assistant");
        assert_eq!(agents[1].id, "pirate");
    }

    #[test]
    fn reorder_rejects_unknown_id() {
        let conn = test_conn();
        seed_default_agent(&conn).unwrap();

        let err = reorder_agents(&conn, &["ghost".to_string()]).unwrap_err();
        assert!(matches!(err, StoreError::InvalidReorder(_)));
    }

    #[test]
    fn agent_settings_round_trip() {
        let conn = test_conn();
        create_agent(&conn, &sample_agent("pirate")).unwrap();

        let overrides = serde_json::json!({"speech": {"enabled": false}});
        update_agent_settings(&conn, "pirate", &overrides).unwrap();

        let agents = list_agents(&conn).unwrap();
        assert_eq!(agents[0].settings, Some(overrides));
    }

    #[test]
    fn missing_agent_is_not_found() {
        let conn = test_conn();
        let err = delete_agent(&conn, "ghost").unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }
}
