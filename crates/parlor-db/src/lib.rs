//! Database layer for the Parlor chat console.
//!
//! Provides SQLite connection pooling (via `r2d2`), WAL-mode initialization,
//! embedded SQL migrations, and query helpers for agents, saved
//! conversations, user settings, and the last-selected model.
//!
//! # Design decisions
//!
//! - **SQLite with WAL mode**: no external database process for a
//!   single-user localhost app. WAL allows concurrent readers with a single
//!   writer, which matches the access pattern (CRUD requests racing the
//!   streaming coordinator's reads).
//! - **`r2d2` connection pool**: bounded connection reuse without manual
//!   lifetime management; handlers check out connections inside
//!   `spawn_blocking`.
//! - **Embedded migrations**: SQL files are compiled into the binary via
//!   `include_str!`, so the schema ships with the server and cannot drift
//!   from the code that depends on it.

mod agents;
mod conversations;
mod migrations;
mod pool;
mod settings;

pub use agents::{
    create_agent, delete_agent, list_agents, reorder_agents, seed_default_agent, update_agent,
    update_agent_settings, AgentUpdate,
};
pub use conversations::{
    delete_conversation, list_conversations, rename_conversation, save_conversation,
    update_conversation_history,
};
pub use migrations::{run_migrations, MigrationError};
pub use pool::{create_pool, DbPool, DbRuntimeSettings, PoolError};
pub use settings::{load_last_model, load_settings, save_last_model, save_settings};

use thiserror::Error;

/// Errors returned by the query helpers.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying SQLite error.
    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),

    /// The addressed row does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The default agent cannot be modified or deleted.
    #[error("the default agent is protected")]
    DefaultAgentProtected,

    /// A reorder request did not name every agent exactly once.
    #[error("invalid reorder: {0}")]
    InvalidReorder(String),

    /// A JSON column failed to round-trip.
    #[error("corrupt record: {0}")]
    Corrupt(#[from] serde_json::Error),
}
