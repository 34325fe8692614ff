//! Database schema and migrations

use rusqlite::Connection;

use crate::{Error, Result};

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the database schema
///
/// # Errors
///
/// Returns error if migration fails
pub fn init(conn: &Connection) -> Result<()> {
    let version: i32 = conn
        .query_row("PRAGMA user_version", [], |row| row.get(0))
        .unwrap_or(0);

    if version < 1 {
        migrate_v1(conn)?;
    }

    Ok(())
}

fn migrate_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r"
        -- Completed (user, agent) exchanges, keyed by identity
        CREATE TABLE IF NOT EXISTS exchanges (
            id TEXT PRIMARY KEY,
            identity TEXT NOT NULL,
            user_msg TEXT NOT NULL,
            agent_msg TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_exchanges_identity
            ON exchanges(identity, created_at);

        PRAGMA user_version = 1;
        ",
    )
    .map_err(|e| Error::Storage(e.to_string()))?;

    Ok(())
}
