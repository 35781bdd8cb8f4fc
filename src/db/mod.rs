use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection};
use std::path::Path;

pub mod models;

/// Durable record of goals that have already been announced.
///
/// Owned by the goal monitor; a single process writes it, so the connection
/// is held directly rather than behind a lock.
pub struct NotifiedStore {
    conn: Connection,
}

impl NotifiedStore {
    /// Open (or create) the SQLite file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open state database {}", path.display()))?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::with_connection(conn)
    }

    /// Non-persistent store.
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA_SQL)
            .context("Failed to migrate state database")?;
        Ok(NotifiedStore { conn })
    }

    pub fn contains(&self, game_id: u64, event_id: u64) -> Result<bool> {
        let found: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM notified_goals WHERE game_id = ?1 AND event_id = ?2",
            params![game_id as i64, event_id as i64],
            |row| row.get(0),
        )?;
        Ok(found > 0)
    }

    /// Record a delivered goal. Recording the same goal twice is a no-op.
    pub fn mark_notified(&mut self, game_id: u64, event_id: u64) -> Result<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO notified_goals (game_id, event_id, notified_at)
             VALUES (?1, ?2, ?3)",
            params![game_id as i64, event_id as i64, Utc::now()],
        )?;
        Ok(())
    }

    pub fn count(&self) -> Result<u64> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM notified_goals", [], |row| row.get(0))?;
        Ok(n as u64)
    }

    /// Event ids already announced for one game, in insertion order.
    pub fn notified_for_game(&self, game_id: u64) -> Result<Vec<u64>> {
        let mut stmt = self.conn.prepare(
            "SELECT event_id FROM notified_goals WHERE game_id = ?1 ORDER BY rowid",
        )?;
        let ids = stmt
            .query_map(params![game_id as i64], |row| row.get::<_, i64>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(ids.into_iter().map(|id| id as u64).collect())
    }
}

pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS notified_goals (
    game_id     INTEGER NOT NULL,
    event_id    INTEGER NOT NULL,
    notified_at TEXT    NOT NULL,
    PRIMARY KEY (game_id, event_id)
);
"#;
