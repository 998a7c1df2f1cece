//! SQLite persistence for conversation history and usage costs.
//!
//! Two append-only tables back the chat client: `history` (one row per
//! conversational turn) and `usage_costs` (one row per successful API
//! call). Rows are never updated or deleted.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Connection, params, types::Type};
use tracing::{debug, info};

use crate::error::{ProsaError, Result};
use crate::models::{HistoryTurn, Role, UsageRecord};

/// Current schema version for migrations.
const SCHEMA_VERSION: i32 = 1;

/// SQLite database holding the history store and the usage ledger.
pub struct ChatDatabase {
    conn: Arc<Mutex<Connection>>,
}

impl ChatDatabase {
    /// Open or create a chat database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.migrate()?;
        Ok(db)
    }

    /// Create an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.migrate()?;
        Ok(db)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| ProsaError::Query(format!("failed to acquire lock: {}", e)))
    }

    /// Run database migrations.
    fn migrate(&self) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| ProsaError::Migration(format!("failed to acquire lock: {}", e)))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY
            )",
            [],
        )?;

        let current_version: i32 = conn
            .query_row(
                "SELECT COALESCE(MAX(version), 0) FROM schema_version",
                [],
                |row| row.get(0),
            )
            .unwrap_or(0);

        if current_version < SCHEMA_VERSION {
            info!(
                current = current_version,
                target = SCHEMA_VERSION,
                "Running database migrations"
            );
            if current_version < 1 {
                Self::migration_v1(&conn)?;
            }
        }

        Ok(())
    }

    /// Migration to version 1: history and usage tables.
    fn migration_v1(conn: &Connection) -> Result<()> {
        debug!("Running migration v1: initial schema");

        conn.execute(
            "CREATE TABLE IF NOT EXISTS history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                timestamp TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_history_timestamp
             ON history(timestamp)",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_history_date
             ON history(DATE(timestamp))",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS usage_costs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                tokens_used INTEGER NOT NULL,
                model TEXT NOT NULL,
                cost REAL NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_usage_costs_timestamp
             ON usage_costs(timestamp)",
            [],
        )?;

        conn.execute("INSERT INTO schema_version (version) VALUES (1)", [])?;

        info!("Migration v1 completed");
        Ok(())
    }

    /// Append a conversation turn with a server-assigned timestamp.
    pub fn append_turn(&self, role: Role, content: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO history (role, content, timestamp) VALUES (?1, ?2, ?3)",
            params![role.as_str(), content, Utc::now().to_rfc3339()],
        )?;
        debug!(role = role.as_str(), "Appended history turn");
        Ok(())
    }

    /// Fetch the `n` most recent turns in chronological order (oldest first).
    pub fn recent_turns(&self, n: usize) -> Result<Vec<HistoryTurn>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare_cached(
            "SELECT id, role, content, timestamp FROM history
             ORDER BY timestamp DESC, id DESC
             LIMIT ?1",
        )?;

        let mut turns: Vec<HistoryTurn> = stmt
            .query_map(params![n as i64], decode_turn)?
            .collect::<std::result::Result<_, _>>()?;

        turns.reverse();
        Ok(turns)
    }

    /// Fetch all turns whose timestamp falls on a date in the closed range
    /// `[start, end]`, in chronological order.
    pub fn turns_in_range(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<HistoryTurn>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare_cached(
            "SELECT id, role, content, timestamp FROM history
             WHERE DATE(timestamp) BETWEEN ?1 AND ?2
             ORDER BY timestamp ASC, id ASC",
        )?;

        let turns = stmt
            .query_map(
                params![
                    start.format("%Y-%m-%d").to_string(),
                    end.format("%Y-%m-%d").to_string()
                ],
                decode_turn,
            )?
            .collect::<std::result::Result<_, _>>()?;

        Ok(turns)
    }

    /// Append a usage record with a server-assigned timestamp.
    pub fn append_usage(&self, tokens_used: i64, model: &str, cost: f64) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO usage_costs (timestamp, tokens_used, model, cost)
             VALUES (?1, ?2, ?3, ?4)",
            params![Utc::now().to_rfc3339(), tokens_used, model, cost],
        )?;
        debug!(tokens_used, model, cost, "Appended usage record");
        Ok(())
    }

    /// Sum of `cost` across all usage records; 0 when the ledger is empty.
    pub fn total_cost(&self) -> Result<f64> {
        let conn = self.lock()?;
        let total: f64 = conn.query_row(
            "SELECT COALESCE(SUM(cost), 0) FROM usage_costs",
            [],
            |row| row.get(0),
        )?;
        Ok(total)
    }

    /// Fetch all usage records in insertion order (for inspection and tests).
    pub fn usage_records(&self) -> Result<Vec<UsageRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare_cached(
            "SELECT id, timestamp, tokens_used, model, cost FROM usage_costs
             ORDER BY id ASC",
        )?;

        let records = stmt
            .query_map([], |row| {
                let ts: String = row.get(1)?;
                Ok(UsageRecord {
                    id: row.get(0)?,
                    timestamp: decode_timestamp(&ts, 1)?,
                    tokens_used: row.get(2)?,
                    model: row.get(3)?,
                    cost: row.get(4)?,
                })
            })?
            .collect::<std::result::Result<_, _>>()?;

        Ok(records)
    }
}

fn decode_turn(row: &rusqlite::Row<'_>) -> rusqlite::Result<HistoryTurn> {
    let role_str: String = row.get(1)?;
    let ts: String = row.get(3)?;

    let role = Role::parse(&role_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            1,
            Type::Text,
            format!("unknown role: {}", role_str).into(),
        )
    })?;

    Ok(HistoryTurn {
        id: row.get(0)?,
        role,
        content: row.get(2)?,
        timestamp: decode_timestamp(&ts, 3)?,
    })
}

fn decode_timestamp(raw: &str, column: usize) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(e)))
}
