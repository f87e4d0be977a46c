//! Durable action records backed by SQLite.
//!
//! # Table design
//!
//! ```text
//! actions        process_id (PK) | folder_session_id | name | description |
//!                creation | result_files | action_status | statistics_summary
//! action_states  status_id (PK, autoincrement) | process_id (FK) | name |
//!                creation | message
//! ```
//!
//! Timestamps are stored as RFC 3339 UTC strings with fixed microsecond
//! precision, so lexical order equals time order. `result_files` and
//! `statistics_summary` hold JSON.
//!
//! A single connection sits behind a mutex: concurrent writers are
//! serialized, which gives every action a totally ordered status history.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::action::{
    ActionPhase, ActionProperties, ActionRecord, ActionResult, StatusEntry, Summary,
};
use crate::error::{PreingestError, Result};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS actions (
    process_id         TEXT PRIMARY KEY NOT NULL,
    folder_session_id  TEXT NOT NULL,
    name               TEXT NOT NULL,
    description        TEXT NOT NULL,
    creation           TEXT NOT NULL,
    result_files       TEXT NOT NULL DEFAULT '[]',
    action_status      TEXT,
    statistics_summary TEXT
);
CREATE INDEX IF NOT EXISTS idx_actions_session ON actions (folder_session_id, creation);

CREATE TABLE IF NOT EXISTS action_states (
    status_id  INTEGER PRIMARY KEY AUTOINCREMENT,
    process_id TEXT NOT NULL REFERENCES actions (process_id),
    name       TEXT NOT NULL,
    creation   TEXT NOT NULL,
    message    TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_action_states_process ON action_states (process_id, creation, status_id);
";

// ---------------------------------------------------------------------------
// Column helpers
// ---------------------------------------------------------------------------

fn ts_to_sql(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn ts_from_sql(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| PreingestError::Store(format!("invalid timestamp '{s}': {e}")))
}

fn uuid_from_sql(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| PreingestError::Store(format!("invalid uuid '{s}': {e}")))
}

/// Raw `actions` row, converted to an [`ActionRecord`] outside the SQLite callback.
struct ActionRow {
    process_id: String,
    folder_session_id: String,
    name: String,
    description: String,
    creation: String,
    result_files: String,
    action_status: Option<String>,
    statistics_summary: Option<String>,
}

impl ActionRow {
    const COLUMNS: &'static str = "process_id, folder_session_id, name, description, creation, \
                                   result_files, action_status, statistics_summary";

    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            process_id: row.get(0)?,
            folder_session_id: row.get(1)?,
            name: row.get(2)?,
            description: row.get(3)?,
            creation: row.get(4)?,
            result_files: row.get(5)?,
            action_status: row.get(6)?,
            statistics_summary: row.get(7)?,
        })
    }

    fn into_record(self, status: Vec<StatusEntry>) -> Result<ActionRecord> {
        Ok(ActionRecord {
            process_id: uuid_from_sql(&self.process_id)?,
            folder_session_id: uuid_from_sql(&self.folder_session_id)?,
            name: self.name,
            description: self.description,
            creation: ts_from_sql(&self.creation)?,
            result_files: serde_json::from_str(&self.result_files)?,
            action_status: self
                .action_status
                .as_deref()
                .map(str::parse::<ActionResult>)
                .transpose()?,
            statistics_summary: self
                .statistics_summary
                .as_deref()
                .map(serde_json::from_str::<Summary>)
                .transpose()?,
            status,
        })
    }
}

// ---------------------------------------------------------------------------
// ActionStore
// ---------------------------------------------------------------------------

pub struct ActionStore {
    conn: Mutex<Connection>,
}

impl ActionStore {
    /// Open or create the database at `path` and ensure the schema exists.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
            row.get::<_, String>(0)
        })?;
        Self::bootstrap(conn)
    }

    pub fn in_memory() -> Result<Self> {
        Self::bootstrap(Connection::open_in_memory()?)
    }

    fn bootstrap(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Insert the action row. Fails if the process id already exists.
    pub fn create_action(&self, properties: &ActionProperties) -> Result<()> {
        self.conn().execute(
            "INSERT INTO actions (process_id, folder_session_id, name, description, creation, result_files)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                properties.process_id.to_string(),
                properties.session_id.to_string(),
                properties.name,
                properties.description,
                ts_to_sql(properties.creation),
                serde_json::to_string(&properties.result_files)?,
            ],
        )?;
        Ok(())
    }

    /// Append one status entry to an existing action. Returns the entry id.
    pub fn append_status(
        &self,
        process_id: Uuid,
        phase: ActionPhase,
        at: DateTime<Utc>,
        message: &str,
    ) -> Result<i64> {
        let conn = self.conn();
        let exists: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM actions WHERE process_id = ?1",
                params![process_id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_none() {
            return Err(PreingestError::ActionNotFound(process_id));
        }
        conn.execute(
            "INSERT INTO action_states (process_id, name, creation, message) VALUES (?1, ?2, ?3, ?4)",
            params![process_id.to_string(), phase.as_str(), ts_to_sql(at), message],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Record the terminal classification, summary and result files.
    pub fn finalize(
        &self,
        process_id: Uuid,
        result: ActionResult,
        summary: Summary,
        result_files: &[String],
    ) -> Result<()> {
        let updated = self.conn().execute(
            "UPDATE actions SET action_status = ?2, statistics_summary = ?3, result_files = ?4
             WHERE process_id = ?1",
            params![
                process_id.to_string(),
                result.as_str(),
                serde_json::to_string(&summary)?,
                serde_json::to_string(result_files)?,
            ],
        )?;
        if updated == 0 {
            return Err(PreingestError::ActionNotFound(process_id));
        }
        Ok(())
    }

    /// Status history of one action, in timestamp order.
    pub fn status_entries(&self, process_id: Uuid) -> Result<Vec<StatusEntry>> {
        let conn = self.conn();
        Self::status_entries_on(&conn, process_id)
    }

    fn status_entries_on(conn: &Connection, process_id: Uuid) -> Result<Vec<StatusEntry>> {
        let mut stmt = conn.prepare(
            "SELECT status_id, name, creation, message FROM action_states
             WHERE process_id = ?1
             ORDER BY creation ASC, status_id ASC",
        )?;
        let rows = stmt
            .query_map(params![process_id.to_string()], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(status_id, name, creation, message)| {
                Ok(StatusEntry {
                    status_id,
                    process_id,
                    name: name.parse()?,
                    creation: ts_from_sql(&creation)?,
                    message,
                })
            })
            .collect()
    }

    pub fn get_action(&self, process_id: Uuid) -> Result<ActionRecord> {
        let conn = self.conn();
        let row = conn
            .query_row(
                &format!(
                    "SELECT {} FROM actions WHERE process_id = ?1",
                    ActionRow::COLUMNS
                ),
                params![process_id.to_string()],
                ActionRow::from_row,
            )
            .optional()?
            .ok_or(PreingestError::ActionNotFound(process_id))?;
        let status = Self::status_entries_on(&conn, process_id)?;
        row.into_record(status)
    }

    /// All actions of a session, oldest first.
    pub fn list_actions(&self, session_id: Uuid) -> Result<Vec<ActionRecord>> {
        let conn = self.conn();
        let rows = {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM actions WHERE folder_session_id = ?1 ORDER BY creation ASC",
                ActionRow::COLUMNS
            ))?;
            let rows = stmt
                .query_map(params![session_id.to_string()], ActionRow::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows
        };

        rows.into_iter()
            .map(|row| {
                let process_id = uuid_from_sql(&row.process_id)?;
                let status = Self::status_entries_on(&conn, process_id)?;
                row.into_record(status)
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
