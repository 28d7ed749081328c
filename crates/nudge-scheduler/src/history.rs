use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use tracing::debug;

use crate::error::Result;
use crate::types::{ExecutionEntry, NewEntry};

/// Append-only record of firing attempts.
///
/// Entries are never mutated; the only deletion is the cascade when their
/// task is removed, keyed by task id (a name key would over- or under-delete
/// for renamed or duplicate-named tasks).
pub struct ExecutionLog {
    db: Arc<Mutex<Connection>>,
}

impl ExecutionLog {
    /// Wrap an already-open (and `init_db`-initialised) connection.
    pub fn new(db: Arc<Mutex<Connection>>) -> Self {
        Self { db }
    }

    pub fn append(&self, entry: NewEntry) -> Result<()> {
        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT INTO execution_log (task_id, task_name, user_id, executed_at, status, message)
             VALUES (?1,?2,?3,?4,?5,?6)",
            params![
                entry.task_id,
                entry.task_name,
                entry.user_id,
                entry.executed_at.to_rfc3339(),
                entry.status.to_string(),
                entry.message,
            ],
        )?;
        debug!(task_id = %entry.task_id, status = %entry.status, "execution logged");
        Ok(())
    }

    /// A user's task history, most recent execution first.
    pub fn list_by_user(&self, user_id: &str) -> Result<Vec<ExecutionEntry>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(
            "SELECT id, task_id, task_name, user_id, executed_at, status, message
             FROM execution_log WHERE user_id = ?1
             ORDER BY executed_at DESC, id DESC",
        )?;
        let entries = stmt
            .query_map(params![user_id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, String>(6)?,
                ))
            })?
            .filter_map(|r| {
                let (id, task_id, task_name, user_id, executed_raw, status_str, message) = r.ok()?;
                let executed_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&executed_raw)
                    .ok()?
                    .with_timezone(&Utc);
                Some(ExecutionEntry {
                    id,
                    task_id,
                    task_name,
                    user_id,
                    executed_at,
                    status: status_str.parse().ok()?,
                    message,
                })
            })
            .collect();
        Ok(entries)
    }

    /// Cascade of task deletion. Keyed by task id; user_id stays in the
    /// WHERE clause as an ownership guard. Returns the number of rows
    /// removed.
    pub fn delete_by_task(&self, task_id: &str, user_id: &str) -> Result<usize> {
        let db = self.db.lock().unwrap();
        let rows = db.execute(
            "DELETE FROM execution_log WHERE task_id = ?1 AND user_id = ?2",
            params![task_id, user_id],
        )?;
        Ok(rows)
    }
}
