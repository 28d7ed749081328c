use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use tracing::info;
use uuid::Uuid;

use crate::error::Result;
use crate::types::{NewTask, Task, TaskState};

const TASK_COLUMNS: &str = "id, name, user_id, timezone, next_execution, state, created_at, updated_at";

/// Map a SELECT row (column order from TASK_COLUMNS) to a Task.
/// Centralised here so every query in this crate stays consistent.
fn row_to_task(row: &rusqlite::Row<'_>) -> rusqlite::Result<Task> {
    let next_raw: String = row.get(4)?;
    let next_execution = DateTime::parse_from_rfc3339(&next_raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
        })?;
    Ok(Task {
        id: row.get(0)?,
        name: row.get(1)?,
        user_id: row.get(2)?,
        timezone: row.get(3)?,
        next_execution,
        state: row.get::<_, String>(5)?.parse().unwrap_or_default(),
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

/// Durable record of task definitions.
///
/// Wraps a SQLite connection in a `Mutex`; every per-task operation is
/// scoped by the caller-supplied `user_id`, which the core trusts as-is
/// (the auth boundary above us has already verified it).
pub struct TaskStore {
    db: Arc<Mutex<Connection>>,
}

impl TaskStore {
    /// Wrap an already-open (and `init_db`-initialised) connection.
    pub fn new(db: Arc<Mutex<Connection>>) -> Self {
        Self { db }
    }

    /// Insert a new task in state Scheduled. Returns the fully populated
    /// record; the id is generated here so the caller has it immediately.
    pub fn create(&self, new: NewTask) -> Result<Task> {
        let now = Utc::now().to_rfc3339();
        let task = Task {
            id: Uuid::new_v4().to_string(),
            name: new.name,
            user_id: new.user_id,
            timezone: new.timezone,
            next_execution: new.next_execution,
            state: TaskState::Scheduled,
            created_at: now.clone(),
            updated_at: now,
        };
        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT INTO tasks (id, name, user_id, timezone, next_execution, state, created_at, updated_at)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8)",
            params![
                task.id,
                task.name,
                task.user_id,
                task.timezone,
                task.next_execution.to_rfc3339(),
                task.state.to_string(),
                task.created_at,
                task.updated_at,
            ],
        )?;
        info!(task_id = %task.id, name = %task.name, "task created");
        Ok(task)
    }

    /// Load a task by id, scoped to its owner. Returns None when the task
    /// does not exist *for that user* — callers decide whether that is
    /// NotFound or just "nothing to do".
    pub fn get(&self, id: &str, user_id: &str) -> Result<Option<Task>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1 AND user_id = ?2"
        ))?;
        match stmt.query_row(params![id, user_id], row_to_task) {
            Ok(t) => Ok(Some(t)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Apply an update: new name and/or new target instant. The state goes
    /// back to Scheduled so the task can be re-armed. Returns the updated
    /// row, or None when no task matches (id, user_id).
    pub fn update_fields(
        &self,
        id: &str,
        user_id: &str,
        name: Option<&str>,
        next_execution: Option<DateTime<Utc>>,
    ) -> Result<Option<Task>> {
        let now = Utc::now().to_rfc3339();
        let next_str = next_execution.map(|dt| dt.to_rfc3339());
        let db = self.db.lock().unwrap();
        let rows = db.execute(
            "UPDATE tasks SET
                name           = COALESCE(?3, name),
                next_execution = COALESCE(?4, next_execution),
                state          = 'scheduled',
                updated_at     = ?5
             WHERE id = ?1 AND user_id = ?2",
            params![id, user_id, name, next_str, now],
        )?;
        if rows == 0 {
            return Ok(None);
        }
        let mut stmt = db.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1 AND user_id = ?2"
        ))?;
        Ok(Some(stmt.query_row(params![id, user_id], row_to_task)?))
    }

    /// Atomically transition a Scheduled task to Fired and return it.
    ///
    /// This is the fire path's claim: both steps run under the connection
    /// lock, so a task deleted or rescheduled concurrently yields None and
    /// the fire becomes a no-op. Not user-scoped — the engine fires tasks
    /// regardless of who owns them.
    pub fn claim_for_fire(&self, id: &str) -> Result<Option<Task>> {
        let now = Utc::now().to_rfc3339();
        let db = self.db.lock().unwrap();
        let rows = db.execute(
            "UPDATE tasks SET state = 'fired', updated_at = ?2
             WHERE id = ?1 AND state = 'scheduled'",
            params![id, now],
        )?;
        if rows == 0 {
            return Ok(None);
        }
        let mut stmt = db.prepare(&format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"))?;
        Ok(Some(stmt.query_row(params![id], row_to_task)?))
    }

    /// Delete a task, scoped to its owner. Returns the deleted row so the
    /// caller can cascade (log entries, armed trigger) by id.
    pub fn delete(&self, id: &str, user_id: &str) -> Result<Option<Task>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1 AND user_id = ?2"
        ))?;
        let task = match stmt.query_row(params![id, user_id], row_to_task) {
            Ok(t) => t,
            Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        db.execute(
            "DELETE FROM tasks WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
        )?;
        info!(task_id = %id, "task deleted");
        Ok(Some(task))
    }

    /// All tasks belonging to a user, oldest first.
    pub fn list_by_user(&self, user_id: &str) -> Result<Vec<Task>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE user_id = ?1 ORDER BY created_at"
        ))?;
        let tasks = stmt
            .query_map(params![user_id], row_to_task)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(tasks)
    }

    /// Every task still in state Scheduled, across all users. Recovery scan.
    pub fn list_scheduled(&self) -> Result<Vec<Task>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE state = 'scheduled' ORDER BY next_execution"
        ))?;
        let tasks = stmt
            .query_map([], row_to_task)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(tasks)
    }
}
