use rusqlite::Connection;

use crate::error::Result;

/// Initialise the scheduler schema in `conn`.
///
/// Creates the `tasks` and `execution_log` tables (idempotent) plus the
/// indexes backing the hot queries: per-user listing, recovery scan, and
/// cascade deletion by task id.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS tasks (
            id             TEXT NOT NULL PRIMARY KEY,
            name           TEXT NOT NULL,
            user_id        TEXT NOT NULL,
            timezone       TEXT NOT NULL DEFAULT 'UTC',
            next_execution TEXT NOT NULL,   -- ISO-8601, always UTC
            state          TEXT NOT NULL DEFAULT 'scheduled',
            created_at     TEXT NOT NULL,
            updated_at     TEXT NOT NULL
        ) STRICT;

        CREATE INDEX IF NOT EXISTS idx_tasks_user ON tasks (user_id);
        -- Recovery scan: SELECT … WHERE state = 'scheduled'
        CREATE INDEX IF NOT EXISTS idx_tasks_state ON tasks (state, next_execution);

        CREATE TABLE IF NOT EXISTS execution_log (
            id          INTEGER PRIMARY KEY,
            task_id     TEXT NOT NULL,
            task_name   TEXT NOT NULL,
            user_id     TEXT NOT NULL,
            executed_at TEXT NOT NULL,      -- ISO-8601, always UTC
            status      TEXT NOT NULL,
            message     TEXT NOT NULL
        ) STRICT;

        CREATE INDEX IF NOT EXISTS idx_log_user ON execution_log (user_id, executed_at DESC);
        CREATE INDEX IF NOT EXISTS idx_log_task ON execution_log (task_id);
        ",
    )?;
    Ok(())
}
