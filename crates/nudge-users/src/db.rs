use rusqlite::{Connection, Result};

use crate::types::User;

/// Map a SELECT row (column order from USER_COLUMNS) to a User.
/// Centralised here so every query in this crate stays consistent.
pub(crate) fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        display_name: row.get(1)?,
        email: row.get(2)?,
        timezone: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

pub(crate) const USER_COLUMNS: &str = "id, display_name, email, timezone, created_at, updated_at";

/// Initialise the users table. Safe to call on every startup — CREATE IF NOT
/// EXISTS means it's idempotent.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS users (
            id           TEXT PRIMARY KEY NOT NULL,
            display_name TEXT NOT NULL,
            email        TEXT NOT NULL,
            timezone     TEXT NOT NULL DEFAULT 'UTC',
            created_at   TEXT NOT NULL,
            updated_at   TEXT NOT NULL
        );
        CREATE UNIQUE INDEX IF NOT EXISTS idx_users_email ON users (email);",
    )
}
