use std::sync::{Arc, Mutex};

use chrono::Utc;
use rusqlite::{params, Connection};
use tracing::info;
use uuid::Uuid;

use crate::db::{row_to_user, USER_COLUMNS};
use crate::error::{Result, UserError};
use crate::types::User;

/// Thread-safe directory of registered users.
///
/// Wraps a single SQLite connection in a `Mutex`. A pool would only pay off
/// once the fire path resolves users faster than SQLite can serve them;
/// a Mutex is sufficient for the single-node target.
pub struct UserDirectory {
    db: Arc<Mutex<Connection>>,
}

impl UserDirectory {
    /// Wrap an already-open (and `init_db`-initialised) connection.
    pub fn new(db: Arc<Mutex<Connection>>) -> Self {
        Self { db }
    }

    /// Insert a brand-new user row. The id is generated here so the caller
    /// immediately has the canonical id without a follow-up query.
    pub fn create(&self, display_name: &str, email: &str, timezone: &str) -> Result<User> {
        let now = Utc::now().to_rfc3339();
        let user = User {
            id: Uuid::now_v7().to_string(),
            display_name: display_name.to_string(),
            email: email.to_string(),
            timezone: timezone.to_string(),
            created_at: now.clone(),
            updated_at: now,
        };
        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT INTO users (id, display_name, email, timezone, created_at, updated_at)
             VALUES (?1,?2,?3,?4,?5,?6)",
            params![
                user.id,
                user.display_name,
                user.email,
                user.timezone,
                user.created_at,
                user.updated_at,
            ],
        )?;
        info!(user_id = %user.id, email, "user created");
        Ok(user)
    }

    /// Load a user by primary key. Returns None instead of an error when
    /// absent so callers decide whether missing is exceptional in their
    /// context — the scheduler treats it as a delivery failure, listing
    /// endpoints as a 404.
    pub fn get(&self, user_id: &str) -> Result<Option<User>> {
        let db = self.db.lock().unwrap();
        let mut stmt =
            db.prepare(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"))?;
        match stmt.query_row(params![user_id], row_to_user) {
            Ok(u) => Ok(Some(u)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(UserError::Database(e)),
        }
    }

    /// Change a user's delivery address. Always bumps updated_at.
    pub fn update_email(&self, user_id: &str, email: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let db = self.db.lock().unwrap();
        let rows = db.execute(
            "UPDATE users SET email = ?2, updated_at = ?3 WHERE id = ?1",
            params![user_id, email, now],
        )?;
        if rows == 0 {
            return Err(UserError::NotFound(user_id.to_string()));
        }
        Ok(())
    }

    /// Permanently delete a user record. Tasks and history owned by the
    /// scheduler crate must be cleaned up separately.
    pub fn delete(&self, user_id: &str) -> Result<()> {
        let db = self.db.lock().unwrap();
        let rows = db.execute("DELETE FROM users WHERE id = ?1", params![user_id])?;
        if rows == 0 {
            return Err(UserError::NotFound(user_id.to_string()));
        }
        info!(user_id, "user deleted");
        Ok(())
    }
}
