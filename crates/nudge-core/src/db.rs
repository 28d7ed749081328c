use std::path::Path;

use rusqlite::Connection;
use tracing::{info, warn};

/// Create the database file's parent directory if it is missing.
/// Failure is logged, not fatal — the open itself will report the real error.
pub fn ensure_parent_dir(path: &str) {
    if let Some(parent) = Path::new(path).parent() {
        if parent.as_os_str().is_empty() {
            return;
        }
        if let Err(e) = std::fs::create_dir_all(parent) {
            warn!(dir = %parent.display(), error = %e, "could not create database directory");
        }
    }
}

/// Open (or create) the service database at `path`.
///
/// WAL lets the subsystems' independent connections read while another
/// writes; foreign keys are enforced for every connection opened here.
pub fn open_database(path: &str) -> rusqlite::Result<Connection> {
    info!(path = %path, "opening SQLite database");
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}
