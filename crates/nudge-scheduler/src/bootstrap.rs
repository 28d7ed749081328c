//! Startup wiring: config → open database → run migrations → engine.
//!
//! The surrounding service builds its transport and auth on top; this module
//! only assembles the scheduling core. Call
//! [`SchedulerEngine::recover`](crate::engine::SchedulerEngine::recover)
//! right after, from inside the runtime, to re-arm persisted tasks.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use nudge_core::config::NudgeConfig;
use nudge_core::db::{ensure_parent_dir, open_database};
use nudge_notify::NotificationSender;
use nudge_users::UserDirectory;

use crate::clock::SystemClock;
use crate::engine::SchedulerEngine;
use crate::error::Result;
use crate::history::ExecutionLog;
use crate::store::TaskStore;

/// Build a ready-to-recover engine from config.
///
/// Each subsystem gets its own connection so the fire path's user lookups
/// never contend with task-store writes on a single connection lock.
pub fn bootstrap(config: &NudgeConfig, sender: Arc<dyn NotificationSender>) -> Result<SchedulerEngine> {
    let path = &config.database.path;
    ensure_parent_dir(path);

    let conn = open_database(path)?;
    crate::db::init_db(&conn)?;
    nudge_users::db::init_db(&conn)?;
    let scheduler_db = Arc::new(Mutex::new(conn));

    let users = UserDirectory::new(Arc::new(Mutex::new(open_database(path)?)));

    Ok(SchedulerEngine::new(
        TaskStore::new(Arc::clone(&scheduler_db)),
        ExecutionLog::new(scheduler_db),
        users,
        sender,
        Arc::new(SystemClock),
        Duration::from_secs(config.notifier.timeout_secs),
    ))
}
