//! `nudge-scheduler` — the reminder scheduling and execution core.
//!
//! # Overview
//!
//! Tasks are persisted to a SQLite `tasks` table; every Scheduled task has at
//! most one in-memory [`engine::SchedulerEngine`] trigger armed for it. When
//! a trigger's deadline elapses the engine consumes it, re-reads the task
//! from the store, resolves the owning user's address, delegates to a
//! [`nudge_notify::NotificationSender`], and appends the outcome to the
//! `execution_log` table.
//!
//! Execution is single-shot and at-most-once: a consumed trigger is never
//! re-armed automatically, and a failed delivery is durably logged instead
//! of retried. Triggers are not persisted — call
//! [`engine::SchedulerEngine::recover`] on process start to re-arm every
//! Scheduled task, firing overdue ones promptly.

pub mod bootstrap;
pub mod clock;
pub mod db;
pub mod engine;
pub mod error;
pub mod history;
pub mod schedule;
pub mod store;
pub mod types;

pub use bootstrap::bootstrap;
pub use clock::{Clock, SystemClock};
pub use engine::{SchedulerEngine, TaskChanges, DELIVERED_MESSAGE};
pub use error::{Result, SchedulerError};
pub use history::ExecutionLog;
pub use store::TaskStore;
pub use types::{ExecutionEntry, ExecutionStatus, NewEntry, NewTask, Task, TaskState};
