use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// Waiting for its target instant; a trigger may be armed for it.
    #[default]
    Scheduled,
    /// The trigger elapsed and execution ran (outcome is in the log).
    Fired,
    /// Withdrawn without firing.
    Canceled,
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TaskState::Scheduled => "scheduled",
            TaskState::Fired => "fired",
            TaskState::Canceled => "canceled",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for TaskState {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(TaskState::Scheduled),
            "fired" => Ok(TaskState::Fired),
            "canceled" => Ok(TaskState::Canceled),
            other => Err(format!("unknown task state: {other}")),
        }
    }
}

/// A persisted reminder task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// UUID v4 string — primary key.
    pub id: String,
    /// Human-readable label, shown in the reminder itself.
    pub name: String,
    /// Owning user. Supplied by the auth boundary; trusted as-is.
    pub user_id: String,
    /// IANA zone the target time was given in, e.g. "Europe/Berlin".
    /// Kept so updates re-resolve in the same zone the user meant.
    pub timezone: String,
    /// Canonical UTC instant at which the reminder fires.
    pub next_execution: DateTime<Utc>,
    /// Current lifecycle state.
    pub state: TaskState,
    /// ISO-8601 timestamp of task creation.
    pub created_at: String,
    /// ISO-8601 timestamp of the last metadata update.
    pub updated_at: String,
}

/// Fields needed to create a task; everything else is generated by the store.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub name: String,
    pub user_id: String,
    pub timezone: String,
    pub next_execution: DateTime<Utc>,
}

/// Outcome recorded for one firing attempt (or an informational update).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// The reminder was delivered.
    Success,
    /// Delivery failed; the entry's message carries the underlying error.
    Failure,
    /// The task was rescheduled before firing. Informational only.
    Updated,
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ExecutionStatus::Success => "success",
            ExecutionStatus::Failure => "failure",
            ExecutionStatus::Updated => "updated",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for ExecutionStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "success" => Ok(ExecutionStatus::Success),
            "failure" => Ok(ExecutionStatus::Failure),
            "updated" => Ok(ExecutionStatus::Updated),
            other => Err(format!("unknown execution status: {other}")),
        }
    }
}

/// Immutable audit record of one firing attempt. Never mutated; deleted only
/// as a cascade of task deletion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionEntry {
    /// SQLite rowid.
    pub id: i64,
    /// Task the attempt belongs to — the cascade-deletion key.
    pub task_id: String,
    /// Task name at execution time, kept for display.
    pub task_name: String,
    pub user_id: String,
    pub executed_at: DateTime<Utc>,
    pub status: ExecutionStatus,
    /// Fixed confirmation text on success; the triggering error's message on
    /// failure.
    pub message: String,
}

/// Fields the scheduler supplies when appending; the rowid is assigned by
/// SQLite.
#[derive(Debug, Clone)]
pub struct NewEntry {
    pub task_id: String,
    pub task_name: String,
    pub user_id: String,
    pub executed_at: DateTime<Utc>,
    pub status: ExecutionStatus,
    pub message: String,
}
