use thiserror::Error;

/// Errors surfaced by the synchronous scheduler operations (schedule, update,
/// remove, listing). Fire-time failures never reach a caller — they are only
/// observable through the execution log.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Underlying SQLite / rusqlite error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The target time cannot be resolved to a valid calendar instant.
    /// Raised before anything is persisted.
    #[error("Invalid schedule: {0}")]
    InvalidSchedule(String),

    /// No task with the given ID exists for the requesting user.
    #[error("Task not found: {id}")]
    TaskNotFound { id: String },
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
