//! Reminder delivery payload — shared between the scheduler engine and
//! whatever notification sender is wired in.

use serde::{Deserialize, Serialize};

/// Ready-to-send reminder; built by the scheduler at fire time after the
/// owning user's destination address has been resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderMessage {
    /// Originating task ID — used for logging and log correlation.
    pub task_id: String,
    /// Task display name, shown to the recipient.
    pub task_name: String,
    /// Destination address (the owning user's email).
    pub destination: String,
    /// Subject line.
    pub subject: String,
    /// Plain text body.
    pub body: String,
}

impl ReminderMessage {
    /// Standard reminder for a named task.
    pub fn for_task(task_id: &str, task_name: &str, destination: &str) -> Self {
        Self {
            task_id: task_id.to_string(),
            task_name: task_name.to_string(),
            destination: destination.to_string(),
            subject: format!("Reminder: {task_name}"),
            body: format!("This is your reminder for \"{task_name}\"."),
        }
    }
}
