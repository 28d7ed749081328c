use thiserror::Error;

/// Errors that can occur while delivering a reminder.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The relay could not be reached at all.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The relay was reached but refused or failed to accept the message.
    #[error("Send failed: {0}")]
    SendFailed(String),

    /// The send exceeded its allowed time budget.
    #[error("Send timed out after {ms}ms")]
    Timeout { ms: u64 },

    /// The sender configuration is invalid or missing.
    #[error("Configuration error: {0}")]
    Config(String),
}
