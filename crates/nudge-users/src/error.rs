use thiserror::Error;

/// All user-directory errors. Kept separate from the scheduler's error type
/// so the service layer can map them to responses without coupling layers.
#[derive(Debug, Error)]
pub enum UserError {
    #[error("User not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, UserError>;
